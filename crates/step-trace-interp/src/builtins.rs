//! Built-in functions and instance methods (§4.C).

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::eval::{make_range, EResult, Interp, RuntimeErr};
use crate::format::repr;
use crate::value::{is_truthy, type_name, BuiltinFunction, DictKey, EnumerateValue, Value};

const BUILTIN_NAMES: &[&str] = &[
    "print", "len", "range", "enumerate", "reversed", "zip", "sorted", "max", "min", "sum", "abs", "str", "int", "float",
    "bool", "list", "dict", "set", "tuple", "isinstance", "type",
];

const LIST_METHODS: &[&str] = &["append", "pop", "extend", "insert", "remove", "index", "count", "sort", "reverse", "copy"];
const DICT_METHODS: &[&str] = &["get", "items", "keys", "values", "update", "pop", "setdefault"];
const SET_METHODS: &[&str] = &["add", "remove", "discard", "union", "intersection", "difference"];
const STR_METHODS: &[&str] = &["upper", "lower", "strip", "split", "join", "replace", "startswith", "endswith", "find"];

#[must_use]
pub fn lookup_builtin(name: &str) -> Option<Value> {
    BUILTIN_NAMES.iter().find(|n| **n == name).map(|n| Value::Builtin(Rc::new(BuiltinFunction { name: n })))
}

pub fn install_builtins(interp: &mut Interp<'_>) {
    for name in BUILTIN_NAMES {
        interp.set_global((*name).to_string(), Value::Builtin(Rc::new(BuiltinFunction { name })));
    }
}

#[must_use]
pub fn is_known_method(receiver: &Value, name: &str) -> bool {
    match receiver {
        Value::List(_) => LIST_METHODS.contains(&name),
        Value::Dict(_) => DICT_METHODS.contains(&name),
        Value::Set(_) => SET_METHODS.contains(&name),
        Value::Str(_) => STR_METHODS.contains(&name),
        _ => false,
    }
}

pub fn call_builtin(interp: &mut Interp<'_>, name: &str, args: Vec<Value>, kwargs: IndexMap<String, Value>) -> EResult<Value> {
    match name {
        "print" => {
            let sep = kwargs.get("sep").map_or(" ".to_string(), display_text);
            let end = kwargs.get("end").map_or("\n".to_string(), display_text);
            let text = args.iter().map(display_text).collect::<Vec<_>>().join(&sep);
            let out = format!("{text}{end}");
            interp.stdout.push_str(&out);
            interp.hooks.note_stdout(&out);
            Ok(Value::None)
        }
        "len" => Ok(Value::Int(builtin_len(&args[0])? as i64)),
        "range" => builtin_range(&args),
        "enumerate" => {
            let items = interp.materialize_iterable(&args[0])?;
            let start = match args.get(1) {
                Some(Value::Int(i)) => *i,
                _ => 0,
            };
            Ok(Value::Enumerate(Rc::new(EnumerateValue { items, start })))
        }
        "reversed" => {
            let mut items = interp.materialize_iterable(&args[0])?;
            items.reverse();
            Ok(Value::List(Rc::new(RefCell::new(items))))
        }
        "zip" => {
            let lists: Vec<Vec<Value>> = args.iter().map(|a| interp.materialize_iterable(a)).collect::<EResult<_>>()?;
            let min_len = lists.iter().map(Vec::len).min().unwrap_or(0);
            let mut out = Vec::with_capacity(min_len);
            for i in 0..min_len {
                out.push(Value::Tuple(Rc::new(lists.iter().map(|l| l[i].clone()).collect())));
            }
            Ok(Value::List(Rc::new(RefCell::new(out))))
        }
        "sorted" => {
            let mut items = interp.materialize_iterable(&args[0])?;
            let reverse = kwargs.get("reverse").is_some_and(is_truthy);
            items.sort_by(numeric_or_str_cmp);
            if reverse {
                items.reverse();
            }
            Ok(Value::List(Rc::new(RefCell::new(items))))
        }
        "max" | "min" => {
            let items = if args.len() == 1 { interp.materialize_iterable(&args[0])? } else { args };
            let mut iter = items.into_iter();
            let mut acc = iter.next().ok_or_else(|| RuntimeErr::new("ValueError", format!("{name}() arg is an empty sequence")))?;
            for item in iter {
                let cmp = numeric_or_str_cmp(&item, &acc);
                let better = if name == "max" { cmp.is_gt() } else { cmp.is_lt() };
                if better {
                    acc = item;
                }
            }
            Ok(acc)
        }
        "sum" => {
            let items = interp.materialize_iterable(&args[0])?;
            let mut acc_i = 0i64;
            let mut acc_f = 0.0f64;
            let mut is_float = false;
            for item in items {
                match item {
                    Value::Int(i) => acc_i += i,
                    Value::Float(f) => {
                        is_float = true;
                        acc_f += f;
                    }
                    other => return Err(RuntimeErr::new("TypeError", format!("unsupported operand type for sum(): '{}'", type_name(&other)))),
                }
            }
            Ok(if is_float { Value::Float(acc_f + acc_i as f64) } else { Value::Int(acc_i) })
        }
        "abs" => match &args[0] {
            Value::Int(i) => Ok(Value::Int(i.abs())),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            other => Err(RuntimeErr::new("TypeError", format!("bad operand type for abs(): '{}'", type_name(other)))),
        },
        "str" => Ok(Value::Str(Rc::new(args.first().map_or(String::new(), display_text)))),
        "int" => Ok(Value::Int(to_int(args.first().unwrap_or(&Value::Int(0)))?)),
        "float" => Ok(Value::Float(to_float(args.first().unwrap_or(&Value::Float(0.0)))?)),
        "bool" => Ok(Value::Bool(args.first().is_some_and(is_truthy))),
        "list" => {
            let items = match args.first() {
                Some(v) => interp.materialize_iterable(v)?,
                None => Vec::new(),
            };
            Ok(Value::List(Rc::new(RefCell::new(items))))
        }
        "tuple" => {
            let items = match args.first() {
                Some(v) => interp.materialize_iterable(v)?,
                None => Vec::new(),
            };
            Ok(Value::Tuple(Rc::new(items)))
        }
        "dict" => Ok(Value::Dict(Rc::new(RefCell::new(IndexMap::new())))),
        "set" => {
            let items = match args.first() {
                Some(v) => interp.materialize_iterable(v)?,
                None => Vec::new(),
            };
            let mut set = indexmap::IndexSet::new();
            for item in items {
                set.insert(DictKey::try_from_value(&item).map_err(|m| RuntimeErr::new("TypeError", m))?);
            }
            Ok(Value::Set(Rc::new(RefCell::new(set))))
        }
        "isinstance" => {
            let Value::Class(class) = &args[1] else {
                return Err(RuntimeErr::new("TypeError", "isinstance() arg 2 must be a type"));
            };
            let result = matches!(&args[0], Value::Instance(i) if instance_is_a(i, class));
            Ok(Value::Bool(result))
        }
        "type" => Ok(match &args[0] {
            Value::Instance(i) => Value::Class(i.borrow().class.clone()),
            other => lookup_builtin(&type_name(other)).unwrap_or(Value::None),
        }),
        other => Err(RuntimeErr::new("NameError", format!("name '{other}' is not defined"))),
    }
}

fn instance_is_a(instance: &crate::value::InstanceRef, class: &Rc<crate::value::ClassValue>) -> bool {
    fn matches(c: &Rc<crate::value::ClassValue>, target: &Rc<crate::value::ClassValue>) -> bool {
        Rc::ptr_eq(c, target) || c.bases.iter().any(|b| matches(b, target))
    }
    matches(&instance.borrow().class, class)
}

fn display_text(value: &Value) -> String {
    match value {
        Value::Str(s) => s.as_str().to_string(),
        other => repr(other),
    }
}

fn builtin_len(value: &Value) -> EResult<usize> {
    Ok(match value {
        Value::Str(s) => s.chars().count(),
        Value::List(l) => l.borrow().len(),
        Value::Tuple(t) => t.len(),
        Value::Dict(d) => d.borrow().len(),
        Value::Set(s) => s.borrow().len(),
        Value::Range(r) => r.len(),
        other => return Err(RuntimeErr::new("TypeError", format!("object of type '{}' has no len()", type_name(other)))),
    })
}

fn builtin_range(args: &[Value]) -> EResult<Value> {
    let ints: Vec<i64> = args
        .iter()
        .map(|a| match a {
            Value::Int(i) => Ok(*i),
            other => Err(RuntimeErr::new("TypeError", format!("'{}' object cannot be interpreted as an integer", type_name(other)))),
        })
        .collect::<EResult<_>>()?;
    Ok(match ints.as_slice() {
        [stop] => make_range(0, *stop, 1),
        [start, stop] => make_range(*start, *stop, 1),
        [start, stop, step] => make_range(*start, *stop, *step),
        _ => return Err(RuntimeErr::new("TypeError", "range expected 1 to 3 arguments")),
    })
}

fn to_int(value: &Value) -> EResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => Ok(*f as i64),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Str(s) => s.trim().parse().map_err(|_| RuntimeErr::new("ValueError", format!("invalid literal for int(): '{s}'"))),
        other => Err(RuntimeErr::new("TypeError", format!("int() argument must be a string or a number, not '{}'", type_name(other)))),
    }
}

fn to_float(value: &Value) -> EResult<f64> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Str(s) => s.trim().parse().map_err(|_| RuntimeErr::new("ValueError", format!("could not convert string to float: '{s}'"))),
        other => Err(RuntimeErr::new("TypeError", format!("float() argument must be a string or a number, not '{}'", type_name(other)))),
    }
}

fn numeric_or_str_cmp(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)).unwrap_or(std::cmp::Ordering::Equal),
        _ => std::cmp::Ordering::Equal,
    }
}

/// Dispatches a bound collection method (`arr.append(x)`, `d.items()`, …)
/// by receiver shape and name. Grounded on the same handful of methods
/// `python_tracer.py`'s traced snippets lean on.
pub fn call_collection_method(receiver: &Value, name: &str, args: Vec<Value>) -> EResult<Value> {
    match receiver {
        Value::List(list) => call_list_method(list, name, args),
        Value::Dict(dict) => call_dict_method(dict, name, args),
        Value::Set(set) => call_set_method(set, name, args),
        Value::Str(s) => call_str_method(s, name, args),
        other => Err(RuntimeErr::new("AttributeError", format!("'{}' object has no attribute '{name}'", type_name(other)))),
    }
}

fn call_list_method(list: &crate::value::ListRef, name: &str, args: Vec<Value>) -> EResult<Value> {
    match name {
        "append" => {
            list.borrow_mut().push(args.into_iter().next().unwrap_or(Value::None));
            Ok(Value::None)
        }
        "pop" => {
            let mut items = list.borrow_mut();
            let idx = match args.first() {
                Some(Value::Int(i)) => {
                    let len = items.len() as i64;
                    (if *i < 0 { i + len } else { *i }) as usize
                }
                _ => items.len().wrapping_sub(1),
            };
            if idx >= items.len() {
                return Err(RuntimeErr::new("IndexError", "pop index out of range"));
            }
            Ok(items.remove(idx))
        }
        "extend" => {
            let extra = args.into_iter().next().unwrap_or(Value::List(Rc::new(RefCell::new(Vec::new()))));
            if let Value::List(other) = &extra {
                list.borrow_mut().extend(other.borrow().iter().cloned());
            }
            Ok(Value::None)
        }
        "insert" => {
            let mut items = list.borrow_mut();
            let i = match args.first() {
                Some(Value::Int(i)) => Some(*i),
                _ => None,
            };
            if let (Some(i), Some(v)) = (i, args.into_iter().nth(1)) {
                let idx = i.clamp(0, items.len() as i64) as usize;
                items.insert(idx, v);
            }
            Ok(Value::None)
        }
        "remove" => {
            let target = args.into_iter().next().unwrap_or(Value::None);
            let mut items = list.borrow_mut();
            if let Some(pos) = items.iter().position(|v| crate::format::repr(v) == crate::format::repr(&target)) {
                items.remove(pos);
                Ok(Value::None)
            } else {
                Err(RuntimeErr::new("ValueError", "list.remove(x): x not in list"))
            }
        }
        "index" => {
            let target = args.into_iter().next().unwrap_or(Value::None);
            let items = list.borrow();
            items
                .iter()
                .position(|v| crate::format::repr(v) == crate::format::repr(&target))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| RuntimeErr::new("ValueError", format!("{} is not in list", repr(&target))))
        }
        "count" => {
            let target = args.into_iter().next().unwrap_or(Value::None);
            let count = list.borrow().iter().filter(|v| crate::format::repr(v) == crate::format::repr(&target)).count();
            Ok(Value::Int(count as i64))
        }
        "sort" => {
            list.borrow_mut().sort_by(numeric_or_str_cmp);
            Ok(Value::None)
        }
        "reverse" => {
            list.borrow_mut().reverse();
            Ok(Value::None)
        }
        "copy" => Ok(Value::List(Rc::new(RefCell::new(list.borrow().clone())))),
        other => Err(RuntimeErr::new("AttributeError", format!("'list' object has no attribute '{other}'"))),
    }
}

fn call_dict_method(dict: &crate::value::DictRef, name: &str, args: Vec<Value>) -> EResult<Value> {
    match name {
        "get" => {
            let key = DictKey::try_from_value(&args[0]).map_err(|m| RuntimeErr::new("TypeError", m))?;
            Ok(dict.borrow().get(&key).cloned().unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None)))
        }
        "setdefault" => {
            let key = DictKey::try_from_value(&args[0]).map_err(|m| RuntimeErr::new("TypeError", m))?;
            let default = args.get(1).cloned().unwrap_or(Value::None);
            let mut borrowed = dict.borrow_mut();
            Ok(borrowed.entry(key).or_insert(default).clone())
        }
        "pop" => {
            let key = DictKey::try_from_value(&args[0]).map_err(|m| RuntimeErr::new("TypeError", m))?;
            dict.borrow_mut().shift_remove(&key).or_else(|| args.get(1).cloned()).ok_or_else(|| RuntimeErr::new("KeyError", repr(&args[0])))
        }
        "items" => {
            let items =
                dict.borrow().iter().map(|(k, v)| Value::Tuple(Rc::new(vec![k.to_value(), v.clone()]))).collect();
            Ok(Value::List(Rc::new(RefCell::new(items))))
        }
        "keys" => Ok(Value::List(Rc::new(RefCell::new(dict.borrow().keys().map(DictKey::to_value).collect())))),
        "values" => Ok(Value::List(Rc::new(RefCell::new(dict.borrow().values().cloned().collect())))),
        "update" => {
            if let Some(Value::Dict(other)) = args.into_iter().next() {
                let other = other.borrow().clone();
                dict.borrow_mut().extend(other);
            }
            Ok(Value::None)
        }
        other => Err(RuntimeErr::new("AttributeError", format!("'dict' object has no attribute '{other}'"))),
    }
}

fn call_set_method(set: &crate::value::SetRef, name: &str, args: Vec<Value>) -> EResult<Value> {
    match name {
        "add" => {
            let key = DictKey::try_from_value(&args[0]).map_err(|m| RuntimeErr::new("TypeError", m))?;
            set.borrow_mut().insert(key);
            Ok(Value::None)
        }
        "remove" | "discard" => {
            let key = DictKey::try_from_value(&args[0]).map_err(|m| RuntimeErr::new("TypeError", m))?;
            let removed = set.borrow_mut().shift_remove(&key);
            if !removed && name == "remove" {
                return Err(RuntimeErr::new("KeyError", repr(&args[0])));
            }
            Ok(Value::None)
        }
        "union" => {
            let mut out = set.borrow().clone();
            if let Some(Value::Set(other)) = args.into_iter().next() {
                out.extend(other.borrow().iter().cloned());
            }
            Ok(Value::Set(Rc::new(RefCell::new(out))))
        }
        "intersection" => {
            let mut out = indexmap::IndexSet::new();
            if let Some(Value::Set(other)) = args.into_iter().next() {
                let other = other.borrow();
                out.extend(set.borrow().iter().filter(|k| other.contains(*k)).cloned());
            }
            Ok(Value::Set(Rc::new(RefCell::new(out))))
        }
        "difference" => {
            let mut out = set.borrow().clone();
            if let Some(Value::Set(other)) = args.into_iter().next() {
                let other = other.borrow();
                out.retain(|k| !other.contains(k));
            }
            Ok(Value::Set(Rc::new(RefCell::new(out))))
        }
        other => Err(RuntimeErr::new("AttributeError", format!("'set' object has no attribute '{other}'"))),
    }
}

fn call_str_method(s: &Rc<String>, name: &str, args: Vec<Value>) -> EResult<Value> {
    match name {
        "upper" => Ok(Value::Str(Rc::new(s.to_uppercase()))),
        "lower" => Ok(Value::Str(Rc::new(s.to_lowercase()))),
        "strip" => Ok(Value::Str(Rc::new(s.trim().to_string()))),
        "split" => {
            let sep = args.first().map(|v| display_text(v));
            let parts: Vec<Value> = match sep {
                Some(sep) if !sep.is_empty() => s.split(sep.as_str()).map(|p| Value::Str(Rc::new(p.to_string()))).collect(),
                _ => s.split_whitespace().map(|p| Value::Str(Rc::new(p.to_string()))).collect(),
            };
            Ok(Value::List(Rc::new(RefCell::new(parts))))
        }
        "join" => {
            let Some(Value::List(items)) = args.into_iter().next() else {
                return Err(RuntimeErr::new("TypeError", "str.join() requires an iterable of strings"));
            };
            let parts: Vec<String> = items.borrow().iter().map(display_text).collect();
            Ok(Value::Str(Rc::new(parts.join(s.as_str()))))
        }
        "replace" => {
            let from = args.first().map(display_text).unwrap_or_default();
            let to = args.get(1).map(display_text).unwrap_or_default();
            Ok(Value::Str(Rc::new(s.replace(&from, &to))))
        }
        "startswith" => Ok(Value::Bool(s.starts_with(&args.first().map(display_text).unwrap_or_default()))),
        "endswith" => Ok(Value::Bool(s.ends_with(&args.first().map(display_text).unwrap_or_default()))),
        "find" => {
            let needle = args.first().map(display_text).unwrap_or_default();
            Ok(Value::Int(s.find(&needle).map_or(-1, |b| s[..b].chars().count() as i64)))
        }
        other => Err(RuntimeErr::new("AttributeError", format!("'str' object has no attribute '{other}'"))),
    }
}
