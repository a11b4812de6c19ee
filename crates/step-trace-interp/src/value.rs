//! The mutable runtime value model.
//!
//! Kept separate from `step-trace-core::Serialized` (the JSON-safe output
//! shape) the way `ouros::object::Object` is kept separate from whatever
//! its tracers eventually serialize: this is the live, aliasable,
//! interior-mutable representation the evaluator operates on; `format.rs`
//! reduces it to `Serialized` only when a step needs to be recorded.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use step_trace_core::ObjectId;
use step_trace_parse::ast::Stmt;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type TupleRef = Rc<Vec<Value>>;
pub type SetRef = Rc<RefCell<IndexSet<DictKey>>>;
pub type DictRef = Rc<RefCell<IndexMap<DictKey, Value>>>;
pub type InstanceRef = Rc<RefCell<Instance>>;
pub type ClassRef = Rc<ClassValue>;
pub type FunctionRef = Rc<FunctionValue>;

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<String>),
    List(ListRef),
    Tuple(TupleRef),
    Dict(DictRef),
    Set(SetRef),
    Range(RangeValue),
    /// Materialized at use-site from the container value it was built from
    /// plus a starting offset; kept distinct from `List` purely so the
    /// friendly formatter can render it as `<enumerate object at 0x...>`
    /// until it's actually iterated.
    Enumerate(Rc<EnumerateValue>),
    Function(FunctionRef),
    Builtin(Rc<BuiltinFunction>),
    Class(ClassRef),
    Instance(InstanceRef),
    BoundMethod(Rc<BoundMethod>),
    /// A built-in collection method already bound to its receiver
    /// (`arr.append`, `d.items`, …). List/dict/set/str don't carry a
    /// user-visible `ClassValue`, so these are dispatched directly by name
    /// rather than through `ClassValue::find_method`.
    NativeMethod(Rc<NativeMethodValue>),
}

pub struct NativeMethodValue {
    pub receiver: Value,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    #[must_use]
    pub fn iter(self) -> impl Iterator<Item = i64> {
        let mut cur = self.start;
        let step = self.step;
        let stop = self.stop;
        std::iter::from_fn(move || {
            let keep = if step > 0 { cur < stop } else { cur > stop };
            if !keep {
                return None;
            }
            let v = cur;
            cur += step;
            Some(v)
        })
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.iter().count()
    }
}

pub struct EnumerateValue {
    pub items: Vec<Value>,
    pub start: i64,
}

pub struct FunctionValue {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Vec<Stmt>>,
    pub closure_class: Option<ClassRef>,
}

pub struct BuiltinFunction {
    pub name: &'static str,
}

pub struct ClassValue {
    pub name: String,
    pub bases: Vec<ClassRef>,
    pub methods: IndexMap<String, FunctionRef>,
}

impl ClassValue {
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<FunctionRef> {
        if let Some(m) = self.methods.get(name) {
            return Some(m.clone());
        }
        self.bases.iter().find_map(|b| b.find_method(name))
    }
}

pub struct Instance {
    pub class: ClassRef,
    pub attrs: IndexMap<String, Value>,
}

pub struct BoundMethod {
    pub receiver: Value,
    pub func: FunctionRef,
}

/// A hashable stand-in used as dict/set element keys. Only immutable,
/// naturally-hashable value shapes are legal keys; the evaluator raises a
/// runtime error when asked to use anything else (mirrors `TypeError:
/// unhashable type`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    None,
    Bool(bool),
    Int(i64),
    /// Bit pattern of a finite float; non-finite floats are rejected as
    /// unhashable before a `DictKey` is constructed.
    Float(u64),
    Str(Rc<String>),
    Tuple(Vec<DictKey>),
}

impl DictKey {
    pub fn try_from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::None => Ok(Self::None),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Int(i) => Ok(Self::Int(*i)),
            Value::Float(f) => {
                if f.is_finite() {
                    Ok(Self::Float(f.to_bits()))
                } else {
                    Err("unhashable type: 'float' (non-finite)".to_string())
                }
            }
            Value::Str(s) => Ok(Self::Str(s.clone())),
            Value::Tuple(items) => {
                let keys = items.iter().map(Self::try_from_value).collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Tuple(keys))
            }
            other => Err(format!("unhashable type: '{}'", type_name(other))),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::None => Value::None,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Float(bits) => Value::Float(f64::from_bits(*bits)),
            Self::Str(s) => Value::Str(s.clone()),
            Self::Tuple(items) => Value::Tuple(Rc::new(items.iter().map(Self::to_value).collect())),
        }
    }
}

#[must_use]
pub fn type_name(value: &Value) -> String {
    match value {
        Value::None => "NoneType".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Int(_) => "int".to_string(),
        Value::Float(_) => "float".to_string(),
        Value::Str(_) => "str".to_string(),
        Value::List(_) => "list".to_string(),
        Value::Tuple(_) => "tuple".to_string(),
        Value::Dict(_) => "dict".to_string(),
        Value::Set(_) => "set".to_string(),
        Value::Range(_) => "range".to_string(),
        Value::Enumerate(_) => "enumerate".to_string(),
        Value::Function(_) => "function".to_string(),
        Value::Builtin(_) => "builtin_function_or_method".to_string(),
        Value::Class(_) => "type".to_string(),
        Value::Instance(instance) => instance.borrow().class.name.clone(),
        Value::BoundMethod(_) => "method".to_string(),
        Value::NativeMethod(_) => "builtin_function_or_method".to_string(),
    }
}

#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(l) => !l.borrow().is_empty(),
        Value::Tuple(t) => !t.is_empty(),
        Value::Dict(d) => !d.borrow().is_empty(),
        Value::Set(s) => !s.borrow().is_empty(),
        Value::Range(r) => r.len() > 0,
        Value::Enumerate(e) => !e.items.is_empty(),
        Value::Function(_)
        | Value::Builtin(_)
        | Value::Class(_)
        | Value::Instance(_)
        | Value::BoundMethod(_)
        | Value::NativeMethod(_) => true,
    }
}

#[must_use]
pub fn object_id_of(value: &Value) -> Option<ObjectId> {
    match value {
        Value::List(l) => Some(ObjectId::of(l)),
        Value::Dict(d) => Some(ObjectId::of(d)),
        Value::Set(s) => Some(ObjectId::of(s)),
        Value::Instance(i) => Some(ObjectId::of(i)),
        Value::Tuple(t) => Some(ObjectId::of_tuple(t)),
        _ => None,
    }
}
