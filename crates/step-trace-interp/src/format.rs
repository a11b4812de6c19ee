//! Friendly formatting and the `Value` → `Serialized` reduction (§4.A).
//!
//! Grounded on `utils.py::format_object_nicely`: bidirectional-safe values
//! (`None`, `bool`, `int`, `float`, `str`, `list`, `dict`) serialize
//! directly; everything else reduces to a short descriptive string.

use indexmap::IndexMap;

use step_trace_core::{ObjectId, Serialized};

use crate::value::{type_name, DictKey, Value};

#[must_use]
pub fn format_object_nicely(value: &Value) -> String {
    match value {
        Value::Class(class) => format!("<class '{}'>", class.name),
        Value::Builtin(b) => format!("<built-in function {}>", b.name),
        Value::Function(f) => format!("<function {} at {}>", f.name, addr_of(value)),
        Value::BoundMethod(m) => {
            let owner = type_name(&m.receiver);
            format!("<bound method {}.{} of {} object at {}>", owner, m.func.name, owner, addr_of(&m.receiver))
        }
        Value::Enumerate(_) => format!("<enumerate object at {}>", addr_of(value)),
        Value::Range(r) => {
            if r.step == 1 {
                format!("range({}, {})", r.start, r.stop)
            } else {
                format!("range({}, {}, {})", r.start, r.stop, r.step)
            }
        }
        Value::Tuple(items) => {
            let parts: Vec<String> = items.iter().map(repr).collect();
            if parts.len() == 1 {
                format!("({},)", parts[0])
            } else {
                format!("({})", parts.join(", "))
            }
        }
        Value::Instance(instance) => {
            let name = instance.borrow().class.name.clone();
            format!("{}#{:04X}", name, addr_bits(value) & 0xFFFF)
        }
        Value::NativeMethod(m) => {
            let owner = type_name(&m.receiver);
            format!("<built-in method {} of {} object at {}>", m.name, owner, addr_of(&m.receiver))
        }
        Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) | Value::List(_) | Value::Dict(_) | Value::Set(_) => {
            repr(value)
        }
    }
}

fn addr_of(value: &Value) -> String {
    format!("0x{:012x}", addr_bits(value))
}

fn addr_bits(value: &Value) -> usize {
    match value {
        Value::Function(f) => std::rc::Rc::as_ptr(f) as *const () as usize,
        Value::BoundMethod(m) => std::rc::Rc::as_ptr(m) as *const () as usize,
        Value::Enumerate(e) => std::rc::Rc::as_ptr(e) as *const () as usize,
        Value::Instance(i) => std::rc::Rc::as_ptr(i) as *const () as usize,
        _ => 0,
    }
}

/// A `repr()`-flavored rendering, used for scalar display and to build
/// composite friendly strings (tuple elements, …).
#[must_use]
pub fn repr(value: &Value) -> String {
    match value {
        Value::None => "None".to_string(),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Str(s) => format!("'{s}'"),
        Value::List(items) => format!("[{}]", items.borrow().iter().map(repr).collect::<Vec<_>>().join(", ")),
        Value::Dict(entries) => {
            let parts: Vec<String> =
                entries.borrow().iter().map(|(k, v)| format!("{}: {}", repr(&k.to_value()), repr(v))).collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Set(items) => {
            if items.borrow().is_empty() {
                "set()".to_string()
            } else {
                format!("{{{}}}", items.borrow().iter().map(|k| repr(&k.to_value())).collect::<Vec<_>>().join(", "))
            }
        }
        Value::Instance(_) => format_object_nicely(value),
        Value::Tuple(_)
        | Value::Range(_)
        | Value::Enumerate(_)
        | Value::Function(_)
        | Value::Builtin(_)
        | Value::Class(_)
        | Value::BoundMethod(_)
        | Value::NativeMethod(_) => format_object_nicely(value),
    }
}

fn format_float(f: f64) -> String {
    if f.is_infinite() {
        return if f > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Reduces a live value to its JSON-safe form for a step's `locals`/`value`
/// field. Collections are serialized shallowly here (nested collections
/// become nested `Serialized` structures); the object table (built
/// separately, see `object_table.rs`) is what lets the visualizer follow
/// shared/aliased references across variables.
#[must_use]
pub fn serialize(value: &Value) -> Serialized {
    match value {
        Value::None => Serialized::Null,
        Value::Bool(b) => Serialized::Bool(*b),
        Value::Int(i) => Serialized::Int(*i),
        Value::Float(f) => {
            if f.is_finite() {
                Serialized::Float(*f)
            } else if f.is_nan() {
                Serialized::Special("NaN".to_string())
            } else if *f > 0.0 {
                Serialized::Special("Infinity".to_string())
            } else {
                Serialized::Special("-Infinity".to_string())
            }
        }
        Value::Str(s) => Serialized::str(s.as_str()),
        Value::List(items) => Serialized::Array(items.borrow().iter().map(serialize).collect()),
        Value::Tuple(items) => Serialized::Array(items.iter().map(serialize).collect()),
        Value::Set(items) => Serialized::Array(items.borrow().iter().map(|k| serialize(&k.to_value())).collect()),
        Value::Dict(entries) => {
            let mut map = IndexMap::new();
            for (k, v) in entries.borrow().iter() {
                map.insert(dict_key_to_string(k), serialize(v));
            }
            Serialized::Map(map)
        }
        Value::Instance(instance) => {
            let mut map = IndexMap::new();
            for (k, v) in &instance.borrow().attrs {
                map.insert(k.clone(), serialize(v));
            }
            Serialized::Map(map)
        }
        other => Serialized::Special(format_object_nicely(other)),
    }
}

#[must_use]
pub fn dict_key_to_string(key: &DictKey) -> String {
    match key {
        DictKey::Str(s) => s.as_str().to_string(),
        other => repr(&other.to_value()),
    }
}

#[must_use]
pub fn object_id_display(id: ObjectId) -> String {
    id.to_string()
}
