//! Object identity and the JSON-safe `Serialized` value shape (§4.A).
//!
//! The mutable runtime value model (`Value`, `Instance`, dict/list/set
//! backing storage) lives in `step-trace-interp`, which owns the AST and
//! the heap; this crate only needs to know how to *describe* a value once
//! it has already been reduced to something JSON-safe, plus the identity
//! type used to key `var_table`/`object_table` entries.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

/// Identity of a heap-allocated object, scoped to a single tracer run.
///
/// The Rust analogue of Python's `id()`: derived from the pointer address
/// of the `Rc` backing a mutable value. Never meaningful across runs (see
/// `spec.md` §5) and never meaningful after the `Rc` it was taken from is
/// dropped — callers only ever observe it within the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObjectId(usize);

impl ObjectId {
    #[must_use]
    pub fn of<T>(rc: &Rc<RefCell<T>>) -> Self {
        Self(Rc::as_ptr(rc) as *const () as usize)
    }

    #[must_use]
    pub fn of_tuple<T>(rc: &Rc<Vec<T>>) -> Self {
        Self(Rc::as_ptr(rc) as *const () as usize)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A JSON-safe value, per §4.A's Serialize rules. This is what `locals`,
/// `value`, and the primitive branch of `object_table` entries carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Serialized {
    Null,
    Bool(bool),
    Int(i64),
    /// Finite float. Non-finite floats are represented as `Special` per
    /// §4.A ("positive infinity → `"Infinity"`", etc.) so that the JSON
    /// encoding never has to smuggle a non-finite number through.
    Float(f64),
    /// `"Infinity"`, `"-Infinity"`, `"NaN"`, or a friendly short string for
    /// an unrecognized runtime value (class objects, functions, bound
    /// methods, …) per §4.A's formatter table.
    Special(String),
    Str(String),
    Array(Vec<Serialized>),
    Map(IndexMap<String, Serialized>),
}

impl Serialized {
    #[must_use]
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }
}

impl Serialize for Serialized {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Special(s) | Self::Str(s) => serializer.serialize_str(s),
            Self::Array(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
        }
    }
}
