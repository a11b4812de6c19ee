//! Local-binding storage for one call frame.
//!
//! `ouros::namespace::Namespace` stores locals as an index-addressed
//! `Vec<Value>` because its compiler resolves every name to a slot ahead of
//! time. This tree-walking evaluator never compiles names to slots, so
//! `Scope` keeps the ordered, name-keyed map directly — insertion order is
//! preserved the same way `ouros`'s index order is, which is what lets a
//! step's `locals` snapshot come out in declaration order for free.

use indexmap::IndexMap;

use crate::value::Value;

pub struct Scope {
    vars: IndexMap<String, Value>,
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self { vars: IndexMap::new() }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
