//! Variable environments.
//!
//! One [`Environment`] per executing frame.  The top-level script, every
//! function call, every method call, and every loop iteration get their own;
//! `if` branches reuse the caller's.  Environments are plain value maps:
//! cloning one snapshots it, and there is no parent chain (no closures).

use std::collections::HashMap;

use super::object::InstanceRef;
use super::value::Value;

/// Conventional name of the bound method receiver.
pub const RECEIVER: &str = "this";

/// Variable bindings for one executing frame.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh environment holding only positional call arguments.
    pub fn with_args(names: &[String], values: Vec<Value>) -> Self {
        let mut env = Self::new();
        for (name, value) in names.iter().zip(values) {
            env.set(name.clone(), value);
        }
        env
    }

    /// A fresh method frame: the receiver plus positional arguments.
    pub fn for_method(receiver: InstanceRef, names: &[String], values: Vec<Value>) -> Self {
        let mut env = Self::new();
        env.set(RECEIVER, Value::Instance(receiver));
        for (name, value) in names.iter().zip(values) {
            env.set(name.clone(), value);
        }
        env
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// The bound receiver, if this frame belongs to a method call.
    pub fn receiver(&self) -> Option<&InstanceRef> {
        self.vars.get(RECEIVER).and_then(Value::as_instance)
    }

    /// Resolve a bare name the way expressions see it: receiver attributes
    /// shadow frame variables.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(this) = self.receiver() {
            if let Ok(v) = this.borrow().get_attr(name) {
                return Some(v);
            }
        }
        self.vars.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn into_vars(self) -> HashMap<String, Value> {
        self.vars
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
