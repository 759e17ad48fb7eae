//! Class instances.
//!
//! An instance is a class name plus an open attribute bag.  Attributes are
//! created on first assignment (usually `var this.x = ...` inside `init`)
//! and are never removed.  Instances are shared by reference: every variable,
//! argument, or list element holding one sees the same attribute map.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::error::EvalError;
use super::value::Value;

/// Shared handle to an [`Instance`].
pub type InstanceRef = Rc<RefCell<Instance>>;

/// A runtime object created by `new CLASS(...)`.
#[derive(Debug)]
pub struct Instance {
    class_name: String,
    attributes: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class_name: impl Into<String>) -> Self {
        Instance {
            class_name: class_name.into(),
            attributes: HashMap::new(),
        }
    }

    /// Allocate a new instance behind a shared handle.
    pub fn new_ref(class_name: impl Into<String>) -> InstanceRef {
        Rc::new(RefCell::new(Self::new(class_name)))
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Read an attribute; a missing key is an evaluation failure.
    pub fn get_attr(&self, name: &str) -> Result<Value, EvalError> {
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::AttributeNotFound(name.to_owned()))
    }

    /// Insert or overwrite an attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<instance of {}>", self.class_name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
