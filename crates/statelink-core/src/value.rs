#![forbid(unsafe_code)]

//! Shared object model for state and binding contexts.
//!
//! Plain values are [`serde_json::Value`]s. Objects that must be observed by
//! reference (store state, view-models, binding contexts) are wrapped in an
//! [`ObjectRef`]: a cheap-to-clone handle whose identity survives clones.
//!
//! # Invariants
//!
//! 1. Cloning an `ObjectRef` never copies the underlying map.
//! 2. `ptr_eq` is true only for handles created from the same `new` call.
//! 3. `snapshot` returns a deep copy; later writes do not affect it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Map;

/// Dynamic value type used by expressions, events and actions.
pub type Value = serde_json::Value;

/// Shared, mutable JSON object with reference identity.
#[derive(Clone, Default)]
pub struct ObjectRef {
    inner: Rc<RefCell<Map<String, Value>>>,
}

impl ObjectRef {
    /// Create an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing map.
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(map)),
        }
    }

    /// Wrap a JSON value, returning `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::from_map(map)),
            _ => None,
        }
    }

    /// Read a property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().get(key).cloned()
    }

    /// Write a property, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.borrow_mut().insert(key.into(), value)
    }

    /// Remove a property, returning its value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.borrow_mut().remove(key)
    }

    /// Whether the property exists (even when it holds `null`).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().contains_key(key)
    }

    /// Run `f` with a shared borrow of the underlying map.
    pub fn with<R>(&self, f: impl FnOnce(&Map<String, Value>) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Deep copy of the current contents as a JSON object.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        Value::Object(self.inner.borrow().clone())
    }

    /// Reference identity.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Map<String, Value>> for ObjectRef {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_map(map)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectRef").field(&self.inner.borrow()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_share_storage() {
        let a = ObjectRef::new();
        let b = a.clone();
        b.set("count", json!(3));
        assert_eq!(a.get("count"), Some(json!(3)));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn equal_contents_are_not_identical() {
        let a = ObjectRef::from_value(json!({"x": 1})).unwrap();
        let b = ObjectRef::from_value(json!({"x": 1})).unwrap();
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(ObjectRef::from_value(json!([1, 2])).is_none());
        assert!(ObjectRef::from_value(json!(null)).is_none());
    }

    #[test]
    fn snapshot_is_detached() {
        let obj = ObjectRef::from_value(json!({"x": 1})).unwrap();
        let snap = obj.snapshot();
        obj.set("x", json!(2));
        assert_eq!(snap, json!({"x": 1}));
    }

    #[test]
    fn contains_key_sees_null() {
        let obj = ObjectRef::from_value(json!({"gone": null})).unwrap();
        assert!(obj.contains_key("gone"));
        assert_eq!(obj.remove("gone"), Some(Value::Null));
        assert!(!obj.contains_key("gone"));
    }
}
