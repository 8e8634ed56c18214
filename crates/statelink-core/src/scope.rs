#![forbid(unsafe_code)]

//! Lexical scope chain used to resolve identifiers in bound expressions.
//!
//! A [`Scope`] pairs a *binding context* (the object top-level identifiers
//! resolve against) with an [`OverrideContext`] (locally injected names plus
//! a link to the next outer override context).
//!
//! # Resolution Order
//!
//! Lookups walk the override chain innermost-first. At each level:
//!
//! 1. local overrides (e.g. the current event),
//! 2. the level's binding context.
//!
//! At the innermost level the scope's own binding context is consulted;
//! outer levels use their override context's binding-context alias.
//!
//! # Invariants
//!
//! 1. A scope's identity never changes while callers hold its `Rc`; replacing
//!    a binding context mutates the scope in place.
//! 2. Dropping a [`TransientLocal`] restores the override context to the
//!    shape it had before the injection, on every exit path.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Map;

use crate::value::{ObjectRef, Value};

/// Per-scope storage for locally injected names plus the outer link.
pub struct OverrideContext {
    binding_context: RefCell<ObjectRef>,
    locals: RefCell<Map<String, Value>>,
    parent: Option<Rc<OverrideContext>>,
}

impl OverrideContext {
    /// Create an override context aliasing `binding_context`.
    #[must_use]
    pub fn new(binding_context: ObjectRef, parent: Option<Rc<OverrideContext>>) -> Rc<Self> {
        Rc::new(Self {
            binding_context: RefCell::new(binding_context),
            locals: RefCell::new(Map::new()),
            parent,
        })
    }

    /// The binding-context alias held by this override context.
    #[must_use]
    pub fn binding_context(&self) -> ObjectRef {
        self.binding_context.borrow().clone()
    }

    /// Point the alias at a new object, returning the old one.
    pub fn replace_binding_context(&self, context: ObjectRef) -> ObjectRef {
        self.binding_context.replace(context)
    }

    /// The next outer override context, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Rc<OverrideContext>> {
        self.parent.as_ref()
    }

    /// Read a local override.
    #[must_use]
    pub fn get_local(&self, key: &str) -> Option<Value> {
        self.locals.borrow().get(key).cloned()
    }

    /// Whether a local override with this name exists.
    #[must_use]
    pub fn has_local(&self, key: &str) -> bool {
        self.locals.borrow().contains_key(key)
    }

    /// Set a local override, returning the previous value.
    pub fn set_local(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.locals.borrow_mut().insert(key.into(), value)
    }

    /// Remove a local override.
    pub fn remove_local(&self, key: &str) -> Option<Value> {
        self.locals.borrow_mut().remove(key)
    }

    /// Temporarily attach `value` under `key`.
    ///
    /// The returned guard undoes the injection when dropped, restoring any
    /// value the key held before.
    #[must_use = "dropping the guard removes the injected value immediately"]
    pub fn inject(&self, key: impl Into<String>, value: Value) -> TransientLocal<'_> {
        let key = key.into();
        let previous = self.set_local(key.clone(), value);
        TransientLocal {
            context: self,
            key,
            previous,
        }
    }
}

impl fmt::Debug for OverrideContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideContext")
            .field("locals", &self.locals.borrow().keys().collect::<Vec<_>>())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// RAII guard for a transient override-context entry.
#[must_use = "dropping the guard removes the injected value immediately"]
pub struct TransientLocal<'a> {
    context: &'a OverrideContext,
    key: String,
    previous: Option<Value>,
}

impl Drop for TransientLocal<'_> {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => {
                self.context.set_local(self.key.clone(), previous);
            }
            None => {
                self.context.remove_local(&self.key);
            }
        }
    }
}

/// Where a name resolved to.
enum Slot {
    Local(Rc<OverrideContext>),
    Context(ObjectRef),
}

/// One lexical level: a binding context plus its override context.
pub struct Scope {
    binding_context: RefCell<ObjectRef>,
    override_context: Rc<OverrideContext>,
}

impl Scope {
    /// Root scope whose override context aliases `binding_context` and has
    /// no parent.
    #[must_use]
    pub fn new(binding_context: ObjectRef) -> Rc<Self> {
        let override_context = OverrideContext::new(binding_context.clone(), None);
        Self::with_override_context(binding_context, override_context)
    }

    /// Scope over an explicit override context.
    #[must_use]
    pub fn with_override_context(
        binding_context: ObjectRef,
        override_context: Rc<OverrideContext>,
    ) -> Rc<Self> {
        Rc::new(Self {
            binding_context: RefCell::new(binding_context),
            override_context,
        })
    }

    /// Current binding context.
    #[must_use]
    pub fn binding_context(&self) -> ObjectRef {
        self.binding_context.borrow().clone()
    }

    /// Swap the binding context in place, returning the old one.
    pub fn replace_binding_context(&self, context: ObjectRef) -> ObjectRef {
        self.binding_context.replace(context)
    }

    /// The scope's override context.
    #[must_use]
    pub fn override_context(&self) -> &Rc<OverrideContext> {
        &self.override_context
    }

    /// Resolve `name` through the scope chain.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match self.locate(name)? {
            Slot::Local(oc) => oc.get_local(name),
            Slot::Context(ctx) => ctx.get(name),
        }
    }

    /// Whether any level defines `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.locate(name).is_some()
    }

    /// Write `name`: to the level that already defines it, otherwise to
    /// this scope's binding context.
    pub fn assign(&self, name: &str, value: Value) {
        match self.locate(name) {
            Some(Slot::Local(oc)) => {
                oc.set_local(name, value);
            }
            Some(Slot::Context(ctx)) => {
                ctx.set(name, value);
            }
            None => {
                self.binding_context().set(name, value);
            }
        }
    }

    /// Number of override levels reachable from this scope.
    #[must_use]
    pub fn depth(&self) -> usize {
        std::iter::successors(Some(&self.override_context), |oc| oc.parent()).count()
    }

    fn locate(&self, name: &str) -> Option<Slot> {
        let mut level = Some(&self.override_context);
        let mut innermost = true;
        while let Some(oc) = level {
            if oc.has_local(name) {
                return Some(Slot::Local(Rc::clone(oc)));
            }
            let ctx = if innermost {
                self.binding_context()
            } else {
                oc.binding_context()
            };
            if ctx.contains_key(name) {
                return Some(Slot::Context(ctx));
            }
            innermost = false;
            level = oc.parent();
        }
        None
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("binding_context", &self.binding_context.borrow())
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> ObjectRef {
        ObjectRef::from_value(value).unwrap()
    }

    fn chained(inner: Value, outer: Value) -> Rc<Scope> {
        let outer = Scope::new(obj(outer));
        let inner = obj(inner);
        let oc = OverrideContext::new(inner.clone(), Some(Rc::clone(outer.override_context())));
        Scope::with_override_context(inner, oc)
    }

    #[test]
    fn inner_context_shadows_outer() {
        let scope = chained(json!({"name": "inner"}), json!({"name": "outer", "only": 1}));
        assert_eq!(scope.lookup("name"), Some(json!("inner")));
        assert_eq!(scope.lookup("only"), Some(json!(1)));
        assert_eq!(scope.lookup("missing"), None);
        assert_eq!(scope.depth(), 2);
    }

    #[test]
    fn locals_shadow_binding_context() {
        let scope = Scope::new(obj(json!({"x": 1})));
        scope.override_context().set_local("x", json!(2));
        assert_eq!(scope.lookup("x"), Some(json!(2)));
    }

    #[test]
    fn outer_locals_are_visible() {
        let outer = Scope::new(obj(json!({})));
        outer.override_context().set_local("$index", json!(4));
        let inner = obj(json!({}));
        let oc = OverrideContext::new(inner.clone(), Some(Rc::clone(outer.override_context())));
        let scope = Scope::with_override_context(inner, oc);
        assert_eq!(scope.lookup("$index"), Some(json!(4)));
    }

    #[test]
    fn assign_targets_defining_level() {
        let outer_ctx = obj(json!({"title": "a"}));
        let outer = Scope::new(outer_ctx.clone());
        let inner = obj(json!({"count": 0}));
        let oc = OverrideContext::new(inner.clone(), Some(Rc::clone(outer.override_context())));
        let scope = Scope::with_override_context(inner.clone(), oc);

        scope.assign("title", json!("b"));
        scope.assign("count", json!(1));
        scope.assign("fresh", json!(true));

        assert_eq!(outer_ctx.get("title"), Some(json!("b")));
        assert_eq!(inner.get("count"), Some(json!(1)));
        assert_eq!(inner.get("fresh"), Some(json!(true)));
        assert!(!outer_ctx.contains_key("fresh"));
    }

    #[test]
    fn replacing_binding_context_keeps_identity() {
        let scope = Scope::new(obj(json!({"a": 1})));
        let before = Rc::clone(&scope);
        scope.replace_binding_context(obj(json!({"b": 2})));
        assert!(Rc::ptr_eq(&before, &scope));
        assert_eq!(scope.lookup("b"), Some(json!(2)));
        assert_eq!(scope.lookup("a"), None);
    }

    #[test]
    fn transient_local_is_removed_on_drop() {
        let scope = Scope::new(ObjectRef::new());
        {
            let _guard = scope.override_context().inject("$event", json!({"type": "click"}));
            assert!(scope.has("$event"));
        }
        assert!(!scope.has("$event"));
    }

    #[test]
    fn transient_local_restores_previous_value() {
        let scope = Scope::new(ObjectRef::new());
        let oc = scope.override_context();
        oc.set_local("$event", json!("outer"));
        {
            let _guard = oc.inject("$event", json!("inner"));
            assert_eq!(scope.lookup("$event"), Some(json!("inner")));
        }
        assert_eq!(scope.lookup("$event"), Some(json!("outer")));
    }

    #[test]
    fn transient_local_cleans_up_during_unwind() {
        let scope = Scope::new(ObjectRef::new());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = scope.override_context().inject("$event", json!(1));
            panic!("evaluation blew up");
        }));
        assert!(result.is_err());
        assert!(!scope.override_context().has_local("$event"));
    }

    #[test]
    fn nested_injections_are_lifo() {
        let scope = Scope::new(ObjectRef::new());
        let oc = scope.override_context();
        let outer = oc.inject("k", json!(1));
        {
            let _inner = oc.inject("k", json!(2));
            assert_eq!(oc.get_local("k"), Some(json!(2)));
        }
        assert_eq!(oc.get_local("k"), Some(json!(1)));
        drop(outer);
        assert!(!oc.has_local("k"));
    }

    proptest::proptest! {
        #[test]
        fn injection_leaves_locals_as_found(
            existing in proptest::option::of(proptest::num::i64::ANY),
            injected in proptest::num::i64::ANY,
        ) {
            let scope = Scope::new(ObjectRef::new());
            let oc = scope.override_context();
            if let Some(v) = existing {
                oc.set_local("$event", json!(v));
            }
            {
                let _guard = oc.inject("$event", json!(injected));
                proptest::prop_assert_eq!(scope.lookup("$event"), Some(json!(injected)));
            }
            proptest::prop_assert_eq!(oc.get_local("$event"), existing.map(|v| json!(v)));
        }
    }
}
