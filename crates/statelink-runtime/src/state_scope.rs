#![forbid(unsafe_code)]

//! Scope derivation for state bindings.

use std::rc::Rc;

use statelink_core::{ObjectRef, OverrideContext, Scope};

/// Build the scope a state binding evaluates in.
///
/// The returned scope's binding context is `state`. Its override context
/// aliases `state` and chains to `outer`'s override context, so expressions
/// see store properties first and can still reach the surrounding view's
/// names (and anything injected into its override context).
#[must_use]
pub fn create_state_binding_scope(state: ObjectRef, outer: &Scope) -> Rc<Scope> {
    let override_context =
        OverrideContext::new(state.clone(), Some(Rc::clone(outer.override_context())));
    Scope::with_override_context(state, override_context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_shadows_view_and_view_stays_reachable() {
        let view = ObjectRef::from_value(json!({"title": "Todo", "count": -1})).unwrap();
        let outer = Scope::new(view);
        let state = ObjectRef::from_value(json!({"count": 3})).unwrap();

        let scope = create_state_binding_scope(state.clone(), &outer);

        assert!(scope.binding_context().ptr_eq(&state));
        assert!(scope.override_context().binding_context().ptr_eq(&state));
        assert_eq!(scope.lookup("count"), Some(json!(3)));
        assert_eq!(scope.lookup("title"), Some(json!("Todo")));
        assert_eq!(scope.depth(), 2);
    }

    #[test]
    fn chains_to_outer_override_context() {
        let outer = Scope::new(ObjectRef::new());
        let scope = create_state_binding_scope(ObjectRef::new(), &outer);
        let parent = scope.override_context().parent().unwrap();
        assert!(Rc::ptr_eq(parent, outer.override_context()));

        outer.override_context().set_local("$index", json!(2));
        assert_eq!(scope.lookup("$index"), Some(json!(2)));
    }
}
