#![forbid(unsafe_code)]

//! Property tests: arbitrary interleavings of lifecycle calls, events and
//! commits keep registrations and the derived scope consistent.

use std::rc::Rc;

use proptest::prelude::*;
use serde_json::json;
use statelink_core::{Element, Event, ObjectRef, Scope, Store};
use statelink_expr::{AstEvaluator, Expr};
use statelink_harness::MemoryStore;
use statelink_runtime::StateDispatchBinding;

#[derive(Debug, Clone)]
enum Op {
    Bind,
    Unbind,
    Click,
    Commit(i64),
    Flush,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Bind),
        Just(Op::Unbind),
        Just(Op::Click),
        any::<i16>().prop_map(|n| Op::Commit(i64::from(n))),
        Just(Op::Flush),
    ]
}

proptest! {
    #[test]
    fn registrations_track_bound_flag(ops in prop::collection::vec(op(), 0..40)) {
        let element = Element::new("button");
        let store = MemoryStore::new(json!({"count": 0}));
        store.register("inc", |state, _| {
            let mut next = state.clone();
            let count = next.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
            next.insert("count".into(), json!(count + 1));
            Ok(next)
        });
        let expr = Expr::object([("type", Expr::lit("inc"))]);
        let binding =
            StateDispatchBinding::new(AstEvaluator, expr, element.clone(), "click", store.clone());
        let view = Scope::new(ObjectRef::new());

        let mut expected_bound = false;
        let mut bound_scope: Option<Rc<Scope>> = None;
        let mut clicks_while_bound = 0usize;

        for op in ops {
            match op {
                Op::Bind => {
                    binding.bind(&view).unwrap();
                    if !expected_bound {
                        bound_scope = binding.scope();
                    }
                    expected_bound = true;
                }
                Op::Unbind => {
                    binding.unbind().unwrap();
                    expected_bound = false;
                    bound_scope = None;
                }
                Op::Click => {
                    let handled = element.dispatch_event(&Event::new("click")).unwrap();
                    if expected_bound {
                        clicks_while_bound += 1;
                    }
                    prop_assert_eq!(handled, usize::from(expected_bound));
                }
                Op::Commit(n) => {
                    store.commit(json!({"count": n}));
                }
                Op::Flush => {
                    store.flush();
                }
            }

            prop_assert_eq!(binding.is_bound(), expected_bound);
            let registrations = usize::from(expected_bound);
            prop_assert_eq!(element.listener_count("click"), registrations);
            prop_assert_eq!(store.subscriber_count(), registrations);

            match (&bound_scope, binding.scope()) {
                (Some(expected), Some(actual)) => {
                    prop_assert!(Rc::ptr_eq(expected, &actual));
                    prop_assert!(actual.binding_context().ptr_eq(&store.get_state()));
                }
                (None, None) => {}
                _ => prop_assert!(false, "scope presence diverged from bound flag"),
            }
        }

        prop_assert_eq!(store.dispatched().len(), clicks_while_bound);
    }
}
