#![forbid(unsafe_code)]

//! Queued in-memory store.
//!
//! # Invariants
//!
//! 1. `dispatch` only records and queues; state changes happen in `flush`.
//! 2. Each successful reducer run commits a *new* state object and notifies
//!    subscribers synchronously, in subscription order.
//! 3. Failed or unknown actions settle their completion with an error and do
//!    not commit.
//! 4. Subscribers are held by identity; subscribing the same `Rc` twice
//!    yields two deliveries per commit (the store does not deduplicate).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use serde_json::Map;
use statelink_core::{Completion, DispatchError, ObjectRef, Store, StoreSubscriber, Value};

/// Pure state transition: current state plus params to next state.
pub type Reducer =
    Rc<dyn Fn(&Map<String, Value>, &[Value]) -> Result<Map<String, Value>, DispatchError>>;

/// One `dispatch` call as the store received it.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    /// Action name.
    pub action: String,
    /// Positional parameters.
    pub params: Vec<Value>,
}

struct Pending {
    record: DispatchRecord,
    completion: Completion,
}

/// In-memory [`Store`] with deferred dispatch.
pub struct MemoryStore {
    state: RefCell<ObjectRef>,
    reducers: RefCell<AHashMap<String, Reducer>>,
    subscribers: RefCell<Vec<Rc<dyn StoreSubscriber>>>,
    pending: RefCell<VecDeque<Pending>>,
    log: RefCell<Vec<DispatchRecord>>,
    commits: Cell<u64>,
}

impl MemoryStore {
    /// Create a store whose initial state is `initial` (non-objects become `{}`).
    #[must_use]
    pub fn new(initial: Value) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(ObjectRef::from_value(initial).unwrap_or_default()),
            reducers: RefCell::new(AHashMap::new()),
            subscribers: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            log: RefCell::new(Vec::new()),
            commits: Cell::new(0),
        })
    }

    /// Register the reducer for `action`, replacing any previous one.
    pub fn register<F>(&self, action: impl Into<String>, reducer: F)
    where
        F: Fn(&Map<String, Value>, &[Value]) -> Result<Map<String, Value>, DispatchError>
            + 'static,
    {
        self.reducers
            .borrow_mut()
            .insert(action.into(), Rc::new(reducer));
    }

    /// Apply every queued dispatch, including ones queued by subscribers
    /// while flushing. Returns the number of dispatches processed.
    pub fn flush(&self) -> usize {
        let mut processed = 0;
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(Pending { record, completion }) = next else {
                break;
            };
            processed += 1;

            let reducer = self.reducers.borrow().get(&record.action).cloned();
            let outcome = match reducer {
                Some(reducer) => {
                    let current = self.state.borrow().clone();
                    current
                        .with(|state| reducer(state, &record.params))
                        .map(|next| {
                            self.commit_object(ObjectRef::from_map(next));
                        })
                }
                None => Err(DispatchError::UnknownAction(record.action.clone())),
            };

            if let Err(err) = &outcome {
                tracing::debug!(
                    target: "statelink::harness",
                    action = %record.action,
                    error = %err,
                    "dispatch failed"
                );
            }
            completion.settle(outcome);
        }
        processed
    }

    /// Commit `state` directly, bypassing reducers.
    pub fn commit(&self, state: Value) -> ObjectRef {
        let object = ObjectRef::from_value(state).unwrap_or_default();
        self.commit_object(object.clone());
        object
    }

    /// Commit an existing object (identity preserved) and notify subscribers.
    pub fn commit_object(&self, state: ObjectRef) {
        self.state.replace(state.clone());
        self.commits.set(self.commits.get() + 1);
        let snapshot: Vec<_> = self.subscribers.borrow().clone();
        for subscriber in snapshot {
            subscriber.handle_state_change(&state);
        }
    }

    /// Every dispatch received so far, in order.
    #[must_use]
    pub fn dispatched(&self) -> Vec<DispatchRecord> {
        self.log.borrow().clone()
    }

    /// Dispatches waiting for `flush`.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Current number of subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Number of commits so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.get()
    }
}

impl Store for MemoryStore {
    fn get_state(&self) -> ObjectRef {
        self.state.borrow().clone()
    }

    fn dispatch(&self, action: &str, params: Vec<Value>) -> Completion {
        let record = DispatchRecord {
            action: action.to_owned(),
            params,
        };
        let completion = Completion::pending();
        self.log.borrow_mut().push(record.clone());
        self.pending.borrow_mut().push_back(Pending {
            record,
            completion: completion.clone(),
        });
        completion
    }

    fn subscribe(&self, subscriber: Rc<dyn StoreSubscriber>) {
        self.subscribers.borrow_mut().push(subscriber);
    }

    fn unsubscribe(&self, subscriber: &Rc<dyn StoreSubscriber>) {
        let mut subscribers = self.subscribers.borrow_mut();
        if let Some(index) = subscribers
            .iter()
            .position(|s| std::ptr::addr_eq(Rc::as_ptr(s), Rc::as_ptr(subscriber)))
        {
            subscribers.remove(index);
        }
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("state", &self.state.borrow())
            .field("pending", &self.pending.borrow().len())
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Seen(RefCell<Vec<Value>>);

    impl StoreSubscriber for Seen {
        fn handle_state_change(&self, state: &ObjectRef) {
            self.0.borrow_mut().push(state.snapshot());
        }
    }

    fn counter_store() -> Rc<MemoryStore> {
        let store = MemoryStore::new(json!({"count": 0}));
        store.register("add", |state, params| {
            let mut next = state.clone();
            let by = params.first().and_then(Value::as_i64).unwrap_or(1);
            let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
            next.insert("count".into(), json!(count + by));
            Ok(next)
        });
        store
    }

    #[test]
    fn dispatch_is_deferred_until_flush() {
        let store = counter_store();
        let done = store.dispatch("add", vec![json!(2)]);
        assert!(!done.is_settled());
        assert_eq!(store.get_state().get("count"), Some(json!(0)));

        assert_eq!(store.flush(), 1);
        assert_eq!(done.outcome(), Some(Ok(())));
        assert_eq!(store.get_state().get("count"), Some(json!(2)));
    }

    #[test]
    fn each_commit_is_a_new_object() {
        let store = counter_store();
        let before = store.get_state();
        store.dispatch("add", vec![]);
        store.flush();
        assert!(!before.ptr_eq(&store.get_state()));
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn unknown_action_settles_with_error() {
        let store = counter_store();
        let done = store.dispatch("nope", vec![]);
        store.flush();
        assert_eq!(
            done.outcome(),
            Some(Err(DispatchError::UnknownAction("nope".into())))
        );
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn subscribers_receive_commits_until_unsubscribed() {
        let store = counter_store();
        let seen = Rc::new(Seen(RefCell::new(Vec::new())));
        let sub: Rc<dyn StoreSubscriber> = seen.clone();
        store.subscribe(Rc::clone(&sub));

        store.commit(json!({"count": 10}));
        store.unsubscribe(&sub);
        store.commit(json!({"count": 11}));

        assert_eq!(*seen.0.borrow(), vec![json!({"count": 10})]);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn register_replaces_previous_reducer() {
        let store = counter_store();
        store.register("add", |state, _| {
            let mut next = state.clone();
            next.insert("count".into(), json!(-1));
            Ok(next)
        });
        store.dispatch("add", vec![json!(5)]);
        store.flush();
        assert_eq!(store.get_state().get("count"), Some(json!(-1)));
    }

    #[test]
    fn dispatch_log_preserves_order_and_params() {
        let store = counter_store();
        store.dispatch("add", vec![json!(1), json!("x")]);
        store.dispatch("reset", vec![]);
        assert_eq!(store.pending_count(), 2);
        assert_eq!(
            store.dispatched(),
            vec![
                DispatchRecord {
                    action: "add".into(),
                    params: vec![json!(1), json!("x")],
                },
                DispatchRecord {
                    action: "reset".into(),
                    params: vec![],
                },
            ]
        );
    }
}
