#![forbid(unsafe_code)]

//! Store contract consumed by state bindings.
//!
//! A store owns the current state object, accepts named actions and notifies
//! subscribers once a new state is committed. Dispatch may complete later
//! than the call that issued it; the returned [`Completion`] reports the
//! outcome. Dropping a `Completion` never cancels the dispatch.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::DispatchError;
use crate::value::{ObjectRef, Value};

/// Receives committed state from a [`Store`].
pub trait StoreSubscriber {
    /// Called synchronously with the newly committed state object.
    fn handle_state_change(&self, state: &ObjectRef);
}

/// Centralized, subscribable state container.
pub trait Store {
    /// Current state object. Pure read.
    fn get_state(&self) -> ObjectRef;

    /// Request that `action` be applied with positional `params`.
    fn dispatch(&self, action: &str, params: Vec<Value>) -> Completion;

    /// Start delivering commits to `subscriber`.
    fn subscribe(&self, subscriber: Rc<dyn StoreSubscriber>);

    /// Stop delivering commits to `subscriber`. Unknown subscribers are ignored.
    fn unsubscribe(&self, subscriber: &Rc<dyn StoreSubscriber>);
}

/// Settle-once outcome handle for a dispatch.
///
/// Clones observe the same outcome.
#[derive(Clone, Default)]
pub struct Completion {
    outcome: Rc<RefCell<Option<Result<(), DispatchError>>>>,
}

impl Completion {
    /// A completion that has not settled yet.
    #[must_use]
    pub fn pending() -> Self {
        Self::default()
    }

    /// A completion that already carries `outcome`.
    #[must_use]
    pub fn settled(outcome: Result<(), DispatchError>) -> Self {
        let completion = Self::pending();
        completion.settle(outcome);
        completion
    }

    /// Record the outcome. Only the first call has an effect.
    ///
    /// Returns `true` if this call settled the completion.
    pub fn settle(&self, outcome: Result<(), DispatchError>) -> bool {
        let mut slot = self.outcome.borrow_mut();
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        true
    }

    /// Whether an outcome has been recorded.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// The recorded outcome, if settled.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<(), DispatchError>> {
        self.outcome.borrow().clone()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("outcome", &self.outcome.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_once() {
        let c = Completion::pending();
        assert!(!c.is_settled());
        assert!(c.settle(Ok(())));
        assert!(!c.settle(Err(DispatchError::UnknownAction("x".into()))));
        assert_eq!(c.outcome(), Some(Ok(())));
    }

    #[test]
    fn clones_share_outcome() {
        let c = Completion::pending();
        let observer = c.clone();
        drop(c.clone());
        c.settle(Err(DispatchError::UnknownAction("nope".into())));
        assert_eq!(
            observer.outcome(),
            Some(Err(DispatchError::UnknownAction("nope".into())))
        );
    }

    #[test]
    fn settled_constructor() {
        assert!(Completion::settled(Ok(())).is_settled());
    }
}
