#![forbid(unsafe_code)]

//! Event-to-store dispatch binding.
//!
//! A [`StateDispatchBinding`] connects one named event on one target to a
//! [`Store`]. While bound, each occurrence of the event evaluates the bound
//! expression in a scope derived from the store's state and dispatches the
//! resulting action descriptor. Store commits are written into that same
//! scope, so anything holding the scope sees the latest state.
//!
//! # Lifecycle
//!
//! ```text
//!            bind(outer)                    unbind()
//! Unbound ───────────────▶ Bound ──────────────────▶ Unbound
//!    ▲  │ (no-op if bound)   │ (no-op if unbound)       │
//!    └──┘                    └──── events / commits ────┘
//! ```
//!
//! `bind`: expression setup against `outer`, derive the state scope,
//! register the event listener, subscribe to the store.
//! `unbind`: mark unbound, expression teardown against the derived scope,
//! drop the scope, remove the listener, unsubscribe.
//!
//! # Invariants
//!
//! 1. A derived scope exists iff the binding is bound.
//! 2. While bound there is exactly one listener registration and one store
//!    subscription; while unbound there are none.
//! 3. The derived scope is created once per `bind` and mutated in place on
//!    every commit (no diffing, no reallocation).
//! 4. The current event is visible under the configured key only while the
//!    expression evaluates, on every exit path.
//! 5. Every callback entry point checks the bound flag first; callbacks that
//!    arrive after `unbind` have no effect.
//!
//! # Failure Modes
//!
//! | Failure | Where | Effect |
//! |---------|-------|--------|
//! | Expression setup fails | `bind` | `BindingError::Setup`, nothing registered |
//! | Expression teardown fails | `unbind` | `BindingError::Teardown`, binding fully unbound |
//! | Evaluation fails | event | `BindingError::Evaluate`, no dispatch, stays bound |
//! | Value is not an action | event | `BindingError::InvalidDispatchValue`, no dispatch, stays bound |
//! | Store rejects the action | store | reported on the discarded `Completion` only |
//!
//! Dispatch is fire-and-forget: the returned completion is dropped and the
//! binding never waits for the store to commit.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use statelink_core::{
    CallLimiter, EvalError, EvaluationHost, Event, EventListener, EventTarget, ExpressionEvaluator,
    ListenerError, ObjectRef, Resources, Scope, Store, StoreSubscriber,
};

use crate::action::DispatchResult;
use crate::config::BindingOptions;
use crate::error::{BindingError, ConfigError};
use crate::state_scope::create_state_binding_scope;

/// Shared state behind a [`StateDispatchBinding`].
///
/// This is the object registered with the event target and the store, and
/// the evaluation host passed to the evaluator.
struct DispatchCore<E: ExpressionEvaluator> {
    evaluator: E,
    expr: E::Expr,
    target: Rc<dyn EventTarget>,
    event_name: String,
    store: Rc<dyn Store>,
    resources: Resources,
    options: BindingOptions,
    is_bound: Cell<bool>,
    scope: RefCell<Option<Rc<Scope>>>,
    limiter: RefCell<Option<Rc<dyn CallLimiter>>>,
}

impl<E: ExpressionEvaluator> DispatchCore<E> {
    fn call_source(&self, event: &Event) -> Result<(), BindingError> {
        if !self.is_bound.get() {
            tracing::trace!(
                target: "statelink::binding",
                event = event.kind(),
                "event ignored: binding is unbound"
            );
            return Ok(());
        }

        let limiter = self.limiter.borrow().clone();
        if let Some(limiter) = limiter
            && !limiter.admit()
        {
            tracing::trace!(
                target: "statelink::binding",
                event = event.kind(),
                serial = event.serial(),
                "event dropped by limiter"
            );
            return Ok(());
        }

        let Some(scope) = self.scope.borrow().clone() else {
            return Ok(());
        };

        let value = {
            let _event = scope
                .override_context()
                .inject(self.options.event_key.as_str(), event.to_value());
            self.evaluator
                .evaluate(&self.expr, &scope, self, self.options.eval_flags())?
        };

        let DispatchResult::Valid(action) = DispatchResult::decode(value) else {
            return Err(BindingError::InvalidDispatchValue {
                target: self.target.describe(),
                event_type: event.kind().to_owned(),
            });
        };

        tracing::debug!(
            target: "statelink::binding",
            action = %action.kind,
            params = action.params.len(),
            event = event.kind(),
            "dispatching action"
        );
        // Not awaited; the store reports its own failures on the completion.
        let _completion = self.store.dispatch(&action.kind, action.params);
        Ok(())
    }

    fn apply_state(&self, state: &ObjectRef) {
        if !self.is_bound.get() {
            tracing::trace!(
                target: "statelink::binding",
                "state change ignored: binding is unbound"
            );
            return;
        }
        let scope = self.scope.borrow().clone();
        if let Some(scope) = scope {
            scope.replace_binding_context(state.clone());
            scope
                .override_context()
                .replace_binding_context(state.clone());
            tracing::trace!(
                target: "statelink::binding",
                event = %self.event_name,
                "state applied to scope"
            );
        }
    }
}

impl<E: ExpressionEvaluator> EventListener for DispatchCore<E> {
    fn handle_event(&self, event: &Event) -> Result<(), ListenerError> {
        self.call_source(event).map_err(Into::into)
    }
}

impl<E: ExpressionEvaluator> StoreSubscriber for DispatchCore<E> {
    fn handle_state_change(&self, state: &ObjectRef) {
        self.apply_state(state);
    }
}

impl<E: ExpressionEvaluator> EvaluationHost for DispatchCore<E> {
    fn resources(&self) -> &Resources {
        &self.resources
    }

    fn limit(&self, limiter: Rc<dyn CallLimiter>) -> Result<(), EvalError> {
        let mut slot = self.limiter.borrow_mut();
        if slot.is_some() {
            return Err(EvalError::AlreadyLimited);
        }
        *slot = Some(limiter);
        Ok(())
    }

    fn unlimit(&self) {
        self.limiter.borrow_mut().take();
    }
}

/// Binds one event on one target to store dispatch.
///
/// Dropping a bound binding unbinds it.
pub struct StateDispatchBinding<E>
where
    E: ExpressionEvaluator + 'static,
    E::Expr: 'static,
{
    core: Rc<DispatchCore<E>>,
}

impl<E> StateDispatchBinding<E>
where
    E: ExpressionEvaluator + 'static,
    E::Expr: 'static,
{
    /// Binding with default options and no resources.
    pub fn new(
        evaluator: E,
        expr: E::Expr,
        target: Rc<dyn EventTarget>,
        event_name: impl Into<String>,
        store: Rc<dyn Store>,
    ) -> Self {
        Self::from_parts(
            evaluator,
            expr,
            target,
            event_name.into(),
            store,
            Resources::new(),
            BindingOptions::default(),
        )
    }

    /// Start a builder for a binding with resources or custom options.
    pub fn builder(
        evaluator: E,
        expr: E::Expr,
        target: Rc<dyn EventTarget>,
        event_name: impl Into<String>,
        store: Rc<dyn Store>,
    ) -> DispatchBindingBuilder<E> {
        DispatchBindingBuilder {
            evaluator,
            expr,
            target,
            event_name: event_name.into(),
            store,
            resources: Resources::new(),
            options: BindingOptions::default(),
        }
    }

    fn from_parts(
        evaluator: E,
        expr: E::Expr,
        target: Rc<dyn EventTarget>,
        event_name: String,
        store: Rc<dyn Store>,
        resources: Resources,
        options: BindingOptions,
    ) -> Self {
        Self {
            core: Rc::new(DispatchCore {
                evaluator,
                expr,
                target,
                event_name,
                store,
                resources,
                options,
                is_bound: Cell::new(false),
                scope: RefCell::new(None),
                limiter: RefCell::new(None),
            }),
        }
    }

    /// Attach to the live view under `outer`. No-op when already bound.
    ///
    /// # Errors
    ///
    /// [`BindingError::Setup`] if expression setup fails; in that case no
    /// listener or subscription is registered and the binding stays unbound.
    pub fn bind(&self, outer: &Scope) -> Result<(), BindingError> {
        let core = &self.core;
        if core.is_bound.get() {
            tracing::trace!(
                target: "statelink::binding",
                event = %core.event_name,
                "bind ignored: already bound"
            );
            return Ok(());
        }

        if let Err(err) = core.evaluator.bind(&core.expr, outer, &**core) {
            core.limiter.borrow_mut().take();
            return Err(BindingError::Setup(err));
        }

        let scope = create_state_binding_scope(core.store.get_state(), outer);
        core.scope.replace(Some(scope));
        core.target
            .add_event_listener(&core.event_name, self.as_listener());
        core.store.subscribe(self.as_subscriber());
        core.is_bound.set(true);

        tracing::debug!(
            target: "statelink::binding",
            event = %core.event_name,
            target_element = %core.target.describe(),
            "bound"
        );
        Ok(())
    }

    /// Detach from the view. No-op when already unbound.
    ///
    /// # Errors
    ///
    /// [`BindingError::Teardown`] if expression teardown fails. The listener
    /// and subscription are removed regardless.
    pub fn unbind(&self) -> Result<(), BindingError> {
        let core = &self.core;
        if !core.is_bound.get() {
            return Ok(());
        }
        core.is_bound.set(false);

        let scope = core.scope.borrow_mut().take();
        let teardown = match &scope {
            Some(scope) => core.evaluator.unbind(&core.expr, scope, &**core),
            None => Ok(()),
        };
        drop(scope);
        core.limiter.borrow_mut().take();

        core.target
            .remove_event_listener(&core.event_name, &self.as_listener());
        core.store.unsubscribe(&self.as_subscriber());

        tracing::debug!(
            target: "statelink::binding",
            event = %core.event_name,
            target_element = %core.target.describe(),
            "unbound"
        );
        teardown.map_err(BindingError::Teardown)
    }

    /// Handle an event occurrence as the registered listener would.
    ///
    /// # Errors
    ///
    /// [`BindingError::Evaluate`] when the expression fails and
    /// [`BindingError::InvalidDispatchValue`] when it yields no action.
    pub fn call_source(&self, event: &Event) -> Result<(), BindingError> {
        self.core.call_source(event)
    }

    /// Apply a committed store state, as the store subscription would.
    pub fn handle_state_change(&self, state: &ObjectRef) {
        self.core.apply_state(state);
    }

    /// Whether the binding is attached.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.core.is_bound.get()
    }

    /// The derived scope while bound.
    #[must_use]
    pub fn scope(&self) -> Option<Rc<Scope>> {
        self.core.scope.borrow().clone()
    }

    /// Event name this binding listens for.
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.core.event_name
    }

    /// Options the binding was built with.
    #[must_use]
    pub fn options(&self) -> &BindingOptions {
        &self.core.options
    }

    /// Whether a call limiter is currently installed.
    #[must_use]
    pub fn is_limited(&self) -> bool {
        self.core.limiter.borrow().is_some()
    }

    fn as_listener(&self) -> Rc<dyn EventListener> {
        self.core.clone()
    }

    fn as_subscriber(&self) -> Rc<dyn StoreSubscriber> {
        self.core.clone()
    }
}

impl<E> Drop for StateDispatchBinding<E>
where
    E: ExpressionEvaluator + 'static,
    E::Expr: 'static,
{
    fn drop(&mut self) {
        if let Err(err) = self.unbind() {
            tracing::warn!(target: "statelink::binding", error = %err, "unbind on drop failed");
        }
    }
}

impl<E> fmt::Debug for StateDispatchBinding<E>
where
    E: ExpressionEvaluator + 'static,
    E::Expr: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateDispatchBinding")
            .field("target", &self.core.target.describe())
            .field("event_name", &self.core.event_name)
            .field("is_bound", &self.core.is_bound.get())
            .field("is_limited", &self.is_limited())
            .finish()
    }
}

/// Builder for [`StateDispatchBinding`].
pub struct DispatchBindingBuilder<E>
where
    E: ExpressionEvaluator + 'static,
    E::Expr: 'static,
{
    evaluator: E,
    expr: E::Expr,
    target: Rc<dyn EventTarget>,
    event_name: String,
    store: Rc<dyn Store>,
    resources: Resources,
    options: BindingOptions,
}

impl<E> DispatchBindingBuilder<E>
where
    E: ExpressionEvaluator + 'static,
    E::Expr: 'static,
{
    /// Resources visible to the expression.
    #[must_use]
    pub fn resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    /// Binding options.
    #[must_use]
    pub fn options(mut self, options: BindingOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate options and build the (unbound) binding.
    ///
    /// # Errors
    ///
    /// Option validation failures.
    pub fn build(self) -> Result<StateDispatchBinding<E>, ConfigError> {
        self.options.validate()?;
        Ok(StateDispatchBinding::from_parts(
            self.evaluator,
            self.expr,
            self.target,
            self.event_name,
            self.store,
            self.resources,
            self.options,
        ))
    }
}
