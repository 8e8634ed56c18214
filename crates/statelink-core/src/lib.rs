#![forbid(unsafe_code)]

//! Core contracts for statelink state bindings.
//!
//! This crate holds the pieces every binding kind shares:
//!
//! - [`value`]: the JSON object model ([`ObjectRef`]) used for state objects
//!   and binding contexts.
//! - [`scope`]: the lexical [`Scope`] chain with override contexts and
//!   scoped transient injection.
//! - [`event`]: event targets, listeners and the concrete [`Element`].
//! - [`store`]: the [`Store`] / [`StoreSubscriber`] contracts and the
//!   fire-and-forget [`Completion`] handle.
//! - [`host`]: the expression evaluator / evaluation host contracts and the
//!   named resource registry.
//!
//! Everything here is single-threaded: shared handles are `Rc`-based and
//! callbacks run on the caller's thread.

pub mod error;
pub mod event;
pub mod host;
pub mod scope;
pub mod store;
pub mod value;

pub use error::{DispatchError, EvalError};
pub use event::{Element, Event, EventListener, EventTarget, ListenerError};
pub use host::{
    BindingBehavior, CallLimiter, EvalFlags, EvaluationHost, ExpressionEvaluator, Resources,
    ValueConverter,
};
pub use scope::{OverrideContext, Scope, TransientLocal};
pub use store::{Completion, Store, StoreSubscriber};
pub use value::{ObjectRef, Value};
