#![forbid(unsafe_code)]

//! Error types shared by evaluators, hosts and stores.

use thiserror::Error;

/// Errors raised while binding, unbinding or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Strict evaluation referenced a name no scope level defines.
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    /// Strict member access on a value that is not an object.
    #[error("cannot read `{member}` of a non-object value")]
    NotAnObject { member: String },
    /// A value converter named in the expression is not registered.
    #[error("value converter `{0}` is not registered")]
    ConverterNotFound(String),
    /// A binding behavior named in the expression is not registered.
    #[error("binding behavior `{0}` is not registered")]
    BehaviorNotFound(String),
    /// An operator received operands it cannot combine.
    #[error("operator `{op}` cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    /// The evaluation host does not accept call limiters.
    #[error("evaluation host does not support call limiting")]
    NotLimitable,
    /// A call limiter is already installed on the host.
    #[error("a call limiter is already installed on this binding")]
    AlreadyLimited,
}

/// Errors a store may report through a dispatch [`Completion`](crate::Completion).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No handler is registered for the action name.
    #[error("no handler registered for action `{0}`")]
    UnknownAction(String),
    /// A handler refused the action.
    #[error("action `{action}` rejected: {reason}")]
    Rejected { action: String, reason: String },
}
