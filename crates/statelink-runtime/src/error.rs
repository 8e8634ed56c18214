#![forbid(unsafe_code)]

//! Errors surfaced by state-dispatch bindings.

use statelink_core::EvalError;
use thiserror::Error;

/// Failures raised synchronously to the caller of a binding operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// The event expression did not evaluate to an action descriptor.
    #[error("Invalid dispatch value from expression on {target} on event: \"{event_type}\"")]
    InvalidDispatchValue { target: String, event_type: String },
    /// Expression setup failed during `bind`; nothing was registered.
    #[error("expression setup failed: {0}")]
    Setup(#[source] EvalError),
    /// Expression teardown failed during `unbind`; the binding is unbound.
    #[error("expression teardown failed: {0}")]
    Teardown(#[source] EvalError),
    /// Evaluating the event expression failed.
    #[error("expression evaluation failed: {0}")]
    Evaluate(#[from] EvalError),
}

/// Invalid binding options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The transient event key must name something.
    #[error("event key must not be empty")]
    EmptyEventKey,
    /// A TOML document could not be parsed.
    #[cfg(feature = "policy-config")]
    #[error("invalid TOML binding options: {0}")]
    Toml(#[from] toml::de::Error),
    /// A JSON document could not be parsed.
    #[cfg(feature = "policy-config")]
    #[error("invalid JSON binding options: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dispatch_value_names_target_and_event() {
        let err = BindingError::InvalidDispatchValue {
            target: "<button#inc>".into(),
            event_type: "click".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid dispatch value from expression on <button#inc> on event: \"click\""
        );
    }

    #[test]
    fn eval_errors_convert_to_evaluate() {
        let err: BindingError = EvalError::UnknownIdentifier("x".into()).into();
        assert!(matches!(err, BindingError::Evaluate(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
