#![forbid(unsafe_code)]

//! Expression evaluation contracts.
//!
//! An [`ExpressionEvaluator`] evaluates prebuilt expressions against a
//! [`Scope`] on behalf of an [`EvaluationHost`]. The host is the binding that
//! owns the expression: it exposes named [`Resources`] (value converters and
//! binding behaviors) and, when it supports it, accepts a [`CallLimiter`]
//! that gates its event entry point.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use bitflags::bitflags;

use crate::error::EvalError;
use crate::scope::Scope;
use crate::value::Value;

bitflags! {
    /// Evaluation mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EvalFlags: u8 {
        /// Unresolvable identifiers and member access on non-objects are
        /// errors instead of evaluating to `null`.
        const STRICT = 1 << 0;
    }
}

/// Evaluates expressions of type [`Self::Expr`].
pub trait ExpressionEvaluator {
    /// Expression representation.
    type Expr;

    /// One-time setup for stateful expression nodes.
    ///
    /// # Errors
    ///
    /// Fails when a node cannot be set up (e.g. an unregistered behavior).
    fn bind(
        &self,
        expr: &Self::Expr,
        scope: &Scope,
        host: &dyn EvaluationHost,
    ) -> Result<(), EvalError>;

    /// Teardown matching [`bind`](Self::bind).
    ///
    /// # Errors
    ///
    /// Fails when a node's teardown fails.
    fn unbind(
        &self,
        expr: &Self::Expr,
        scope: &Scope,
        host: &dyn EvaluationHost,
    ) -> Result<(), EvalError>;

    /// Compute the expression's value.
    ///
    /// # Errors
    ///
    /// Fails on unresolved resources, type errors, or strict-mode lookups.
    fn evaluate(
        &self,
        expr: &Self::Expr,
        scope: &Scope,
        host: &dyn EvaluationHost,
        flags: EvalFlags,
    ) -> Result<Value, EvalError>;
}

/// Gate for a host's rate-limitable entry point.
pub trait CallLimiter {
    /// Whether the call arriving now may proceed.
    fn admit(&self) -> bool;
}

/// The owner of an expression during evaluation.
pub trait EvaluationHost {
    /// Named resources visible to the expression.
    fn resources(&self) -> &Resources;

    /// Install a limiter on the host's entry point.
    ///
    /// # Errors
    ///
    /// [`EvalError::NotLimitable`] by default; limitable hosts return
    /// [`EvalError::AlreadyLimited`] when a limiter is already present.
    fn limit(&self, limiter: Rc<dyn CallLimiter>) -> Result<(), EvalError> {
        let _ = limiter;
        Err(EvalError::NotLimitable)
    }

    /// Remove an installed limiter, if any.
    fn unlimit(&self) {}
}

/// Transforms a value on its way from the model to the expression result.
pub trait ValueConverter {
    /// Convert `value`, given the converter's evaluated arguments.
    fn to_view(&self, value: Value, args: &[Value]) -> Value;
}

impl<F> ValueConverter for F
where
    F: Fn(Value, &[Value]) -> Value,
{
    fn to_view(&self, value: Value, args: &[Value]) -> Value {
        self(value, args)
    }
}

/// Stateful expression node that hooks into the host's lifecycle.
pub trait BindingBehavior {
    /// Called once when the owning expression is bound.
    ///
    /// # Errors
    ///
    /// Setup failures abort the owning binding's `bind`.
    fn bind(&self, scope: &Scope, host: &dyn EvaluationHost, args: &[Value])
    -> Result<(), EvalError>;

    /// Called once when the owning expression is unbound.
    ///
    /// # Errors
    ///
    /// Teardown failures are reported to the owning binding's `unbind`.
    fn unbind(&self, scope: &Scope, host: &dyn EvaluationHost) -> Result<(), EvalError> {
        let _ = (scope, host);
        Ok(())
    }
}

/// Registry of named value converters and binding behaviors.
///
/// Cheap to clone; entries are shared.
#[derive(Clone, Default)]
pub struct Resources {
    converters: AHashMap<String, Rc<dyn ValueConverter>>,
    behaviors: AHashMap<String, Rc<dyn BindingBehavior>>,
}

impl Resources {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value converter under `name`.
    #[must_use]
    pub fn with_converter(
        mut self,
        name: impl Into<String>,
        converter: impl ValueConverter + 'static,
    ) -> Self {
        self.converters.insert(name.into(), Rc::new(converter));
        self
    }

    /// Register a binding behavior under `name`.
    #[must_use]
    pub fn with_behavior(
        mut self,
        name: impl Into<String>,
        behavior: impl BindingBehavior + 'static,
    ) -> Self {
        self.behaviors.insert(name.into(), Rc::new(behavior));
        self
    }

    /// Look up a value converter.
    #[must_use]
    pub fn converter(&self, name: &str) -> Option<Rc<dyn ValueConverter>> {
        self.converters.get(name).cloned()
    }

    /// Look up a binding behavior.
    #[must_use]
    pub fn behavior(&self, name: &str) -> Option<Rc<dyn BindingBehavior>> {
        self.behaviors.get(name).cloned()
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut converters: Vec<_> = self.converters.keys().collect();
        let mut behaviors: Vec<_> = self.behaviors.keys().collect();
        converters.sort();
        behaviors.sort();
        f.debug_struct("Resources")
            .field("converters", &converters)
            .field("behaviors", &behaviors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Bare(Resources);

    impl EvaluationHost for Bare {
        fn resources(&self) -> &Resources {
            &self.0
        }
    }

    struct Nop;

    impl BindingBehavior for Nop {
        fn bind(&self, _: &Scope, _: &dyn EvaluationHost, _: &[Value]) -> Result<(), EvalError> {
            Ok(())
        }
    }

    struct Always;

    impl CallLimiter for Always {
        fn admit(&self) -> bool {
            true
        }
    }

    #[test]
    fn closures_are_converters() {
        let res = Resources::new().with_converter("upper", |v: Value, _: &[Value]| {
            json!(v.as_str().unwrap_or_default().to_uppercase())
        });
        let upper = res.converter("upper").unwrap();
        assert_eq!(upper.to_view(json!("abc"), &[]), json!("ABC"));
        assert!(res.converter("lower").is_none());
    }

    #[test]
    fn behaviors_are_looked_up_by_name() {
        let res = Resources::new().with_behavior("nop", Nop);
        assert!(res.behavior("nop").is_some());
        assert!(res.behavior("throttle").is_none());
        assert!(format!("{res:?}").contains("nop"));
    }

    #[test]
    fn hosts_are_not_limitable_by_default() {
        let host = Bare(Resources::new());
        assert_eq!(host.limit(Rc::new(Always)), Err(EvalError::NotLimitable));
        host.unlimit();
    }

    #[test]
    fn strict_flag() {
        assert!(!EvalFlags::default().contains(EvalFlags::STRICT));
        assert!(EvalFlags::STRICT.contains(EvalFlags::STRICT));
    }
}
