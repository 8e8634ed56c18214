#![forbid(unsafe_code)]

//! Tree-walking evaluator.
//!
//! # Semantics
//!
//! - Identifiers resolve through [`Scope::lookup`]. Missing names evaluate to
//!   `null`, or fail with [`EvalError::UnknownIdentifier`] under
//!   [`EvalFlags::STRICT`].
//! - Member and keyed access on objects/arrays return the stored value or
//!   `null`. On other values they evaluate to `null`, or fail with
//!   [`EvalError::NotAnObject`] under strict evaluation.
//! - `+` adds numbers (integer arithmetic when both sides are integers and
//!   the result fits) and concatenates when either side is a string.
//! - Binding behaviors are transparent during evaluation; their work happens
//!   in `bind`/`unbind`.

use serde_json::{Map, Number};
use statelink_core::{EvalError, EvalFlags, EvaluationHost, ExpressionEvaluator, Scope, Value};

use crate::ast::{BinaryOp, Expr};

/// Stateless evaluator for [`Expr`] trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct AstEvaluator;

impl ExpressionEvaluator for AstEvaluator {
    type Expr = Expr;

    fn bind(&self, expr: &Expr, scope: &Scope, host: &dyn EvaluationHost) -> Result<(), EvalError> {
        match expr {
            Expr::BindingBehavior { expr, name, args } => {
                let behavior = host
                    .resources()
                    .behavior(name)
                    .ok_or_else(|| EvalError::BehaviorNotFound(name.clone()))?;
                let args = self.evaluate_all(args, scope, host, EvalFlags::empty())?;
                tracing::trace!(target: "statelink::expr", behavior = %name, "binding behavior");
                behavior.bind(scope, host, &args)?;
                if let Err(err) = self.bind(expr, scope, host) {
                    // Roll back so a failed bind leaves no behavior set up.
                    if let Err(rollback) = behavior.unbind(scope, host) {
                        tracing::warn!(
                            target: "statelink::expr",
                            behavior = %name,
                            error = %rollback,
                            "rollback after failed bind also failed"
                        );
                    }
                    return Err(err);
                }
                Ok(())
            }
            Expr::ValueConverter { expr, .. } => self.bind(expr, scope, host),
            _ => Ok(()),
        }
    }

    fn unbind(
        &self,
        expr: &Expr,
        scope: &Scope,
        host: &dyn EvaluationHost,
    ) -> Result<(), EvalError> {
        match expr {
            Expr::BindingBehavior { expr, name, .. } => {
                let behavior = host
                    .resources()
                    .behavior(name)
                    .ok_or_else(|| EvalError::BehaviorNotFound(name.clone()))?;
                tracing::trace!(target: "statelink::expr", behavior = %name, "unbinding behavior");
                behavior.unbind(scope, host)?;
                self.unbind(expr, scope, host)
            }
            Expr::ValueConverter { expr, .. } => self.unbind(expr, scope, host),
            _ => Ok(()),
        }
    }

    fn evaluate(
        &self,
        expr: &Expr,
        scope: &Scope,
        host: &dyn EvaluationHost,
        flags: EvalFlags,
    ) -> Result<Value, EvalError> {
        let strict = flags.contains(EvalFlags::STRICT);
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Identifier(name) => match scope.lookup(name) {
                Some(value) => Ok(value),
                None if strict => Err(EvalError::UnknownIdentifier(name.clone())),
                None => Ok(Value::Null),
            },
            Expr::This => Ok(scope.binding_context().snapshot()),
            Expr::Member { object, name } => {
                let object = self.evaluate(object, scope, host, flags)?;
                read_member(&object, name, strict)
            }
            Expr::Keyed { object, key } => {
                let object = self.evaluate(object, scope, host, flags)?;
                let key = self.evaluate(key, scope, host, flags)?;
                read_keyed(&object, &key, strict)
            }
            Expr::Object(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), self.evaluate(value, scope, host, flags)?);
                }
                Ok(Value::Object(map))
            }
            Expr::Array(items) => Ok(Value::Array(
                self.evaluate_all(items, scope, host, flags)?,
            )),
            Expr::Assign { target, value } => {
                let value = self.evaluate(value, scope, host, flags)?;
                scope.assign(target, value.clone());
                Ok(value)
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left, scope, host, flags)?;
                let right = self.evaluate(right, scope, host, flags)?;
                apply_binary(*op, &left, &right)
            }
            Expr::ValueConverter { expr, name, args } => {
                let converter = host
                    .resources()
                    .converter(name)
                    .ok_or_else(|| EvalError::ConverterNotFound(name.clone()))?;
                let value = self.evaluate(expr, scope, host, flags)?;
                let args = self.evaluate_all(args, scope, host, flags)?;
                Ok(converter.to_view(value, &args))
            }
            Expr::BindingBehavior { expr, .. } => self.evaluate(expr, scope, host, flags),
        }
    }
}

impl AstEvaluator {
    fn evaluate_all(
        &self,
        exprs: &[Expr],
        scope: &Scope,
        host: &dyn EvaluationHost,
        flags: EvalFlags,
    ) -> Result<Vec<Value>, EvalError> {
        exprs
            .iter()
            .map(|e| self.evaluate(e, scope, host, flags))
            .collect()
    }
}

fn read_member(object: &Value, name: &str, strict: bool) -> Result<Value, EvalError> {
    match object {
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        _ if strict => Err(EvalError::NotAnObject {
            member: name.to_owned(),
        }),
        _ => Ok(Value::Null),
    }
}

fn read_keyed(object: &Value, key: &Value, strict: bool) -> Result<Value, EvalError> {
    match (object, key) {
        (Value::Object(map), Value::String(k)) => Ok(map.get(k).cloned().unwrap_or(Value::Null)),
        (Value::Array(items), Value::Number(n)) => Ok(n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::Object(_) | Value::Array(_), _) => Ok(Value::Null),
        _ if strict => Err(EvalError::NotAnObject {
            member: display(key),
        }),
        _ => Ok(Value::Null),
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinaryOp::Eq, l, r) => Ok(Value::Bool(l == r)),
        (BinaryOp::Ne, l, r) => Ok(Value::Bool(l != r)),
        (_, Value::Number(a), Value::Number(b)) => Ok(arithmetic(op, a, b)),
        (BinaryOp::Add, Value::String(_), _) | (BinaryOp::Add, _, Value::String(_)) => {
            Ok(Value::String(format!("{}{}", display(left), display(right))))
        }
        _ => Err(EvalError::TypeMismatch {
            op: op.symbol(),
            left: type_name(left),
            right: type_name(right),
        }),
    }
}

fn arithmetic(op: BinaryOp, a: &Number, b: &Number) -> Value {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let exact = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::Eq | BinaryOp::Ne => None,
        };
        if let Some(result) = exact {
            return Value::from(result);
        }
    }
    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Eq | BinaryOp::Ne => f64::NAN,
    };
    Number::from_f64(result).map_or(Value::Null, Value::Number)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
