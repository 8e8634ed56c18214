#![forbid(unsafe_code)]

//! Reference evaluator for statelink binding expressions.
//!
//! Expressions arrive prebuilt as an [`Expr`] tree; there is no parser here.
//! [`AstEvaluator`] implements
//! [`ExpressionEvaluator`](statelink_core::ExpressionEvaluator) over that
//! tree, resolving identifiers through the scope chain and looking up value
//! converters and binding behaviors on the evaluation host.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use statelink_core::{EvalFlags, ExpressionEvaluator, ObjectRef, Resources, Scope};
//! use statelink_core::EvaluationHost;
//! use statelink_expr::{AstEvaluator, Expr};
//!
//! struct Host(Resources);
//! impl EvaluationHost for Host {
//!     fn resources(&self) -> &Resources {
//!         &self.0
//!     }
//! }
//!
//! let scope = Scope::new(ObjectRef::from_value(json!({"count": 2})).unwrap());
//! let expr = Expr::object([
//!     ("type", Expr::lit("add")),
//!     ("params", Expr::array([Expr::ident("count")])),
//! ]);
//! let value = AstEvaluator
//!     .evaluate(&expr, &scope, &Host(Resources::new()), EvalFlags::empty())
//!     .unwrap();
//! assert_eq!(value, json!({"type": "add", "params": [2]}));
//! ```

pub mod ast;
pub mod eval;

pub use ast::{BinaryOp, Expr};
pub use eval::AstEvaluator;
