#![forbid(unsafe_code)]

//! Expression tree.

use statelink_core::Value;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Numeric addition, or concatenation when either side is a string.
    Add,
    /// Numeric subtraction.
    Sub,
    /// Numeric multiplication.
    Mul,
    /// Structural equality.
    Eq,
    /// Structural inequality.
    Ne,
}

impl BinaryOp {
    /// Source symbol, used in diagnostics.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// A binding expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value.
    Literal(Value),
    /// Name resolved through the scope chain.
    Identifier(String),
    /// The scope's binding context as an object value.
    This,
    /// `object.name`
    Member { object: Box<Expr>, name: String },
    /// `object[key]`
    Keyed { object: Box<Expr>, key: Box<Expr> },
    /// `{ key: expr, ... }`
    Object(Vec<(String, Expr)>),
    /// `[expr, ...]`
    Array(Vec<Expr>),
    /// `target = value`; evaluates to the assigned value.
    Assign { target: String, value: Box<Expr> },
    /// `left op right`
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `expr | name:arg...`
    ValueConverter {
        expr: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    /// `expr & name:arg...`
    BindingBehavior {
        expr: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Literal value.
    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Scope lookup of `name`.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    /// `$this`
    #[must_use]
    pub const fn this() -> Self {
        Self::This
    }

    /// Object literal.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Array literal.
    pub fn array(items: impl IntoIterator<Item = Expr>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    /// Assignment to `target`.
    pub fn assign(target: impl Into<String>, value: Expr) -> Self {
        Self::Assign {
            target: target.into(),
            value: Box::new(value),
        }
    }

    /// Binary operation.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `self.name`
    #[must_use]
    pub fn member(self, name: impl Into<String>) -> Self {
        Self::Member {
            object: Box::new(self),
            name: name.into(),
        }
    }

    /// `self[key]`
    #[must_use]
    pub fn keyed(self, key: Expr) -> Self {
        Self::Keyed {
            object: Box::new(self),
            key: Box::new(key),
        }
    }

    /// `self | name:args`
    #[must_use]
    pub fn convert(self, name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::ValueConverter {
            expr: Box::new(self),
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// `self & name:args`
    #[must_use]
    pub fn behavior(self, name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::BindingBehavior {
            expr: Box::new(self),
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }
}
