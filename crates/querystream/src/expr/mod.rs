//! Expression trees describing predicates, projections and join conditions.
//!
//! Expressions are plain data. They can be inspected (for translation into a
//! remote query language) or compiled into a callable for local evaluation,
//! see [`compiled`].

pub mod binary;
pub mod compiled;

use std::fmt;

use binary::BinaryOperator;
use serde::{Deserialize, Serialize};

use crate::value::ScalarValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A literal value.
    Constant(ScalarValue),
    /// Reference to an argument of the enclosing lambda.
    ///
    /// Filters and projections take a single argument (0). Join conditions
    /// and combiners take the outer element (0) and the inner element (1).
    Variable(usize),
    /// Named member of another expression's value.
    Member(MemberExpr),
    Binary(BinaryExpr),
    /// Positional tuple built from sub-expressions.
    Tuple(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpr {
    pub base: Box<Expr>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOperator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

/// Create a constant expression.
pub fn lit(value: impl Into<ScalarValue>) -> Expr {
    Expr::Constant(value.into())
}

/// Reference the lambda argument at `idx`.
pub fn var(idx: usize) -> Expr {
    Expr::Variable(idx)
}

/// Reference a member of the (only) argument of a filter or projection.
pub fn col(name: impl Into<String>) -> Expr {
    var(0).member(name)
}

/// Reference a member of the outer element in a join.
pub fn outer_col(name: impl Into<String>) -> Expr {
    var(0).member(name)
}

/// Reference a member of the inner element in a join.
pub fn inner_col(name: impl Into<String>) -> Expr {
    var(1).member(name)
}

pub fn tuple(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Tuple(exprs.into_iter().collect())
}

impl Expr {
    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary(BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member(MemberExpr {
            base: Box::new(self),
            name: name.into(),
        })
    }

    pub fn eq(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Eq, self, other)
    }

    pub fn ne(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Ne, self, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Lt, self, other)
    }

    pub fn lt_eq(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Le, self, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Gt, self, other)
    }

    pub fn gt_eq(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Ge, self, other)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Add, self, other)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Sub, self, other)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Mul, self, other)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn div(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Div, self, other)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn rem(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Mod, self, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::And, self, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Self::binary(BinaryOperator::Or, self, other)
    }

    /// AND together all expressions, left to right.
    ///
    /// Returns None if the iterator is empty.
    pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs.into_iter().reduce(|acc, next| acc.and(next))
    }

    /// If this is a chain of member accesses rooted at a variable, return
    /// the variable index and the member names from the root outwards.
    ///
    /// `var(0).member("a").member("b")` returns `(0, ["a", "b"])`.
    pub fn member_path(&self) -> Option<(usize, Vec<&str>)> {
        let mut path = Vec::new();
        let mut curr = self;
        loop {
            match curr {
                Expr::Member(member) => {
                    path.push(member.name.as_str());
                    curr = &member.base;
                }
                Expr::Variable(idx) => {
                    path.reverse();
                    return Some((*idx, path));
                }
                _ => return None,
            }
        }
    }

    /// Short name for the kind of node, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Constant(_) => "constant",
            Expr::Variable(_) => "variable reference",
            Expr::Member(_) => "member access",
            Expr::Binary(_) => "binary expression",
            Expr::Tuple(_) => "tuple",
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(ScalarValue::Utf8(s)) => write!(f, "'{s}'"),
            Expr::Constant(v) => write!(f, "{v}"),
            Expr::Variable(idx) => write!(f, "${idx}"),
            Expr::Member(member) => write!(f, "{}.{}", member.base, member.name),
            Expr::Binary(binary) => {
                write!(f, "({} {} {})", binary.left, binary.op, binary.right)
            }
            Expr::Tuple(exprs) => {
                write!(f, "(")?;
                for (idx, expr) in exprs.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{expr}")?;
                }
                write!(f, ")")
            }
        }
    }
}
