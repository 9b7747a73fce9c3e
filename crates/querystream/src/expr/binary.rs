use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, eval_error};
use crate::value::ScalarValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Ge | Self::Gt
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// Apply the operator to two already evaluated operands.
    pub fn eval(&self, left: &ScalarValue, right: &ScalarValue) -> Result<ScalarValue> {
        if self.is_logical() {
            return eval_logical(*self, left, right);
        }

        // Nulls propagate through comparisons and arithmetic.
        if left.is_null() || right.is_null() {
            return Ok(ScalarValue::Null);
        }

        if self.is_comparison() {
            let ord = compare(left, right).ok_or_else(|| {
                eval_error!(
                    "Cannot compare {} with {}",
                    left.datatype(),
                    right.datatype()
                )
            })?;
            let result = match self {
                Self::Eq => ord == Ordering::Equal,
                Self::Ne => ord != Ordering::Equal,
                Self::Lt => ord == Ordering::Less,
                Self::Le => ord != Ordering::Greater,
                Self::Ge => ord != Ordering::Less,
                Self::Gt => ord == Ordering::Greater,
                _ => unreachable!("checked is_comparison"),
            };
            return Ok(ScalarValue::Boolean(result));
        }

        eval_arith(*self, left, right)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Ge => write!(f, ">="),
            Self::Gt => write!(f, ">"),
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Mul => write!(f, "*"),
            Self::Div => write!(f, "/"),
            Self::Mod => write!(f, "%"),
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

fn compare(left: &ScalarValue, right: &ScalarValue) -> Option<Ordering> {
    match (left, right) {
        (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => Some(a.cmp(b)),
        (ScalarValue::Int64(a), ScalarValue::Int64(b)) => Some(a.cmp(b)),
        (ScalarValue::Float64(a), ScalarValue::Float64(b)) => a.partial_cmp(b),
        (ScalarValue::Int64(a), ScalarValue::Float64(b)) => (*a as f64).partial_cmp(b),
        (ScalarValue::Float64(a), ScalarValue::Int64(b)) => a.partial_cmp(&(*b as f64)),
        (ScalarValue::Utf8(a), ScalarValue::Utf8(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Three-valued AND/OR.
fn eval_logical(
    op: BinaryOperator,
    left: &ScalarValue,
    right: &ScalarValue,
) -> Result<ScalarValue> {
    let as_tristate = |v: &ScalarValue| -> Result<Option<bool>> {
        match v {
            ScalarValue::Null => Ok(None),
            ScalarValue::Boolean(b) => Ok(Some(*b)),
            other => Err(eval_error!(
                "{op} expects Boolean operands, got {}",
                other.datatype()
            )),
        }
    };

    let left = as_tristate(left)?;
    let right = as_tristate(right)?;

    let out = match op {
        BinaryOperator::And => match (left, right) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        BinaryOperator::Or => match (left, right) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        _ => unreachable!("checked is_logical"),
    };

    Ok(out.into())
}

fn eval_arith(op: BinaryOperator, left: &ScalarValue, right: &ScalarValue) -> Result<ScalarValue> {
    match (left, right) {
        (ScalarValue::Int64(a), ScalarValue::Int64(b)) => {
            let (a, b) = (*a, *b);
            let out = match op {
                BinaryOperator::Add => a.checked_add(b),
                BinaryOperator::Sub => a.checked_sub(b),
                BinaryOperator::Mul => a.checked_mul(b),
                BinaryOperator::Div | BinaryOperator::Mod if b == 0 => {
                    return Err(eval_error!("Division by zero"));
                }
                BinaryOperator::Div => a.checked_div(b),
                BinaryOperator::Mod => a.checked_rem(b),
                other => return Err(eval_error!("{other} is not an arithmetic operator")),
            };
            out.map(ScalarValue::Int64)
                .ok_or_else(|| eval_error!("Integer overflow evaluating {a} {op} {b}"))
        }
        (ScalarValue::Float64(_) | ScalarValue::Int64(_), ScalarValue::Float64(_) | ScalarValue::Int64(_)) => {
            let a = as_f64(left);
            let b = as_f64(right);
            let out = match op {
                BinaryOperator::Add => a + b,
                BinaryOperator::Sub => a - b,
                BinaryOperator::Mul => a * b,
                BinaryOperator::Div | BinaryOperator::Mod if b == 0.0 => {
                    return Err(eval_error!("Division by zero"));
                }
                BinaryOperator::Div => a / b,
                BinaryOperator::Mod => a % b,
                other => return Err(eval_error!("{other} is not an arithmetic operator")),
            };
            Ok(ScalarValue::Float64(out))
        }
        (left, right) => Err(eval_error!(
            "Cannot apply {op} to {} and {}",
            left.datatype(),
            right.datatype()
        )),
    }
}

fn as_f64(v: &ScalarValue) -> f64 {
    match v {
        ScalarValue::Int64(i) => *i as f64,
        ScalarValue::Float64(f) => *f,
        _ => unreachable!("caller matched on numeric types"),
    }
}
