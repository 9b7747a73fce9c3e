//! Compile expression trees into closures for local evaluation.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::Expr;
use crate::errors::{Result, eval_error};
use crate::value::ScalarValue;

type EvalFn = Box<dyn Fn(&[&ScalarValue]) -> Result<ScalarValue> + Send + Sync>;

/// An expression compiled against a fixed number of arguments.
pub struct CompiledExpr {
    arity: usize,
    eval: EvalFn,
}

impl CompiledExpr {
    /// Compile `expr` into a callable taking `arity` arguments.
    ///
    /// Errors if the expression references an argument outside of the
    /// arity.
    pub fn compile(expr: &Expr, arity: usize) -> Result<Self> {
        Ok(CompiledExpr {
            arity,
            eval: compile_inner(expr, arity)?,
        })
    }

    pub fn eval(&self, args: &[&ScalarValue]) -> Result<ScalarValue> {
        if args.len() != self.arity {
            return Err(eval_error!(
                "Expression expects {} arguments, got {}",
                self.arity,
                args.len()
            ));
        }
        (self.eval)(args)
    }

    /// Evaluate as a predicate. Nulls are falsy.
    pub fn eval_predicate(&self, args: &[&ScalarValue]) -> Result<bool> {
        let value = self.eval(args)?;
        if value.is_null() {
            return Ok(false);
        }
        value.try_as_bool()
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

fn compile_inner(expr: &Expr, arity: usize) -> Result<EvalFn> {
    // Member chains over an argument are resolved by reference, only the
    // final value is cloned.
    if let Some((idx, path)) = expr.member_path() {
        if idx >= arity {
            return Err(eval_error!(
                "Expression references argument {idx}, but only {arity} are available"
            ));
        }
        let path: Vec<String> = path.into_iter().map(|s| s.to_string()).collect();
        return Ok(Box::new(move |args: &[&ScalarValue]| {
            let mut value = args[idx];
            for name in &path {
                value = value.member(name)?;
            }
            Ok(value.clone())
        }));
    }

    let f: EvalFn = match expr {
        Expr::Constant(value) => {
            let value = value.clone();
            Box::new(move |_: &[&ScalarValue]| Ok(value.clone()))
        }
        Expr::Member(member) => {
            let base = compile_inner(&member.base, arity)?;
            let name = member.name.clone();
            Box::new(move |args: &[&ScalarValue]| Ok(base(args)?.member(&name)?.clone()))
        }
        Expr::Binary(binary) => {
            let op = binary.op;
            let left = compile_inner(&binary.left, arity)?;
            let right = compile_inner(&binary.right, arity)?;
            Box::new(move |args: &[&ScalarValue]| {
                let left = left(args)?;
                let right = right(args)?;
                op.eval(&left, &right)
            })
        }
        Expr::Tuple(exprs) => {
            let fields = exprs
                .iter()
                .map(|expr| compile_inner(expr, arity))
                .collect::<Result<Vec<_>>>()?;
            Box::new(move |args: &[&ScalarValue]| {
                let values = fields
                    .iter()
                    .map(|f| f(args))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ScalarValue::Tuple(values))
            })
        }
        Expr::Variable(_) => unreachable!("variables handled as member paths"),
    };

    Ok(f)
}

/// An expression that's compiled on first use.
///
/// Compilation happens at most once even with concurrent callers, the
/// compiled form is then shared by every enumeration of the owning operator.
#[derive(Debug)]
pub struct LazyExpr {
    expr: Expr,
    arity: usize,
    compiled: OnceCell<Arc<CompiledExpr>>,
}

impl LazyExpr {
    pub fn new(expr: Expr, arity: usize) -> Self {
        LazyExpr {
            expr,
            arity,
            compiled: OnceCell::new(),
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<CompiledExpr>> {
        self.compiled
            .get_or_try_init(|| CompiledExpr::compile(&self.expr, self.arity).map(Arc::new))
            .cloned()
    }
}
