//! Translate expression trees into parameterized SQL text.

use querystream::TranslationError;
use querystream::expr::Expr;
use querystream::expr::binary::BinaryOperator;
use tracing::trace;

use crate::dialect::Dialect;
use crate::parameters::ParameterBinder;

/// Translate `expr` into SQL text, defining a parameter in `binder` for
/// every constant, left to right.
pub fn translate_expr(
    expr: &Expr,
    dialect: &dyn Dialect,
    binder: &mut dyn ParameterBinder,
) -> Result<String, TranslationError> {
    ExpressionTranslator::new(dialect, binder).translate(expr)
}

/// SQL infix for an operator, None if it has no rendering.
pub fn infix_operator(op: BinaryOperator) -> Option<&'static str> {
    Some(match op {
        BinaryOperator::Eq => " = ",
        BinaryOperator::Ne => " <> ",
        BinaryOperator::Lt => " < ",
        BinaryOperator::Le => " <= ",
        BinaryOperator::Ge => " >= ",
        BinaryOperator::Gt => " > ",
        BinaryOperator::Add => " + ",
        BinaryOperator::Sub => " - ",
        BinaryOperator::Mul => " * ",
        BinaryOperator::Div => " / ",
        BinaryOperator::And => " AND ",
        BinaryOperator::Or => " OR ",
        BinaryOperator::Mod => return None,
    })
}

enum Task<'e> {
    Visit(&'e Expr),
    Combine(&'static str),
}

/// Post-order walk over an expression using explicit stacks.
///
/// Every visited node pushes a list of text fragments. Binary nodes pop the
/// fragments of both operands and push the parenthesized combination, so a
/// well formed tree leaves exactly one list behind.
///
/// Deeply nested predicates (long AND chains) don't grow the call stack.
pub struct ExpressionTranslator<'a> {
    dialect: &'a dyn Dialect,
    binder: &'a mut dyn ParameterBinder,
    fragments: Vec<Vec<String>>,
}

impl<'a> ExpressionTranslator<'a> {
    pub fn new(dialect: &'a dyn Dialect, binder: &'a mut dyn ParameterBinder) -> Self {
        ExpressionTranslator {
            dialect,
            binder,
            fragments: Vec::new(),
        }
    }

    pub fn translate(mut self, expr: &Expr) -> Result<String, TranslationError> {
        let mut tasks = vec![Task::Visit(expr)];

        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit(expr) => self.visit(expr, &mut tasks)?,
                Task::Combine(infix) => self.combine(infix)?,
            }
        }

        if self.fragments.len() != 1 {
            return Err(TranslationError::Internal(format!(
                "expected a single fragment list after translation, found {}",
                self.fragments.len()
            )));
        }

        let text = self.fragments.concat().concat();
        trace!(%text, "translated expression");
        Ok(text)
    }

    fn visit<'e>(
        &mut self,
        expr: &'e Expr,
        tasks: &mut Vec<Task<'e>>,
    ) -> Result<(), TranslationError> {
        match expr {
            Expr::Constant(value) => {
                let placeholder = self.binder.define_parameter(value);
                self.fragments.push(vec![placeholder]);
            }
            Expr::Member(_) => match expr.member_path() {
                // Commands read from a single table, so only the first
                // argument has columns.
                Some((0, path)) => {
                    let column = self.dialect.quote_path(&path);
                    self.fragments.push(vec![column]);
                }
                _ => return Err(unsupported(expr)),
            },
            Expr::Binary(binary) => {
                let infix = infix_operator(binary.op)
                    .ok_or(TranslationError::UnsupportedOperator(binary.op))?;
                // Popped in reverse, left is visited (and bound) first.
                tasks.push(Task::Combine(infix));
                tasks.push(Task::Visit(&binary.right));
                tasks.push(Task::Visit(&binary.left));
            }
            Expr::Variable(_) | Expr::Tuple(_) => return Err(unsupported(expr)),
        }
        Ok(())
    }

    fn combine(&mut self, infix: &'static str) -> Result<(), TranslationError> {
        let (right, mut left) = match (self.fragments.pop(), self.fragments.pop()) {
            (Some(right), Some(left)) => (right, left),
            _ => {
                return Err(TranslationError::Internal(
                    "missing operand fragments for binary expression".to_string(),
                ));
            }
        };

        left.reserve(right.len() + 3);
        left.insert(0, "(".to_string());
        left.push(infix.to_string());
        left.extend(right);
        left.push(")".to_string());
        self.fragments.push(left);

        Ok(())
    }
}

fn unsupported(expr: &Expr) -> TranslationError {
    TranslationError::UnsupportedNode {
        kind: expr.kind(),
        expr: expr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use querystream::ScalarValue;
    use querystream::expr::{col, lit, tuple, var};

    use super::*;
    use crate::dialect::{GenericDialect, MssqlDialect};
    use crate::parameters::{NamedBinder, PositionalBinder};

    fn translate_positional(expr: &Expr) -> (String, Vec<ScalarValue>) {
        let mut binder = Box::new(PositionalBinder::new());
        let text = translate_expr(expr, &GenericDialect, binder.as_mut()).unwrap();
        let values = binder.into_parameters().into_iter().map(|p| p.value).collect();
        (text, values)
    }

    #[test]
    fn and_of_comparisons() {
        let expr = col("a").eq(lit(1)).and(col("b").gt(lit(2)));
        let (text, params) = translate_positional(&expr);
        assert_eq!("((a = ?) AND (b > ?))", text);
        assert_eq!(vec![ScalarValue::Int64(1), ScalarValue::Int64(2)], params);
    }

    #[test]
    fn every_renderable_operator() {
        let cases = [
            (col("a").ne(lit(1)), "(a <> ?)"),
            (col("a").lt(lit(1)), "(a < ?)"),
            (col("a").lt_eq(lit(1)), "(a <= ?)"),
            (col("a").gt_eq(lit(1)), "(a >= ?)"),
            (col("a").add(lit(1)), "(a + ?)"),
            (col("a").sub(lit(1)), "(a - ?)"),
            (col("a").mul(lit(1)), "(a * ?)"),
            (col("a").div(lit(1)), "(a / ?)"),
            (col("a").or(lit(true)), "(a OR ?)"),
        ];
        for (expr, expected) in cases {
            assert_eq!(expected, translate_positional(&expr).0, "{expr}");
        }
    }

    #[test]
    fn parameters_bind_left_to_right() {
        let expr = lit(1).add(col("a")).eq(lit(2).mul(lit(3)));
        let (text, params) = translate_positional(&expr);
        assert_eq!("((? + a) = (? * ?))", text);
        assert_eq!(
            vec![
                ScalarValue::Int64(1),
                ScalarValue::Int64(2),
                ScalarValue::Int64(3)
            ],
            params
        );
    }

    #[test]
    fn quoted_member_path() {
        let expr = col("address").member("city").eq(lit("Oslo"));
        let mut binder = NamedBinder::default();
        let text = translate_expr(&expr, &MssqlDialect, &mut binder).unwrap();
        assert_eq!("([address].[city] = @p0)", text);
    }

    #[test]
    fn coalesced_parameters_share_placeholders() {
        let expr = col("a").eq(lit(5)).or(col("b").eq(lit(5)));
        let mut binder = NamedBinder::default();
        let text = translate_expr(&expr, &GenericDialect, &mut binder).unwrap();
        assert_eq!("((a = @p0) OR (b = @p0))", text);
        assert_eq!(1, binder.parameters().len());
    }

    #[test]
    fn modulo_is_unsupported() {
        let expr = col("a").rem(lit(2)).eq(lit(0));
        let mut binder = PositionalBinder::new();
        let err = translate_expr(&expr, &GenericDialect, &mut binder).unwrap_err();
        assert_eq!(TranslationError::UnsupportedOperator(BinaryOperator::Mod), err);
    }

    #[test]
    fn unsupported_nodes() {
        for expr in [
            var(0),
            tuple([col("a"), col("b")]),
            var(1).member("a"),
            lit(1).member("a"),
        ] {
            let mut binder = PositionalBinder::new();
            let err = translate_expr(&expr, &GenericDialect, &mut binder).unwrap_err();
            assert!(
                matches!(err, TranslationError::UnsupportedNode { .. }),
                "{expr}: {err}"
            );
        }
    }

    #[test]
    fn deterministic_with_fresh_state() {
        let expr = col("a").eq(lit(1)).and(col("b").lt(lit("z")));
        assert_eq!(translate_positional(&expr), translate_positional(&expr));
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let expr = Expr::and_all((0..1_000).map(|i| col("a").ne(lit(i)))).unwrap();
        let (text, params) = translate_positional(&expr);
        assert_eq!(1_000, params.len());
        assert!(text.starts_with("(((("));
    }
}
