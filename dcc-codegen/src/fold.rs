//! Compile-time evaluation of constant expressions
//!
//! Only the two expression kinds legal in a static initializer fold:
//! integer literals and unary negation. Anything else reports failure by
//! returning `None`; the caller decides whether that is fatal.

use dcc_ast::{Expression, ExpressionKind};

/// Fold a constant expression, or `None` if it is not one
pub fn fold(expr: &Expression) -> Option<i64> {
    match &expr.kind {
        ExpressionKind::IntLiteral { value, .. } => Some(*value),
        ExpressionKind::Negate(inner) => fold(inner).and_then(i64::checked_neg),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcc_common::SourceSpan;

    fn expr(kind: ExpressionKind) -> Expression {
        Expression {
            kind,
            span: SourceSpan::dummy(),
        }
    }

    fn literal(value: i64) -> Expression {
        expr(ExpressionKind::IntLiteral {
            value,
            suffix: None,
        })
    }

    #[test]
    fn test_folds_literal() {
        assert_eq!(fold(&literal(5)), Some(5));
    }

    #[test]
    fn test_folds_negation() {
        let negated = expr(ExpressionKind::Negate(Box::new(literal(5))));
        assert_eq!(fold(&negated), Some(-5));
    }

    #[test]
    fn test_folds_nested_negation() {
        let inner = expr(ExpressionKind::Negate(Box::new(literal(7))));
        let outer = expr(ExpressionKind::Negate(Box::new(inner)));
        assert_eq!(fold(&outer), Some(7));
    }

    #[test]
    fn test_call_does_not_fold() {
        let call = expr(ExpressionKind::Call {
            callee: Box::new(expr(ExpressionKind::Identifier("f".to_string()))),
            arguments: vec![],
        });
        assert_eq!(fold(&call), None);
    }

    #[test]
    fn test_negation_of_unfoldable_does_not_fold() {
        let inner = expr(ExpressionKind::Identifier("x".to_string()));
        let outer = expr(ExpressionKind::Negate(Box::new(inner)));
        assert_eq!(fold(&outer), None);
    }
}
