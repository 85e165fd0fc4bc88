//! Per-expression failures. Recoverable: a consumer turns each into a failure line.

use thiserror::Error;

/// Why a single postfix expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("the expression '{0}' contains empty operand(s)/operator(s)")]
    EmptyToken(String),

    #[error("missing operand for operator '{0}'")]
    MissingOperand(char),

    #[error("'{0}' is an invalid operand")]
    InvalidOperand(String),

    #[error("operand '{0}' is too large")]
    OperandOutOfRange(String),

    #[error("unbalanced expression: {operands} operand(s) left after evaluation")]
    Unbalanced { operands: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result does not fit a 64-bit integer")]
    Overflow,
}
