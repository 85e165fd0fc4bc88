//! Postfix expression evaluation: operator table, expression tree, evaluator.

pub mod error;
pub mod evaluator;
pub mod operator;
pub mod tree;

pub use error::ParseError;
pub use evaluator::{Evaluation, Evaluator, evaluate_postfix};
pub use operator::{Associativity, OPERATORS, Operator};
pub use tree::Node;
