//! Postfix → (value, infix) stack machine with a bounded memo cache.

use dashu::integer::IBig;
use dashu::rational::RBig;
use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;

use super::error::ParseError;
use super::operator::Operator;
use super::tree::{Node, compose_infix};
use crate::utils::config::EvaluatorDefaults;

/// Outcome of evaluating one expression.
///
/// `value` and `tree` are `None` only for the empty expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub infix: String,
    pub value: Option<i64>,
    pub tree: Option<Node>,
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) => write!(f, "{} = {}", self.infix, v),
            None => write!(f, "{}", self.infix),
        }
    }
}

/// One entry on the stack machine: subtree, its value and its rendered infix.
struct Frame {
    node: Node,
    value: RBig,
    infix: String,
}

/// Evaluates postfix expressions. Each consumer owns one, so the cache needs no lock.
pub struct Evaluator {
    delimiter: char,
    cache: LruCache<String, Evaluation>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(EvaluatorDefaults::DELIMITER, EvaluatorDefaults::cache_capacity())
    }
}

impl Evaluator {
    pub fn new(delimiter: char, cache_capacity: NonZeroUsize) -> Self {
        Self {
            delimiter,
            cache: LruCache::new(cache_capacity),
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Number of memoized expressions currently held.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Evaluate `expression`. Successful results are memoized by the trimmed text;
    /// failures are recomputed every time.
    pub fn evaluate(&mut self, expression: &str) -> Result<Evaluation, ParseError> {
        let expression = expression.trim();
        if let Some(hit) = self.cache.get(expression) {
            return Ok(hit.clone());
        }
        let evaluation = evaluate_postfix(expression, self.delimiter)?;
        self.cache.put(expression.to_string(), evaluation.clone());
        Ok(evaluation)
    }
}

/// Uncached evaluation of an already-trimmed expression.
pub fn evaluate_postfix(expression: &str, delimiter: char) -> Result<Evaluation, ParseError> {
    if expression.is_empty() {
        return Ok(Evaluation {
            infix: String::new(),
            value: None,
            tree: None,
        });
    }

    let mut stack: Vec<Frame> = Vec::new();
    for raw in expression.split(delimiter) {
        let token = raw.trim();
        if token.is_empty() {
            return Err(ParseError::EmptyToken(expression.to_string()));
        }
        match Operator::lookup(token) {
            Some(op) => {
                // Right operand is on top.
                let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                    return Err(ParseError::MissingOperand(op.symbol));
                };
                let value = op.apply(left.value, right.value)?;
                let infix = compose_infix(op, &left.node, left.infix, &right.node, right.infix);
                stack.push(Frame {
                    node: Node::operator(op, left.node, right.node),
                    value,
                    infix,
                });
            }
            None => {
                let n = parse_operand(token)?;
                stack.push(Frame {
                    node: Node::Operand {
                        value: n,
                        literal: token.to_string(),
                    },
                    value: RBig::from(IBig::from(n)),
                    infix: token.to_string(),
                });
            }
        }
    }

    if stack.len() != 1 {
        return Err(ParseError::Unbalanced {
            operands: stack.len(),
        });
    }
    let Frame { node, value, infix } = stack.remove(0);
    Ok(Evaluation {
        infix,
        value: Some(truncate(&value)?),
        tree: Some(node),
    })
}

/// Operands are unsigned decimal literals: no sign, no fraction, no exponent.
fn parse_operand(token: &str) -> Result<u64, ParseError> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidOperand(token.to_string()));
    }
    token
        .parse::<u64>()
        .map_err(|_| ParseError::OperandOutOfRange(token.to_string()))
}

/// Toward zero, like integer conversion of a quotient. Only the final value must fit `i64`.
fn truncate(value: &RBig) -> Result<i64, ParseError> {
    i64::try_from(value.trunc()).map_err(|_| ParseError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> Result<(i64, String), ParseError> {
        let e = Evaluator::default().evaluate(expr)?;
        Ok((e.value.unwrap(), e.infix))
    }

    #[test]
    fn test_sum_then_product() {
        assert_eq!(eval("2, 3, +, 5, *"), Ok((25, "(2 + 3) * 5".to_string())));
    }

    #[test]
    fn test_division_by_difference() {
        assert_eq!(eval("10, 7, 2, -, /"), Ok((2, "10 / (7 - 2)".to_string())));
    }

    #[test]
    fn test_chained_sums_need_no_parens() {
        assert_eq!(
            eval("5,2,6,*,+,200,+"),
            Ok((217, "5 + 2 * 6 + 200".to_string()))
        );
        assert_eq!(
            eval("10,3,+,2,+,5, *"),
            Ok((75, "(10 + 3 + 2) * 5".to_string()))
        );
    }

    #[test]
    fn test_fractional_intermediate_truncates_at_end() {
        assert_eq!(
            eval("2,100,100,+,*, 10, 100, 2, *, /, +, 9, +"),
            Ok((409, "2 * (100 + 100) + 10 / (100 * 2) + 9".to_string()))
        );
        assert_eq!(eval("7, 2, /"), Ok((3, "7 / 2".to_string())));
        assert_eq!(eval("2, 7, -"), Ok((-5, "2 - 7".to_string())));
    }

    #[test]
    fn test_large_values_are_exact() {
        assert_eq!(
            eval("9007199254740993"),
            Ok((9_007_199_254_740_993, "9007199254740993".to_string()))
        );
        assert_eq!(
            eval("3037000499, 3037000499, *"),
            Ok((
                9_223_372_030_926_249_001,
                "3037000499 * 3037000499".to_string()
            ))
        );
        // Intermediates may exceed i64 as long as the final value fits.
        assert_eq!(
            eval("18446744073709551615, 18446744073709551615, *, 18446744073709551615, /, 18446744073709551614, -").map(|r| r.0),
            Ok(1)
        );
        assert_eq!(eval("7, 0, 2, -, /").map(|r| r.0), Ok(-3));
        assert_eq!(
            eval("9223372036854775807, 1, +"),
            Err(ParseError::Overflow)
        );
    }

    #[test]
    fn test_literal_operand_is_kept() {
        let e = Evaluator::default().evaluate("007, 1, +").unwrap();
        assert_eq!(e.infix, "007 + 1");
        assert_eq!(e.tree.unwrap().to_infix(), "007 + 1");
        assert_eq!(e.value, Some(8));
    }

    #[test]
    fn test_single_operand() {
        assert_eq!(eval(" 42 "), Ok((42, "42".to_string())));
    }

    #[test]
    fn test_empty_expression() {
        let e = Evaluator::default().evaluate("   ").unwrap();
        assert_eq!(e.infix, "");
        assert_eq!(e.value, None);
        assert!(e.tree.is_none());
        assert_eq!(e.to_string(), "");
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            eval("2, a, +, 5, *"),
            Err(ParseError::InvalidOperand("a".to_string()))
        );
        assert_eq!(
            eval("10,7,2,3"),
            Err(ParseError::Unbalanced { operands: 4 })
        );
        assert_eq!(eval("2, +"), Err(ParseError::MissingOperand('+')));
        assert_eq!(eval("+"), Err(ParseError::MissingOperand('+')));
        assert!(matches!(eval("2,,3,+"), Err(ParseError::EmptyToken(_))));
        assert_eq!(eval("-3"), Err(ParseError::InvalidOperand("-3".to_string())));
        assert_eq!(eval("1, 0, /"), Err(ParseError::DivisionByZero));
        assert!(matches!(
            eval("99999999999999999999999"),
            Err(ParseError::OperandOutOfRange(_))
        ));
    }

    #[test]
    fn test_custom_delimiter() {
        let mut ev = Evaluator::new(' ', EvaluatorDefaults::cache_capacity());
        let e = ev.evaluate("3 4 + 2 *").unwrap();
        assert_eq!(e.to_string(), "(3 + 4) * 2 = 14");
        assert_eq!(ev.delimiter(), ' ');
    }

    #[test]
    fn test_cache_hit_is_identical_and_bounded() {
        let mut ev = Evaluator::new(',', NonZeroUsize::new(2).unwrap());
        let first = ev.evaluate("2, 3, +").unwrap();
        let second = ev.evaluate("  2, 3, +  ").unwrap();
        assert_eq!(first, second);
        assert_eq!(ev.cached(), 1);

        ev.evaluate("4, 5, *").unwrap();
        ev.evaluate("6, 7, -").unwrap();
        assert_eq!(ev.cached(), 2);

        assert!(ev.evaluate("x").is_err());
        assert_eq!(ev.cached(), 2);
    }

    #[test]
    fn test_tree_matches_rendering() {
        let e = Evaluator::default().evaluate("1, 2, 3, -, -").unwrap();
        let tree = e.tree.unwrap();
        assert_eq!(e.infix, "1 - (2 - 3)");
        assert_eq!(tree.to_infix(), e.infix);
        assert_eq!(tree.operand_count(), tree.operator_count() + 1);
    }
}
