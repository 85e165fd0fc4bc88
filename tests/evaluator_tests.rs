//! Evaluator tests: reference expressions, error taxonomy, determinism and structure properties.

use proptest::prelude::*;
use rpnbatch::expr::{Evaluator, ParseError, evaluate_postfix};

fn value_and_infix(expr: &str) -> Result<(i64, String), ParseError> {
    let e = Evaluator::default().evaluate(expr)?;
    Ok((e.value.expect("non-empty expression has a value"), e.infix))
}

#[test]
fn test_reference_expressions() {
    assert_eq!(
        value_and_infix("2, 3, +, 5, *").unwrap(),
        (25, "(2 + 3) * 5".to_string())
    );
    assert_eq!(
        value_and_infix("10, 7, 2, -, /").unwrap(),
        (2, "10 / (7 - 2)".to_string())
    );
    assert_eq!(
        value_and_infix("5,2,6,*,+,200,+").unwrap(),
        (217, "5 + 2 * 6 + 200".to_string())
    );
}

#[test]
fn test_associativity_rendering() {
    assert_eq!(value_and_infix("8, 4, 2, -, -").unwrap().1, "8 - (4 - 2)");
    assert_eq!(value_and_infix("8, 4, -, 2, -").unwrap().1, "8 - 4 - 2");
    assert_eq!(value_and_infix("8, 4, 2, /, /").unwrap().1, "8 / (4 / 2)");
    assert_eq!(value_and_infix("8, 4, /, 2, /").unwrap().1, "8 / 4 / 2");
    assert_eq!(value_and_infix("8, 4, 2, *, -").unwrap().1, "8 - 4 * 2");
    assert_eq!(value_and_infix("8, 4, 2, +, *").unwrap().1, "8 * (4 + 2)");
    assert_eq!(value_and_infix("8, 4, +, 2, *").unwrap().1, "(8 + 4) * 2");
}

#[test]
fn test_non_numeric_operand() {
    assert!(matches!(
        value_and_infix("2, a, +, 5, *"),
        Err(ParseError::InvalidOperand(ref t)) if t == "a"
    ));
}

#[test]
fn test_leftover_operands() {
    assert!(matches!(
        value_and_infix("10,7,2,3"),
        Err(ParseError::Unbalanced { operands: 4 })
    ));
}

#[test]
fn test_error_messages_are_descriptive() {
    let err = value_and_infix("1, +").unwrap_err();
    assert_eq!(err.to_string(), "missing operand for operator '+'");
    let err = value_and_infix("1, 2").unwrap_err();
    assert!(err.to_string().contains("unbalanced"));
}

fn arb_postfix() -> impl Strategy<Value = (String, usize, usize)> {
    // Build a valid postfix string from random operands and operators.
    (
        prop::collection::vec(1u32..100, 1..6),
        prop::collection::vec(prop::sample::select(vec!["+", "-", "*"]), 0..6),
    )
        .prop_map(|(operands, ops)| {
            let mut tokens: Vec<String> = vec![operands[0].to_string()];
            let mut used_ops = 0;
            for (i, operand) in operands.iter().enumerate().skip(1) {
                tokens.push(operand.to_string());
                let op = ops.get(i - 1).copied().unwrap_or("+");
                tokens.push(op.to_string());
                used_ops += 1;
            }
            (tokens.join(", "), operands.len(), used_ops)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_evaluation_is_deterministic((expr, _, _) in arb_postfix()) {
        let mut warm = Evaluator::default();
        let first = warm.evaluate(&expr).unwrap();
        let cached = warm.evaluate(&expr).unwrap();
        let fresh = Evaluator::default().evaluate(&expr).unwrap();
        prop_assert_eq!(&first, &cached);
        prop_assert_eq!(&first, &fresh);
    }

    #[test]
    fn prop_operators_are_one_less_than_operands((expr, operands, operators) in arb_postfix()) {
        prop_assert_eq!(operators, operands - 1);
        let e = evaluate_postfix(&expr, ',').unwrap();
        let tree = e.tree.unwrap();
        prop_assert_eq!(tree.operand_count(), operands);
        prop_assert_eq!(tree.operator_count(), operators);
        prop_assert_eq!(tree.to_infix(), e.infix);
    }

    #[test]
    fn prop_extra_operand_is_unbalanced((expr, _, _) in arb_postfix(), extra in 1u32..100) {
        let broken = format!("{expr}, {extra}");
        let is_unbalanced = matches!(
            evaluate_postfix(&broken, ','),
            Err(ParseError::Unbalanced { .. })
        );
        prop_assert!(is_unbalanced);
    }

    #[test]
    fn prop_extra_operator_is_missing_operand((expr, _, _) in arb_postfix()) {
        let broken = format!("{expr}, *");
        let is_missing = matches!(
            evaluate_postfix(&broken, ','),
            Err(ParseError::MissingOperand('*'))
        );
        prop_assert!(is_missing);
    }
}
