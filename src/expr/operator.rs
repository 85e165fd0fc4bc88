//! Fixed table of the four binary arithmetic operators.
//!
//! Values are exact rationals, so `+ - *` never lose precision and `/` keeps its
//! fractional part until the final truncation.

use dashu::rational::RBig;

use super::error::ParseError;

/// Grouping direction for operators of equal precedence. Every operator in the table
/// groups to the left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Associativity {
    Left,
}

/// One binary operator: symbol, precedence (higher binds tighter) and its function.
#[derive(Debug)]
pub struct Operator {
    pub symbol: char,
    pub precedence: u8,
    pub associativity: Associativity,
    apply: fn(RBig, RBig) -> Result<RBig, ParseError>,
}

fn add(a: RBig, b: RBig) -> Result<RBig, ParseError> {
    Ok(a + b)
}

fn sub(a: RBig, b: RBig) -> Result<RBig, ParseError> {
    Ok(a - b)
}

fn mul(a: RBig, b: RBig) -> Result<RBig, ParseError> {
    Ok(a * b)
}

fn div(a: RBig, b: RBig) -> Result<RBig, ParseError> {
    if b == RBig::ZERO {
        return Err(ParseError::DivisionByZero);
    }
    Ok(a / b)
}

/// Process-wide operator table. `+ -` bind at 1, `* /` at 2, all left-associative.
pub static OPERATORS: [Operator; 4] = [
    Operator {
        symbol: '+',
        precedence: 1,
        associativity: Associativity::Left,
        apply: add,
    },
    Operator {
        symbol: '-',
        precedence: 1,
        associativity: Associativity::Left,
        apply: sub,
    },
    Operator {
        symbol: '*',
        precedence: 2,
        associativity: Associativity::Left,
        apply: mul,
    },
    Operator {
        symbol: '/',
        precedence: 2,
        associativity: Associativity::Left,
        apply: div,
    },
];

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Operator {
    /// Look up an already-trimmed token. Only single-character tokens can match.
    pub fn lookup(token: &str) -> Option<&'static Operator> {
        let mut chars = token.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return None;
        };
        OPERATORS.iter().find(|op| op.symbol == c)
    }

    /// Apply to `(left, right)`.
    pub fn apply(&self, left: RBig, right: RBig) -> Result<RBig, ParseError> {
        (self.apply)(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashu::integer::IBig;

    fn int(n: i64) -> RBig {
        RBig::from(IBig::from(n))
    }

    #[test]
    fn test_lookup_known_symbols() {
        for (token, prec) in [("+", 1), ("-", 1), ("*", 2), ("/", 2)] {
            let op = Operator::lookup(token).unwrap();
            assert_eq!(op.precedence, prec);
            assert_eq!(op.associativity, Associativity::Left);
        }
    }

    #[test]
    fn test_lookup_rejects_other_tokens() {
        assert!(Operator::lookup("").is_none());
        assert!(Operator::lookup("++").is_none());
        assert!(Operator::lookup("%").is_none());
        assert!(Operator::lookup("1").is_none());
    }

    #[test]
    fn test_apply_true_division() {
        let div = Operator::lookup("/").unwrap();
        let five_halves = div.apply(int(10), int(4)).unwrap();
        assert_eq!(five_halves * int(2), int(5));
        assert_eq!(div.apply(int(1), int(0)), Err(ParseError::DivisionByZero));
    }

    #[test]
    fn test_apply_is_exact_for_large_products() {
        let mul = Operator::lookup("*").unwrap();
        let product = mul.apply(int(3_037_000_499), int(3_037_000_499)).unwrap();
        assert_eq!(product, int(9_223_372_030_926_249_001));
    }
}
