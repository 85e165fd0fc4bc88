//! Binary expression tree built by the evaluator's stack machine.

use super::operator::{Associativity, Operator};

/// Leaf operand or internal operator node.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// `literal` is the token as written (`007` stays `007`).
    Operand { value: u64, literal: String },
    Operator {
        op: &'static Operator,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    /// Leaf written in canonical decimal form.
    pub fn operand(value: u64) -> Self {
        Node::Operand {
            value,
            literal: value.to_string(),
        }
    }

    pub fn operator(op: &'static Operator, left: Node, right: Node) -> Self {
        Node::Operator {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Node::Operator { .. })
    }

    /// Precedence of an operator node; `None` for operands.
    pub fn precedence(&self) -> Option<u8> {
        match self {
            Node::Operand { .. } => None,
            Node::Operator { op, .. } => Some(op.precedence),
        }
    }

    pub fn operand_count(&self) -> usize {
        match self {
            Node::Operand { .. } => 1,
            Node::Operator { left, right, .. } => left.operand_count() + right.operand_count(),
        }
    }

    pub fn operator_count(&self) -> usize {
        match self {
            Node::Operand { .. } => 0,
            Node::Operator { left, right, .. } => {
                1 + left.operator_count() + right.operator_count()
            }
        }
    }

    /// Render as minimally parenthesized infix. Operands print as written.
    pub fn to_infix(&self) -> String {
        match self {
            Node::Operand { literal, .. } => literal.clone(),
            Node::Operator { op, left, right } => {
                compose_infix(op, left, left.to_infix(), right, right.to_infix())
            }
        }
    }
}

/// Whether `child`, sitting on the given side of `parent`, needs parentheses.
///
/// For a left-associative parent the right child is wrapped at equal precedence too,
/// so `a - (b - c)` keeps its parentheses while `(a - b) - c` drops them.
pub(crate) fn needs_parens(parent: &Operator, child: &Node, is_right: bool) -> bool {
    let Some(child_prec) = child.precedence() else {
        return false;
    };
    let wrap_equal = parent.associativity == Associativity::Left && is_right;
    child_prec < parent.precedence || (wrap_equal && child_prec == parent.precedence)
}

pub(crate) fn compose_infix(
    op: &Operator,
    left: &Node,
    left_str: String,
    right: &Node,
    right_str: String,
) -> String {
    let left_str = if needs_parens(op, left, false) {
        format!("({left_str})")
    } else {
        left_str
    };
    let right_str = if needs_parens(op, right, true) {
        format!("({right_str})")
    } else {
        right_str
    };
    format!("{} {} {}", left_str, op.symbol, right_str)
}
