use derive_more::derive::Display;
use itertools::Itertools;

use crate::expressions::Expression;
use crate::predicates::Literal;
use crate::Sym;

/// A precondition, goal or derived-predicate body element.
#[derive(Clone, Debug, PartialEq, Display)]
pub enum Condition {
    Literal(Literal),
    Expression(Expression),
    #[display("or({})", _0.iter().join(", "))]
    Or(Vec<Condition>),
}

impl Condition {
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Condition::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Condition::Expression(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn collect_symbols(&self, out: &mut Vec<Sym>) {
        match self {
            Condition::Literal(l) => l.predicate.collect_symbols(out),
            Condition::Expression(e) => e.collect_symbols(out),
            Condition::Or(disjuncts) => disjuncts.iter().for_each(|c| c.collect_symbols(out)),
        }
    }
}

impl From<Literal> for Condition {
    fn from(value: Literal) -> Self {
        Condition::Literal(value)
    }
}

impl From<Expression> for Condition {
    fn from(value: Expression) -> Self {
        Condition::Expression(value)
    }
}
