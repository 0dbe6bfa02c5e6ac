use std::fmt::{Display, Formatter};

use derive_more::derive::Display;

use crate::errors::InvariantError;
use crate::expressions::Expression;
use crate::predicates::Literal;
use crate::utils::{disp_iter, disp_slice};
use crate::Sym;

/// Elementary change of the state: a literal becoming true/false or a fluent update.
#[derive(Clone, Debug, PartialEq, Display)]
pub enum EffectAtom {
    Literal(Literal),
    Expression(Expression),
}

impl EffectAtom {
    pub(crate) fn collect_symbols(&self, out: &mut Vec<Sym>) {
        match self {
            EffectAtom::Literal(l) => l.predicate.collect_symbols(out),
            EffectAtom::Expression(e) => e.collect_symbols(out),
        }
    }
}

impl From<Literal> for EffectAtom {
    fn from(value: Literal) -> Self {
        EffectAtom::Literal(value)
    }
}

impl From<Expression> for EffectAtom {
    fn from(value: Expression) -> Self {
        EffectAtom::Expression(value)
    }
}

/// An effect atom that occurs with some probability.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbEffect {
    pub probability: f64,
    pub atom: EffectAtom,
}

impl ProbEffect {
    /// An effect that always occurs.
    pub fn certain(atom: impl Into<EffectAtom>) -> ProbEffect {
        ProbEffect {
            probability: 1.0,
            atom: atom.into(),
        }
    }

    pub fn new(probability: f64, atom: impl Into<EffectAtom>) -> Result<ProbEffect, InvariantError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(InvariantError::new(
                "probabilistic effect",
                format!("probability {probability} is not in [0, 1]"),
            ));
        }
        Ok(ProbEffect {
            probability,
            atom: atom.into(),
        })
    }

    pub fn is_certain(&self) -> bool {
        self.probability == 1.0
    }
}

impl Display for ProbEffect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_certain() {
            write!(f, "{}", self.atom)
        } else {
            write!(f, "{} with p={}", self.atom, self.probability)
        }
    }
}

/// Conjunction of effects that happen together.
pub type Outcome = Vec<ProbEffect>;

/// An outcome identified by a name, e.g. `(success (and ...))`.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledOutcome {
    pub label: Sym,
    pub body: Outcome,
}

impl LabeledOutcome {
    pub fn new(label: impl Into<Sym>, body: Outcome) -> Self {
        LabeledOutcome {
            label: label.into(),
            body,
        }
    }
}

impl Display for LabeledOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.label)?;
        disp_slice(f, &self.body, " & ")
    }
}

/// Effects of an action or event.
///
/// The three shapes are mutually exclusive: a single deterministic conjunction, a list of
/// alternative (unlabeled) branches, or a list of labeled outcomes.
#[derive(Clone, Debug, PartialEq)]
pub enum Effects {
    Deterministic(Outcome),
    Probabilistic(Vec<Outcome>),
    Labeled(Vec<LabeledOutcome>),
}

impl Default for Effects {
    fn default() -> Self {
        Effects::Deterministic(Vec::new())
    }
}

impl Effects {
    pub fn deterministic(outcome: Outcome) -> Effects {
        Effects::Deterministic(outcome)
    }

    pub fn probabilistic(branches: Vec<Outcome>) -> Result<Effects, InvariantError> {
        if branches.is_empty() {
            return Err(InvariantError::new("effects", "a `oneof` requires at least one branch"));
        }
        Ok(Effects::Probabilistic(branches))
    }

    pub fn labeled(outcomes: Vec<LabeledOutcome>) -> Result<Effects, InvariantError> {
        if outcomes.is_empty() {
            return Err(InvariantError::new("effects", "labeled effects require at least one outcome"));
        }
        Ok(Effects::Labeled(outcomes))
    }

    pub fn is_deterministic(&self) -> bool {
        matches!(self, Effects::Deterministic(_))
    }

    /// All possible outcomes, in declaration order.
    pub fn outcomes(&self) -> Vec<&Outcome> {
        match self {
            Effects::Deterministic(o) => vec![o],
            Effects::Probabilistic(branches) => branches.iter().collect(),
            Effects::Labeled(labeled) => labeled.iter().map(|l| &l.body).collect(),
        }
    }

    /// Fluent updates of the first outcome.
    pub fn fluent_updates(&self) -> impl Iterator<Item = &Expression> + '_ {
        self.outcomes()
            .into_iter()
            .next()
            .into_iter()
            .flatten()
            .filter_map(|e| match &e.atom {
                EffectAtom::Expression(e) => Some(e),
                EffectAtom::Literal(_) => None,
            })
    }
}

impl Display for Effects {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Effects::Deterministic(o) => disp_slice(f, o, " & "),
            Effects::Probabilistic(branches) => {
                write!(f, "oneof[")?;
                disp_iter(
                    f,
                    branches.iter().map(|b| b.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(" & ")),
                    " | ",
                )?;
                write!(f, "]")
            }
            Effects::Labeled(outcomes) => {
                write!(f, "oneof[")?;
                disp_slice(f, outcomes, " | ")?;
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Predicate, Term};

    fn lit(name: &str) -> Literal {
        Literal::positive(Predicate::new(name, [Term::constant("a", None)]))
    }

    #[test]
    fn probabilities_are_bounded() {
        assert!(ProbEffect::new(0.0, lit("p")).is_ok());
        assert!(ProbEffect::new(1.0, lit("p")).unwrap().is_certain());
        assert!(ProbEffect::new(1.5, lit("p")).is_err());
        assert!(ProbEffect::new(-0.1, lit("p")).is_err());
    }

    #[test]
    fn shapes_are_exclusive() {
        assert!(Effects::probabilistic(vec![]).is_err());
        assert!(Effects::labeled(vec![]).is_err());

        let branches = vec![vec![ProbEffect::certain(lit("p"))], vec![ProbEffect::certain(lit("q"))]];
        let eff = Effects::probabilistic(branches).unwrap();
        assert!(!eff.is_deterministic());
        assert_eq!(eff.outcomes().len(), 2);
        assert_eq!(eff.to_string(), "oneof[p(a) | q(a)]");
    }
}
