use std::fmt::Display;

use smallvec::SmallVec;

use crate::conditions::Condition;
use crate::utils::disp_slice;
use crate::{Sym, Term};

pub type Args = SmallVec<[Term; 3]>;

/// Name of the built-in equality predicate.
pub const EQUALITY: &str = "=";

/// A predicate, either in a declaration `(on ?x - block ?y - block)` or applied to arguments `(on a ?y)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Predicate {
    pub name: Sym,
    pub args: Args,
}

impl Predicate {
    pub fn new(name: impl Into<Sym>, args: impl IntoIterator<Item = Term>) -> Predicate {
        Predicate {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// The equality predicate `(= lhs rhs)`
    pub fn equality(lhs: Term, rhs: Term) -> Predicate {
        Predicate::new(EQUALITY, [lhs, rhs])
    }

    pub fn is_equality(&self) -> bool {
        self.name == EQUALITY
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// The same predicate with type annotations removed from its arguments.
    pub fn untyped(&self) -> Predicate {
        Predicate {
            name: self.name.clone(),
            args: self.args.iter().map(Term::untyped).collect(),
        }
    }

    pub(crate) fn collect_symbols(&self, out: &mut Vec<Sym>) {
        out.extend(self.args.iter().map(|t| t.symbol().clone()))
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_equality() && self.arity() == 2 {
            write!(f, "{} = {}", self.args[0], self.args[1])
        } else {
            write!(f, "{}(", self.name)?;
            disp_slice(f, &self.args, ", ")?;
            write!(f, ")")
        }
    }
}

/// A predicate with a polarity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Literal {
    pub predicate: Predicate,
    pub positive: bool,
}

impl Literal {
    pub fn positive(predicate: Predicate) -> Literal {
        Literal {
            predicate,
            positive: true,
        }
    }

    pub fn negative(predicate: Predicate) -> Literal {
        Literal {
            predicate,
            positive: false,
        }
    }

    pub fn is_negative(&self) -> bool {
        !self.positive
    }

    pub fn negated(&self) -> Literal {
        Literal {
            predicate: self.predicate.clone(),
            positive: !self.positive,
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.positive, self.predicate.is_equality() && self.predicate.arity() == 2) {
            (true, _) => write!(f, "{}", self.predicate),
            (false, true) => write!(f, "{} != {}", self.predicate.args[0], self.predicate.args[1]),
            (false, false) => write!(f, "not {}", self.predicate),
        }
    }
}

/// A predicate whose truth is defined by a conjunction of conditions over its parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedPredicate {
    pub name: Sym,
    pub args: Args,
    pub body: Vec<Condition>,
}

impl DerivedPredicate {
    pub fn new(name: impl Into<Sym>, args: impl IntoIterator<Item = Term>, body: Vec<Condition>) -> Self {
        DerivedPredicate {
            name: name.into(),
            args: args.into_iter().collect(),
            body,
        }
    }
}

impl Display for DerivedPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        disp_slice(f, &self.args, ", ")?;
        write!(f, ") := ")?;
        disp_slice(f, &self.body, " & ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let on = Predicate::new("on", [Term::variable("?x", None), Term::constant("a", None)]);
        assert_eq!(on.to_string(), "on(?x, a)");
        assert_eq!(Literal::negative(on.clone()).to_string(), "not on(?x, a)");

        let eq = Predicate::equality(Term::variable("?x", None), Term::variable("?y", None));
        assert!(eq.is_equality());
        assert_eq!(Literal::negative(eq).to_string(), "?x != ?y");
    }

    #[test]
    fn untyped_drops_types_only() {
        let decl = Predicate::new("at", [Term::variable("?r", Some("rover".into()))]);
        let used = decl.untyped();
        assert_eq!(used.args[0], Term::variable("?r", None));
        assert_eq!(used.name, decl.name);
        assert_ne!(used, decl);
    }

    #[test]
    fn literals_compare_polarity() {
        let p = Predicate::new("clear", [Term::constant("a", None)]);
        assert_ne!(Literal::positive(p.clone()), Literal::negative(p.clone()));
        assert_eq!(Literal::positive(p.clone()).negated(), Literal::negative(p));
    }
}
