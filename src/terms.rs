use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use crate::Sym;
use crate::errors::{Span, Spanned};

#[derive(Clone, Debug)]
enum TermKind {
    Variable(Sym),
    Constant(Sym),
}

/// A parameter or argument: either a (possibly typed) variable such as `?x - block`,
/// or a constant value such as `a`.
///
/// Variables are compared without regard to case, constants are compared exactly.
#[derive(Clone, Debug)]
pub struct Term {
    kind: TermKind,
    tpe: Option<Sym>,
}

impl Term {
    pub fn variable(name: impl Into<Sym>, tpe: Option<Sym>) -> Term {
        Term {
            kind: TermKind::Variable(name.into()),
            tpe,
        }
    }

    pub fn constant(value: impl Into<Sym>, tpe: Option<Sym>) -> Term {
        Term {
            kind: TermKind::Constant(value.into()),
            tpe,
        }
    }

    /// Builds a term from a symbol read in a source: symbols starting with `?` are variables.
    pub fn from_symbol(sym: Sym, tpe: Option<Sym>) -> Term {
        if sym.canonical_str().starts_with('?') {
            Term::variable(sym, tpe)
        } else {
            Term::constant(sym, tpe)
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, TermKind::Variable(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, TermKind::Constant(_))
    }

    /// Name of the variable, if this term is one.
    pub fn name(&self) -> Option<&Sym> {
        match &self.kind {
            TermKind::Variable(name) => Some(name),
            TermKind::Constant(_) => None,
        }
    }

    /// Value of the constant, if this term is one.
    pub fn value(&self) -> Option<&Sym> {
        match &self.kind {
            TermKind::Constant(value) => Some(value),
            TermKind::Variable(_) => None,
        }
    }

    /// Name or value of the term.
    pub fn symbol(&self) -> &Sym {
        match &self.kind {
            TermKind::Variable(s) | TermKind::Constant(s) => s,
        }
    }

    pub fn tpe(&self) -> Option<&Sym> {
        self.tpe.as_ref()
    }

    pub fn with_type(mut self, tpe: Option<Sym>) -> Term {
        self.tpe = tpe;
        self
    }

    /// The same term without its type annotation, as it appears when used as an argument.
    pub fn untyped(&self) -> Term {
        self.clone().with_type(None)
    }

    /// True if the two terms designate the same symbol (case-insensitively for variables).
    pub fn same_symbol(&self, other: &Sym) -> bool {
        match &self.kind {
            TermKind::Variable(name) => name.eq_ignore_case(other.canonical_str()),
            TermKind::Constant(value) => value == other,
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.tpe == other.tpe
            && match (&self.kind, &other.kind) {
                (TermKind::Variable(a), TermKind::Variable(b)) => a.eq_ignore_case(b.canonical_str()),
                (TermKind::Constant(a), TermKind::Constant(b)) => a == b,
                _ => false,
            }
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tpe.hash(state);
        match &self.kind {
            TermKind::Variable(name) => {
                0u8.hash(state);
                name.canonical_str().to_ascii_lowercase().hash(state);
            }
            TermKind::Constant(value) => {
                1u8.hash(state);
                value.hash(state);
            }
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.tpe) {
            (TermKind::Variable(name), Some(tpe)) => write!(f, "{name} - {tpe}"),
            (TermKind::Variable(name), None) => write!(f, "{name}"),
            (TermKind::Constant(value), _) => write!(f, "{value}"),
        }
    }
}

impl Spanned for Term {
    fn span(&self) -> Option<&Span> {
        self.symbol().span.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn variables_ignore_case() {
        let upper = Term::variable("?X", Some("block".into()));
        let lower = Term::variable("?x", Some("block".into()));
        assert_eq!(upper, lower);

        let set: HashSet<Term> = [upper, lower].into_iter().collect();
        assert_eq!(set.len(), 1);

        assert_ne!(
            Term::variable("?x", Some("block".into())),
            Term::variable("?x", Some("table".into()))
        );
    }

    #[test]
    fn constants_are_exact() {
        assert_ne!(Term::constant("A", None), Term::constant("a", None));
        assert_eq!(Term::constant("a", None), Term::constant("a", None));
        assert_ne!(Term::constant("?x", None), Term::variable("?x", None));
    }

    #[test]
    fn symbols_are_classified() {
        assert!(Term::from_symbol("?x".into(), None).is_variable());
        assert!(Term::from_symbol("rover1".into(), None).is_constant());
        assert_eq!(Term::variable("?x", Some("block".into())).to_string(), "?x - block");
        assert_eq!(Term::constant("a", Some("block".into())).to_string(), "a");
    }
}
