use std::fmt::Display;

use derive_more::derive::Display;

use crate::expressions::Equation;
use crate::predicates::Args;
use crate::utils::disp_slice;
use crate::{Sym, Term};

/// Range and precision of the values a fluent may take.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
#[display("[{min}, {max}] ~{precision}")]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
    /// Number of decimal digits.
    pub precision: u32,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            min: 0,
            max: 100,
            precision: 2,
        }
    }
}

/// Declaration of a numeric state variable, e.g. `(battery ?r - rover)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Fluent {
    pub name: Sym,
    pub args: Args,
    pub bounds: Bounds,
    /// Return type, absent for numeric fluents.
    pub tpe: Option<Sym>,
}

impl Fluent {
    pub fn new(name: impl Into<Sym>, args: impl IntoIterator<Item = Term>) -> Fluent {
        Fluent {
            name: name.into(),
            args: args.into_iter().collect(),
            bounds: Bounds::default(),
            tpe: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Fluent {
        self.bounds = bounds;
        self
    }

    pub fn with_type(mut self, tpe: Option<Sym>) -> Fluent {
        self.tpe = tpe;
        self
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn has_default_bounds(&self) -> bool {
        self.bounds == Bounds::default()
    }
}

impl Display for Fluent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        disp_slice(f, &self.args, ", ")?;
        write!(f, ") in {}", self.bounds)?;
        if let Some(tpe) = &self.tpe {
            write!(f, " -> {tpe}")?;
        }
        Ok(())
    }
}

/// A fluent applied to arguments, as it appears in expressions and in the initial state.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FluentRef {
    pub name: Sym,
    pub args: Args,
}

impl FluentRef {
    pub fn new(name: impl Into<Sym>, args: impl IntoIterator<Item = Term>) -> FluentRef {
        FluentRef {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }
}

impl Display for FluentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        disp_slice(f, &self.args, ", ")?;
        write!(f, ")")
    }
}

/// Continuous evolution of a fluent, e.g. `(= level (+ level 1))`.
#[derive(Clone, Debug, PartialEq, Display)]
#[display("{fluent} := {equation}")]
pub struct Process {
    pub fluent: Sym,
    pub equation: Equation,
}

impl Process {
    pub fn new(fluent: impl Into<Sym>, equation: Equation) -> Process {
        Process {
            fluent: fluent.into(),
            equation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::{Expression, Operator};

    #[test]
    fn default_bounds() {
        let fl = Fluent::new("level", []);
        assert!(fl.has_default_bounds());
        assert_eq!(fl.bounds, Bounds { min: 0, max: 100, precision: 2 });
        assert_eq!(fl.to_string(), "level() in [0, 100] ~2");

        let fl = fl.with_bounds(Bounds { min: -5, max: 5, precision: 0 });
        assert!(!fl.has_default_bounds());
    }

    #[test]
    fn process_display() {
        let eq = Equation::new(Expression::node(
            Operator::Plus,
            Expression::symbol("level"),
            Expression::leaf(1),
        ))
        .unwrap();
        assert_eq!(Process::new("level", eq).to_string(), "level := (+ level 1) over [level]");
    }
}
