use std::fmt::{Display, Formatter};

use derive_more::derive::Display;

use crate::errors::InvariantError;
use crate::fluents::FluentRef;
use crate::Sym;
use crate::utils::fmt_real;

/// Binary operators of TSAL numeric expressions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum Operator {
    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("*")]
    Times,
    #[display("/")]
    Divide,
    #[display(">")]
    Gt,
    #[display(">=")]
    GtEq,
    #[display("<")]
    Lt,
    #[display("<=")]
    LtEq,
    #[display("=")]
    Equals,
    #[display("!=")]
    Neq,
    #[display("%")]
    Mod,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Plus,
        Operator::Minus,
        Operator::Times,
        Operator::Divide,
        Operator::Gt,
        Operator::GtEq,
        Operator::Lt,
        Operator::LtEq,
        Operator::Equals,
        Operator::Neq,
        Operator::Mod,
    ];

    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Times => "*",
            Operator::Divide => "/",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Equals => "=",
            Operator::Neq => "!=",
            Operator::Mod => "%",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::GtEq | Operator::Lt | Operator::LtEq | Operator::Equals | Operator::Neq
        )
    }
}

/// Leaf of an expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    /// A variable, object or fluent name given as a bare symbol.
    Symbol(Sym),
    /// Application of a fluent, e.g. `(battery ?r)`.
    Fluent(FluentRef),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{}", fmt_real(*r)),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Fluent(fl) => write!(f, "{fl}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<FluentRef> for Value {
    fn from(value: FluentRef) -> Self {
        Value::Fluent(value)
    }
}

/// A binary expression tree: a node is either a leaf value or an operator applied to two children.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Leaf(Value),
    Node {
        operator: Operator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn leaf(value: impl Into<Value>) -> Expression {
        Expression::Leaf(value.into())
    }

    pub fn symbol(name: impl Into<Sym>) -> Expression {
        Expression::Leaf(Value::Symbol(name.into()))
    }

    pub fn node(operator: Operator, left: Expression, right: Expression) -> Expression {
        Expression::Node {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Expression::Leaf(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Expression::Leaf(v) => Some(v),
            Expression::Node { .. } => None,
        }
    }

    pub fn operator(&self) -> Option<Operator> {
        match self {
            Expression::Leaf(_) => None,
            Expression::Node { operator, .. } => Some(*operator),
        }
    }

    pub fn children(&self) -> Option<(&Expression, &Expression)> {
        match self {
            Expression::Leaf(_) => None,
            Expression::Node { left, right, .. } => Some((left, right)),
        }
    }

    /// Symbols appearing as leaves of the tree, without duplicates and in order of first appearance.
    /// Fluent arguments are not considered.
    pub fn get_variables(&self) -> Vec<Sym> {
        let mut vars = Vec::new();
        self.visit_leaves(&mut |v| {
            if let Value::Symbol(s) = v {
                if !vars.contains(s) {
                    vars.push(s.clone());
                }
            }
        });
        vars
    }

    pub fn visit_leaves(&self, f: &mut impl FnMut(&Value)) {
        match self {
            Expression::Leaf(v) => f(v),
            Expression::Node { left, right, .. } => {
                left.visit_leaves(f);
                right.visit_leaves(f);
            }
        }
    }

    /// All symbols referenced by the expression, including fluent arguments.
    pub(crate) fn collect_symbols(&self, out: &mut Vec<Sym>) {
        self.visit_leaves(&mut |v| match v {
            Value::Symbol(s) => out.push(s.clone()),
            Value::Fluent(fl) => out.extend(fl.args.iter().map(|t| t.symbol().clone())),
            Value::Int(_) | Value::Real(_) => {}
        })
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Leaf(v) => write!(f, "{v}"),
            Expression::Node { operator, left, right } => write!(f, "({operator} {left} {right})"),
        }
    }
}

/// Update rule of a process: an expression together with the symbols it reads.
#[derive(Clone, Debug, PartialEq)]
pub struct Equation {
    expression: Expression,
    variables: Vec<Sym>,
}

impl Equation {
    /// Builds an equation over the symbols found in `expression`, which must reference at least one.
    pub fn new(expression: Expression) -> Result<Equation, InvariantError> {
        let variables = expression.get_variables();
        Self::with_variables(variables, expression)
    }

    pub fn with_variables(variables: Vec<Sym>, expression: Expression) -> Result<Equation, InvariantError> {
        if variables.is_empty() {
            return Err(InvariantError::new(
                "equation",
                format!("`{expression}` does not depend on any variable"),
            ));
        }
        Ok(Equation { expression, variables })
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn variables(&self) -> &[Sym] {
        &self.variables
    }
}

impl Display for Equation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} over [", self.expression)?;
        crate::utils::disp_slice(f, &self.variables, ", ")?;
        write!(f, "]")
    }
}
