use std::collections::BTreeMap;
use std::fmt::{Display, Error, Formatter};

use derive_more::derive::Display;

use crate::conditions::Condition;
use crate::errors::{InvariantError, ValidationError};
use crate::expressions::{Expression, Operator, Value};
use crate::fluents::FluentRef;
use crate::predicates::{Literal, Predicate};
use crate::types::OBJECT;
use crate::utils::{disp_slice, fmt_real};
use crate::{Sym, Term};

/// Name of the predicate (or nullary fluent) designating the agent that owns a problem.
pub const SELF: &str = "self";

/// Fluent minimized when a problem declares no metric.
pub const PLAN_LENGTH: &str = "plan-length";

/// An entry of the initial state.
#[derive(Clone, Debug, PartialEq, Display)]
pub enum InitEntry {
    /// A ground predicate that holds initially.
    Fact(Predicate),
    /// Initial value of a ground fluent: `(= (f a b) 3)`.
    #[display("{fluent} := {value}")]
    Assign { fluent: FluentRef, value: Value },
}

impl InitEntry {
    /// The agent designated by this entry, if it is a `self` marker: `(= (self) a)` or `(self a)`.
    pub fn self_agent(&self) -> Option<&Sym> {
        match self {
            InitEntry::Assign {
                fluent,
                value: Value::Symbol(agent),
            } if fluent.name == SELF && fluent.args.is_empty() => Some(agent),
            InitEntry::Fact(p) if p.name == SELF && p.arity() == 1 => Some(p.args[0].symbol()),
            _ => None,
        }
    }
}

/// A literal that starts to hold at an absolute time.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedLiteral {
    pub literal: Literal,
    pub time: f64,
}

impl TimedLiteral {
    pub fn new(literal: Literal, time: f64) -> Result<TimedLiteral, InvariantError> {
        if !time.is_finite() || time < 0.0 {
            return Err(InvariantError::new(
                "timed literal",
                format!("time {time} is not a non-negative number"),
            ));
        }
        Ok(TimedLiteral { literal, time })
    }
}

impl Display for TimedLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", fmt_real(self.time), self.literal)
    }
}

/// Goals of a problem, partitioned by agent.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Goals {
    /// Goal of the agent owning the problem.
    pub own: Vec<Condition>,
    /// Goals of the other agents, by agent name.
    pub others: BTreeMap<Sym, Vec<Condition>>,
}

impl Goals {
    /// Partitions goal conjunctions according to their agent tag (`(= (self) agent)`).
    ///
    /// Each conjunction must be tagged with exactly one agent and each agent may only have one goal.
    pub fn partition(conjunctions: Vec<Vec<Condition>>, owner: &Sym) -> Result<Goals, ValidationError> {
        let mut own = None;
        let mut others = BTreeMap::new();
        for (index, conjunction) in conjunctions.into_iter().enumerate() {
            let agent = {
                let mut tags = conjunction.iter().filter_map(agent_tag);
                let agent = tags.next().ok_or(ValidationError::MissingAgentTag { index })?;
                if tags.next().is_some() {
                    return Err(ValidationError::AmbiguousAgentTag { index });
                }
                agent.clone()
            };
            if &agent == owner {
                if own.replace(conjunction).is_some() {
                    return Err(ValidationError::DuplicateAgentGoal(agent));
                }
            } else if others.insert(agent.clone(), conjunction).is_some() {
                return Err(ValidationError::DuplicateAgentGoal(agent));
            }
        }
        Ok(Goals {
            own: own.unwrap_or_default(),
            others,
        })
    }

    /// All goal conjunctions, the owner's first.
    pub fn conjunctions(&self) -> impl Iterator<Item = &[Condition]> + '_ {
        std::iter::once(self.own.as_slice())
            .filter(|c| !c.is_empty())
            .chain(self.others.values().map(|c| c.as_slice()))
    }
}

/// If the condition is an agent tag `(= (self) agent)`, returns the agent.
pub fn agent_tag(condition: &Condition) -> Option<&Sym> {
    let Condition::Expression(Expression::Node {
        operator: Operator::Equals,
        left,
        right,
    }) = condition
    else {
        return None;
    };
    let names_self = match left.value()? {
        Value::Fluent(f) => f.name == SELF && f.args.is_empty(),
        Value::Symbol(s) => s == SELF,
        _ => false,
    };
    match right.value()? {
        Value::Symbol(agent) if names_self => Some(agent),
        _ => None,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum MetricDirection {
    #[display("minimize")]
    Minimize,
    #[display("maximize")]
    Maximize,
}

/// Quantity to optimize.
#[derive(Clone, Debug, PartialEq, Display)]
#[display("{direction} {fluent}")]
pub struct Metric {
    pub direction: MetricDirection,
    pub fluent: FluentRef,
}

impl Default for Metric {
    fn default() -> Self {
        Metric {
            direction: MetricDirection::Minimize,
            fluent: FluentRef::new(PLAN_LENGTH, []),
        }
    }
}

impl Metric {
    pub fn is_default(&self) -> bool {
        *self == Metric::default()
    }
}

/// A planning problem, owned by a single agent (see [`Problem::agent`]).
#[derive(Clone, Debug, PartialEq)]
pub struct Problem {
    pub name: Sym,
    pub domain_name: Sym,
    pub objects: Vec<Term>,
    pub init: Vec<InitEntry>,
    pub timed_init: Vec<TimedLiteral>,
    pub goals: Goals,
    pub metric: Metric,
}

impl Problem {
    pub fn new(name: impl Into<Sym>, domain_name: impl Into<Sym>) -> Problem {
        Problem {
            name: name.into(),
            domain_name: domain_name.into(),
            objects: Vec::new(),
            init: Vec::new(),
            timed_init: Vec::new(),
            goals: Goals::default(),
            metric: Metric::default(),
        }
    }

    pub fn add_object(&mut self, object: Term) {
        self.objects.push(object)
    }

    pub fn add_init(&mut self, entry: InitEntry) {
        self.init.push(entry)
    }

    pub fn add_timed_literal(&mut self, timed: TimedLiteral) {
        self.timed_init.push(timed)
    }

    /// The agent owning the problem, declared by the single `self` entry of the initial state.
    pub fn agent(&self) -> Result<&Sym, ValidationError> {
        let mut agents = self.init.iter().filter_map(InitEntry::self_agent);
        let agent = agents.next().ok_or(ValidationError::MissingSelf)?;
        match agents.next() {
            Some(other) => Err(ValidationError::DuplicateSelf(agent.clone(), other.clone())),
            None => Ok(agent),
        }
    }

    /// Replaces the goals of the problem by the given conjunctions, partitioned by agent.
    pub fn set_goals(&mut self, conjunctions: Vec<Vec<Condition>>) -> Result<(), ValidationError> {
        let owner = self.agent()?.clone();
        self.goals = Goals::partition(conjunctions, &owner)?;
        Ok(())
    }

    /// Objects grouped by type, untyped objects being of type `object`.
    pub fn objects_by_type(&self) -> BTreeMap<Sym, Vec<Sym>> {
        let mut by_type: BTreeMap<Sym, Vec<Sym>> = BTreeMap::new();
        for o in &self.objects {
            let tpe = o.tpe().cloned().unwrap_or_else(|| Sym::from(OBJECT));
            by_type.entry(tpe).or_default().push(o.symbol().clone());
        }
        by_type
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "# Problem : {} (domain {})", self.name, self.domain_name)?;
        write!(f, "\n# Objects \n  ")?;
        disp_slice(f, &self.objects, "\n  ")?;
        write!(f, "\n# Initial state \n  ")?;
        disp_slice(f, &self.init, "\n  ")?;
        write!(f, "\n# Timed literals \n  ")?;
        disp_slice(f, &self.timed_init, "\n  ")?;
        write!(f, "\n# Goal \n  ")?;
        disp_slice(f, &self.goals.own, " & ")?;
        for (agent, goal) in &self.goals.others {
            write!(f, "\n# Goal of {agent} \n  ")?;
            disp_slice(f, goal, " & ")?;
        }
        write!(f, "\n# Metric \n  {}", self.metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(agent: &str) -> Condition {
        Condition::Expression(Expression::node(
            Operator::Equals,
            Expression::leaf(FluentRef::new(SELF, [])),
            Expression::symbol(agent),
        ))
    }

    fn fact(name: &str) -> Condition {
        Condition::Literal(Literal::positive(Predicate::new(name, [])))
    }

    fn owned_by(agent: &str) -> Problem {
        let mut pb = Problem::new("p", "d");
        pb.add_init(InitEntry::Assign {
            fluent: FluentRef::new(SELF, []),
            value: Value::Symbol(agent.into()),
        });
        pb
    }

    #[test]
    fn goals_are_partitioned_by_agent() {
        let mut pb = owned_by("self-agent");
        pb.set_goals(vec![
            vec![tag("self-agent"), fact("done")],
            vec![fact("rich"), tag("bob")],
        ])
        .unwrap();
        assert_eq!(pb.goals.own, vec![tag("self-agent"), fact("done")]);
        assert_eq!(pb.goals.others.len(), 1);
        assert_eq!(pb.goals.others[&Sym::from("bob")], vec![fact("rich"), tag("bob")]);
        assert_eq!(pb.goals.conjunctions().count(), 2);
    }

    #[test]
    fn untagged_goals_are_rejected() {
        let mut pb = owned_by("alice");
        assert_eq!(
            pb.set_goals(vec![vec![fact("done")]]),
            Err(ValidationError::MissingAgentTag { index: 0 })
        );
        assert_eq!(
            pb.set_goals(vec![vec![tag("alice"), tag("bob")]]),
            Err(ValidationError::AmbiguousAgentTag { index: 0 })
        );
        assert_eq!(
            pb.set_goals(vec![vec![tag("bob")], vec![tag("bob"), fact("x")]]),
            Err(ValidationError::DuplicateAgentGoal("bob".into()))
        );
    }

    #[test]
    fn exactly_one_self() {
        let mut pb = Problem::new("p", "d");
        assert_eq!(pb.agent(), Err(ValidationError::MissingSelf));
        pb.add_init(InitEntry::Fact(Predicate::new(SELF, [Term::constant("alice", None)])));
        assert_eq!(pb.agent().unwrap(), "alice");
        pb.add_init(InitEntry::Assign {
            fluent: FluentRef::new(SELF, []),
            value: Value::Symbol("bob".into()),
        });
        assert_eq!(
            pb.agent(),
            Err(ValidationError::DuplicateSelf("alice".into(), "bob".into()))
        );
    }

    #[test]
    fn timed_literals_are_not_in_the_past() {
        let lit = Literal::positive(Predicate::new("open", []));
        assert!(TimedLiteral::new(lit.clone(), 10.0).is_ok());
        assert!(TimedLiteral::new(lit, -1.0).is_err());
    }

    #[test]
    fn objects_grouped_by_type() {
        let mut pb = Problem::new("p", "d");
        pb.add_object(Term::constant("a", Some("block".into())));
        pb.add_object(Term::constant("b", Some("block".into())));
        pb.add_object(Term::constant("t", None));
        let by_type = pb.objects_by_type();
        assert_eq!(by_type[&Sym::from("block")].len(), 2);
        assert_eq!(by_type[&Sym::from(OBJECT)], vec![Sym::from("t")]);
        assert!(pb.metric.is_default());
    }
}
