use std::fmt::{Display, Formatter};

use derive_more::derive::Display;

use crate::conditions::Condition;
use crate::effects::Effects;
use crate::expressions::Expression;
use crate::utils::disp_slice;
use crate::{Sym, Term};

/// Identity of an action or event, assigned by the [`ParseSession`](crate::ParseSession) that created it.
///
/// Actions and events are numbered independently, starting from 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("#{_0}")]
pub struct OperatorId(pub(crate) u32);

impl OperatorId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Frequency of an exogenous event, e.g. `(exponential mean 3.5)`.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyDistribution {
    pub name: Sym,
    pub qualifier: Sym,
    pub value: f64,
    pub extra_args: Vec<Sym>,
}

impl Display for FrequencyDistribution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({} = {}", self.name, self.qualifier, self.value)?;
        for extra in &self.extra_args {
            write!(f, ", {extra}")?;
        }
        write!(f, ")")
    }
}

/// An operator under the control of the agent.
///
/// Equality is structural and ignores the identity of the action.
#[derive(Clone, Debug)]
pub struct Action {
    id: OperatorId,
    pub name: Sym,
    pub parameters: Vec<Term>,
    pub preconditions: Vec<Condition>,
    pub effects: Effects,
    pub duration: Option<Expression>,
}

impl Action {
    pub(crate) fn new(
        id: OperatorId,
        name: Sym,
        parameters: Vec<Term>,
        preconditions: Vec<Condition>,
        effects: Effects,
    ) -> Self {
        Action {
            id,
            name,
            parameters,
            preconditions,
            effects,
            duration: None,
        }
    }

    pub fn id(&self) -> OperatorId {
        self.id
    }

    pub fn with_duration(mut self, duration: Expression) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn set_parameters(&mut self, parameters: Vec<Term>) {
        self.parameters = parameters;
    }

    pub fn set_preconditions(&mut self, preconditions: Vec<Condition>) {
        self.preconditions = preconditions;
    }

    pub fn set_effects(&mut self, effects: Effects) {
        self.effects = effects;
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parameters == other.parameters
            && self.preconditions == other.preconditions
            && self.effects == other.effects
            && self.duration == other.duration
    }
}

/// An exogenous operator, triggered by the environment.
///
/// Equality is structural and ignores the identity of the event.
#[derive(Clone, Debug)]
pub struct Event {
    id: OperatorId,
    pub name: Sym,
    pub parameters: Vec<Term>,
    pub preconditions: Vec<Condition>,
    pub effects: Effects,
    pub duration: Option<Expression>,
    pub distribution: Option<FrequencyDistribution>,
}

impl Event {
    pub(crate) fn new(
        id: OperatorId,
        name: Sym,
        parameters: Vec<Term>,
        preconditions: Vec<Condition>,
        effects: Effects,
    ) -> Self {
        Event {
            id,
            name,
            parameters,
            preconditions,
            effects,
            duration: None,
            distribution: None,
        }
    }

    pub fn id(&self) -> OperatorId {
        self.id
    }

    pub fn with_duration(mut self, duration: Expression) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_distribution(mut self, distribution: FrequencyDistribution) -> Self {
        self.distribution = Some(distribution);
        self
    }

    pub fn set_parameters(&mut self, parameters: Vec<Term>) {
        self.parameters = parameters;
    }

    pub fn set_preconditions(&mut self, preconditions: Vec<Condition>) {
        self.preconditions = preconditions;
    }

    pub fn set_effects(&mut self, effects: Effects) {
        self.effects = effects;
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parameters == other.parameters
            && self.preconditions == other.preconditions
            && self.effects == other.effects
            && self.duration == other.duration
            && self.distribution == other.distribution
    }
}

fn fmt_operator(
    f: &mut Formatter<'_>,
    name: &Sym,
    parameters: &[Term],
    duration: Option<&Expression>,
    preconditions: &[Condition],
    effects: &Effects,
) -> std::fmt::Result {
    write!(f, "{name}(")?;
    disp_slice(f, parameters, ", ")?;
    write!(f, ")")?;
    if let Some(duration) = duration {
        write!(f, "\n    duration: {duration}")?;
    }
    write!(f, "\n    preconditions:\n      ")?;
    disp_slice(f, preconditions, "\n      ")?;
    write!(f, "\n    effects: {effects}")
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_operator(
            f,
            &self.name,
            &self.parameters,
            self.duration.as_ref(),
            &self.preconditions,
            &self.effects,
        )
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_operator(
            f,
            &self.name,
            &self.parameters,
            self.duration.as_ref(),
            &self.preconditions,
            &self.effects,
        )?;
        if let Some(distribution) = &self.distribution {
            write!(f, "\n    frequency: {distribution}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn identity_is_not_compared() {
        let mut session = ParseSession::new();
        let params = vec![Term::variable("?x", Some("block".into()))];
        let a = session.action("pick", params.clone(), vec![], Effects::default());
        let b = session.action("pick", params, vec![], Effects::default());
        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn actions_and_events_are_numbered_independently() {
        let mut session = ParseSession::new();
        let a1 = session.action("a", vec![], vec![], Effects::default());
        let e1 = session.event("e", vec![], vec![], Effects::default());
        let a2 = session.action("b", vec![], vec![], Effects::default());
        assert_eq!(a1.id().index(), 1);
        assert_eq!(e1.id().index(), 1);
        assert_eq!(a2.id().index(), 2);
    }

    #[test]
    fn frequency_display() {
        let distribution = FrequencyDistribution {
            name: "exponential".into(),
            qualifier: "mean".into(),
            value: 3.5,
            extra_args: vec!["hourly".into()],
        };
        assert_eq!(distribution.to_string(), "exponential(mean = 3.5, hourly)");
    }
}
