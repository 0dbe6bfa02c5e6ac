use std::sync::Arc;

use crate::actions::{Action, Event, OperatorId};
use crate::conditions::Condition;
use crate::domain::Domain;
use crate::effects::Effects;
use crate::errors::{Message, Res};
use crate::problem::Problem;
use crate::tsal::input::Input;
use crate::tsal::parser;
use crate::{Sym, Term};

/// Result of parsing a source unit: a domain, a problem, or a domain followed by a problem.
#[derive(Clone, Debug, PartialEq)]
pub enum Parsed {
    Domain(Domain),
    Problem(Problem),
    Both(Domain, Problem),
}

impl Parsed {
    pub fn domain(&self) -> Option<&Domain> {
        match self {
            Parsed::Domain(d) | Parsed::Both(d, _) => Some(d),
            Parsed::Problem(_) => None,
        }
    }

    pub fn problem(&self) -> Option<&Problem> {
        match self {
            Parsed::Problem(p) | Parsed::Both(_, p) => Some(p),
            Parsed::Domain(_) => None,
        }
    }
}

/// State shared by all parses made in one session: operator identities,
/// the counter naming quantifier-elimination artifacts and the lexer diagnostics.
///
/// Two sessions never share state, so parsing the same text in two fresh sessions gives identical results.
#[derive(Default)]
pub struct ParseSession {
    last_action: u32,
    last_event: u32,
    next_forall: u32,
    diagnostics: Vec<Message>,
}

impl ParseSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new action, with a fresh identity.
    pub fn action(
        &mut self,
        name: impl Into<Sym>,
        parameters: Vec<Term>,
        preconditions: Vec<Condition>,
        effects: Effects,
    ) -> Action {
        self.last_action += 1;
        Action::new(
            OperatorId(self.last_action),
            name.into(),
            parameters,
            preconditions,
            effects,
        )
    }

    /// Creates a new event, with a fresh identity.
    pub fn event(
        &mut self,
        name: impl Into<Sym>,
        parameters: Vec<Term>,
        preconditions: Vec<Condition>,
        effects: Effects,
    ) -> Event {
        self.last_event += 1;
        Event::new(
            OperatorId(self.last_event),
            name.into(),
            parameters,
            preconditions,
            effects,
        )
    }

    /// Index of the next eliminated quantifier, starting from 0.
    pub(crate) fn next_forall(&mut self) -> u32 {
        let n = self.next_forall;
        self.next_forall += 1;
        n
    }

    /// Warnings accumulated by the lexer (illegal characters that were skipped).
    pub fn diagnostics(&self) -> &[Message] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Message> {
        self.diagnostics
    }

    pub(crate) fn report(&mut self, diagnostics: impl IntoIterator<Item = Message>) {
        self.diagnostics.extend(diagnostics)
    }

    pub fn parse_domain(&mut self, input: impl Into<Input>) -> Res<Domain> {
        parser::read_domain_unit(self, Arc::new(input.into()))
    }

    pub fn parse_problem(&mut self, input: impl Into<Input>) -> Res<Problem> {
        parser::read_problem_unit(self, Arc::new(input.into()))
    }

    pub fn parse(&mut self, input: impl Into<Input>) -> Res<Parsed> {
        parser::read_unit(self, Arc::new(input.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_increase() {
        let mut session = ParseSession::new();
        let ids: Vec<_> = (0..5)
            .map(|i| session.action(format!("a{i}"), vec![], vec![], Effects::default()).id())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(session.next_forall(), 0);
        assert_eq!(session.next_forall(), 1);
    }

    #[test]
    fn sessions_are_independent() -> Res<()> {
        let text = "(define (domain d) (:actions (:action a :parameters () :precondition () :effect (p))))";
        let d1 = ParseSession::new().parse_domain(text)?;
        let d2 = ParseSession::new().parse_domain(text)?;
        assert_eq!(d1.actions[0].id(), d2.actions[0].id());
        assert_eq!(d1, d2);
        Ok(())
    }
}
