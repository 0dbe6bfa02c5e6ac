use std::fmt::{Display, Error, Formatter};

use crate::actions::{Action, Event};
use crate::fluents::{Fluent, Process};
use crate::predicates::{DerivedPredicate, Predicate};
use crate::types::TypeHierarchy;
use crate::utils::disp_slice;
use crate::{Sym, Term};

/// A planning domain.
#[derive(Clone, Debug, PartialEq)]
pub struct Domain {
    pub name: Sym,
    /// Requirement flags, without their leading colon (e.g. `strips`).
    pub requirements: Vec<Sym>,
    pub types: TypeHierarchy,
    pub constants: Vec<Term>,
    pub predicates: Vec<Predicate>,
    pub fluents: Vec<Fluent>,
    pub derived_predicates: Vec<DerivedPredicate>,
    pub processes: Vec<Process>,
    pub actions: Vec<Action>,
    pub events: Vec<Event>,
}

impl Domain {
    pub fn new(name: impl Into<Sym>) -> Domain {
        Domain {
            name: name.into(),
            requirements: Vec::new(),
            types: TypeHierarchy::new(),
            constants: Vec::new(),
            predicates: Vec::new(),
            fluents: Vec::new(),
            derived_predicates: Vec::new(),
            processes: Vec::new(),
            actions: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn add_requirement(&mut self, requirement: impl Into<Sym>) {
        self.requirements.push(requirement.into())
    }

    pub fn add_type(&mut self, name: impl Into<Sym>, parent: Option<Sym>) {
        self.types.add_type(name, parent)
    }

    pub fn add_constant(&mut self, constant: Term) {
        self.constants.push(constant)
    }

    pub fn add_predicate(&mut self, predicate: Predicate) {
        self.predicates.push(predicate)
    }

    /// Removes the predicate with the given name and arity, returning it if it was declared.
    pub fn remove_predicate(&mut self, name: &str, arity: usize) -> Option<Predicate> {
        let idx = self
            .predicates
            .iter()
            .position(|p| p.name == name && p.arity() == arity)?;
        Some(self.predicates.remove(idx))
    }

    pub fn get_predicate(&self, name: &str) -> Option<&Predicate> {
        self.predicates.iter().find(|p| p.name == name)
    }

    pub fn add_fluent(&mut self, fluent: Fluent) {
        self.fluents.push(fluent)
    }

    pub fn get_fluent(&self, name: &str) -> Option<&Fluent> {
        self.fluents.iter().find(|f| f.name == name)
    }

    pub fn add_derived_predicate(&mut self, derived: DerivedPredicate) {
        self.derived_predicates.push(derived)
    }

    pub fn add_process(&mut self, process: Process) {
        self.processes.push(process)
    }

    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action)
    }

    pub fn get_action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn get_action_mut(&mut self, name: &str) -> Option<&mut Action> {
        self.actions.iter_mut().find(|a| a.name == name)
    }

    pub fn add_event(&mut self, event: Event) {
        self.events.push(event)
    }

    pub fn get_event(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name == name)
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "# Domain : {}", self.name)?;
        write!(f, "\n# Requirements \n  ")?;
        disp_slice(f, &self.requirements, " ")?;
        write!(f, "\n# Types \n  ")?;
        write!(f, "{}", self.types.to_string().replace('\n', "\n  "))?;
        write!(f, "\n# Constants \n  ")?;
        disp_slice(f, &self.constants, "\n  ")?;
        write!(f, "\n# Predicates \n  ")?;
        disp_slice(f, &self.predicates, "\n  ")?;
        write!(f, "\n# Fluents \n  ")?;
        disp_slice(f, &self.fluents, "\n  ")?;
        write!(f, "\n# Derived predicates \n  ")?;
        disp_slice(f, &self.derived_predicates, "\n  ")?;
        write!(f, "\n# Processes \n  ")?;
        disp_slice(f, &self.processes, "\n  ")?;
        write!(f, "\n# Actions \n  ")?;
        disp_slice(f, &self.actions, "\n  ")?;
        write!(f, "\n# Events \n  ")?;
        disp_slice(f, &self.events, "\n  ")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn building() {
        let mut session = ParseSession::new();
        let mut dom = Domain::new("blocks");
        dom.add_type("block", None);
        dom.add_predicate(Predicate::new("clear", [Term::variable("?x", Some("block".into()))]));
        dom.add_predicate(Predicate::new("clear", []));
        let pick = session.action("pick", vec![], vec![], Effects::default());
        dom.add_action(pick);

        assert!(dom.types.contains("block"));
        let removed = dom.remove_predicate("clear", 0).unwrap();
        assert_eq!(removed.arity(), 0);
        assert_eq!(dom.predicates.len(), 1);
        assert!(dom.remove_predicate("clear", 3).is_none());

        let x = Term::variable("?x", Some("block".into()));
        dom.get_action_mut("pick").unwrap().set_parameters(vec![x.clone()]);
        assert_eq!(dom.get_action("pick").unwrap().parameters, vec![x]);
        assert!(dom.to_string().starts_with("# Domain : blocks"));
    }
}
