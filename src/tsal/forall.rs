//! Elimination of universally quantified effects.
//!
//! An effect `(forall (?v) (when C E))` of an action is replaced by a marker literal `forall<n>`.
//! A companion event `<n>forall`, taking the action's parameters and the quantified variables,
//! applies `E` to every binding satisfying `C` for which the marker does not hold yet, and sets the marker.
//! The marker is parameterized by the action parameters the quantified part depends on.
use crate::effects::Outcome;
use crate::*;

/// Name of the marker predicate of the `n`-th eliminated quantifier.
pub fn marker_name(n: u32) -> String {
    format!("forall{n}")
}

/// Name of the companion event of the `n`-th eliminated quantifier.
pub fn event_name(n: u32) -> String {
    format!("{n}forall")
}

/// Content of a `forall` effect: quantified variables, condition (possibly empty) and effect.
pub struct Quantified {
    pub variables: Vec<Term>,
    pub condition: Vec<Condition>,
    pub effect: Outcome,
}

/// Artifacts of the elimination of a single quantifier.
pub struct Elimination {
    /// Declaration of the marker predicate, with typed parameters.
    pub marker: Predicate,
    /// Companion event applying the quantified effect.
    pub event: Event,
    /// Effect replacing the quantified effect in the action.
    pub trigger: ProbEffect,
}

pub fn eliminate(session: &mut ParseSession, parameters: &[Term], quantified: Quantified) -> Elimination {
    let n = session.next_forall();
    let Quantified {
        variables,
        condition,
        effect,
    } = quantified;

    let mut mentioned = Vec::new();
    for c in &condition {
        c.collect_symbols(&mut mentioned);
    }
    for e in &effect {
        e.atom.collect_symbols(&mut mentioned);
    }

    // action parameters the quantified part depends on, in declaration order
    let free: Vec<&Term> = parameters
        .iter()
        .filter(|p| mentioned.iter().any(|s| p.same_symbol(s)))
        .filter(|p| !variables.iter().any(|v| v.same_symbol(p.symbol())))
        .collect();

    let marker = Predicate::new(marker_name(n), free.iter().map(|p| (*p).clone()));
    let marker_use = marker.untyped();

    // the quantified variables shadow the parameters with the same name
    let mut event_params: Vec<Term> = parameters
        .iter()
        .map(|p| {
            variables
                .iter()
                .find(|v| v.same_symbol(p.symbol()))
                .unwrap_or(p)
                .clone()
        })
        .collect();
    for v in &variables {
        if !event_params.iter().any(|p| p.same_symbol(v.symbol())) {
            event_params.push(v.clone());
        }
    }

    let mut preconditions = condition;
    preconditions.push(Condition::Literal(Literal::negative(marker_use.clone())));
    let mut event_effect = effect;
    event_effect.push(ProbEffect::certain(Literal::positive(marker_use.clone())));
    let event = session.event(
        event_name(n),
        event_params,
        preconditions,
        Effects::Deterministic(event_effect),
    );

    tracing::debug!(
        marker = %marker,
        event = %event.name,
        "eliminated quantified effect"
    );

    Elimination {
        marker,
        event,
        trigger: ProbEffect::certain(Literal::positive(marker_use)),
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::ErrorKind;
    use crate::*;

    const DOMAIN: &str = "(define (domain d)
        (:types block)
        (:predicates (clear ?x) (on ?x ?y))
        (:actions
            (:action a
                :parameters (?x - block ?y - block)
                :precondition ()
                :effect (and (forall (?z - block) (when (clear ?z) (on ?z ?x))) (clear ?y)))))";

    fn p(name: &str, args: &[&str]) -> Predicate {
        Predicate::new(name, args.iter().map(|a| Term::from_symbol(Sym::from(*a), None)))
    }

    #[test]
    fn forall_is_compiled_into_a_marker_and_an_event() -> Res<()> {
        let dom = parse_domain(DOMAIN)?;

        // marker declaration, parameterized by the free action parameter ?x
        let marker = dom.get_predicate("forall0").unwrap();
        assert_eq!(marker.args.as_slice(), &[Term::variable("?x", Some("block".into()))]);

        // the action sets the marker
        let Effects::Deterministic(eff) = &dom.actions[0].effects else {
            panic!("expected a deterministic effect")
        };
        assert_eq!(
            eff,
            &vec![
                ProbEffect::certain(Literal::positive(p("forall0", &["?x"]))),
                ProbEffect::certain(Literal::positive(p("clear", &["?y"]))),
            ]
        );

        // the companion event applies the quantified effect
        let ev = dom.get_event("0forall").unwrap();
        assert_eq!(
            ev.parameters,
            vec![
                Term::variable("?x", Some("block".into())),
                Term::variable("?y", Some("block".into())),
                Term::variable("?z", Some("block".into())),
            ]
        );
        assert_eq!(
            ev.preconditions,
            vec![
                Condition::Literal(Literal::positive(p("clear", &["?z"]))),
                Condition::Literal(Literal::negative(p("forall0", &["?x"]))),
            ]
        );
        assert_eq!(
            ev.effects,
            Effects::Deterministic(vec![
                ProbEffect::certain(Literal::positive(p("on", &["?z", "?x"]))),
                ProbEffect::certain(Literal::positive(p("forall0", &["?x"]))),
            ])
        );
        Ok(())
    }

    #[test]
    fn quantified_variables_shadow_parameters() -> Res<()> {
        let dom = parse_domain(
            "(define (domain d) (:actions (:action a :parameters (?x ?y) :precondition () \
             :effect (forall (?y) (on ?x ?y)))))",
        )?;
        let ev = dom.get_event("0forall").unwrap();
        assert_eq!(ev.parameters, vec![Term::variable("?x", None), Term::variable("?y", None)]);
        // no condition: only the negated marker
        assert_eq!(ev.preconditions.len(), 1);
        assert_eq!(dom.get_predicate("forall0").unwrap().arity(), 1);
        Ok(())
    }

    #[test]
    fn numbering_is_per_session() -> Res<()> {
        let two = "(define (domain d) (:actions \
            (:action a :parameters (?x) :precondition () :effect (forall (?z) (p ?z))) \
            (:action b :parameters (?x) :precondition () :effect (forall (?z) (q ?z)))))";
        let mut session = ParseSession::new();
        let dom = session.parse_domain(two)?;
        assert!(dom.get_event("0forall").is_some());
        assert!(dom.get_event("1forall").is_some());
        // same session: numbering goes on
        let again = session.parse_domain(two)?;
        assert!(again.get_event("2forall").is_some());
        // fresh session: numbering restarts
        assert_eq!(parse_domain(two)?, dom);
        Ok(())
    }

    #[test]
    fn nested_forall_is_rejected() {
        let nested = "(define (domain d) (:actions (:action a :parameters (?x) :precondition () \
            :effect (forall (?y) (forall (?z) (on ?y ?z))))))";
        let err = parse_domain(nested).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Unsupported(_)));

        // same through a conditional body
        let nested_when = "(define (domain d) (:actions (:action a :parameters (?x) :precondition () \
            :effect (forall (?y) (when (p ?y) (and (q ?y) (forall (?z) (on ?y ?z))))))))";
        assert!(matches!(parse_domain(nested_when).unwrap_err().kind(), ErrorKind::Unsupported(_)));

        // sibling quantifiers remain fine
        let siblings = "(define (domain d) (:actions (:action a :parameters (?x) :precondition () \
            :effect (and (forall (?y) (p ?y)) (forall (?z) (q ?z))))))";
        assert!(parse_domain(siblings).is_ok());
    }
}
