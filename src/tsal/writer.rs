//! Canonical TSAL text for domains and problems.
//!
//! The output is tab-indented, with one entity per line in each section, and parses back
//! into a structurally equal model.
use std::fmt::Write;

use itertools::Itertools;

use crate::errors::SerializeError;
use crate::expressions::Value;
use crate::problem::{InitEntry, TimedLiteral};
use crate::types::{OBJECT, TypeHierarchy};
use crate::utils::fmt_real;
use crate::*;

type Written = Result<(), SerializeError>;

/// Serialization to canonical TSAL text.
pub trait ToTsal {
    fn write_tsal(&self, out: &mut String) -> Written;

    fn to_tsal(&self) -> Result<String, SerializeError> {
        let mut out = String::new();
        self.write_tsal(&mut out)?;
        Ok(out)
    }
}

/// Writes `items` as a typed list `a b - t c - u d`. Consecutive items sharing a type are grouped,
/// and an untyped group followed by a typed one is written as `- object`.
fn write_typed_list<'a>(out: &mut String, items: impl IntoIterator<Item = (&'a Sym, Option<&'a Sym>)>) -> Written {
    let items: Vec<_> = items.into_iter().collect();
    let groups: Vec<_> = items.chunk_by(|a, b| a.1 == b.1).collect();
    let num_groups = groups.len();
    for (i, group) in groups.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&group.iter().map(|(name, _)| name).join(" "));
        match group[0].1 {
            Some(tpe) => write!(out, " - {tpe}")?,
            None if i + 1 < num_groups => write!(out, " - {OBJECT}")?,
            None => {}
        }
    }
    Ok(())
}

fn write_terms(out: &mut String, terms: &[Term]) -> Written {
    write_typed_list(out, terms.iter().map(|t| (t.symbol(), t.tpe())))
}

/// `(name ?x - t ?y - t)`
fn write_declaration(out: &mut String, name: &Sym, args: &[Term]) -> Written {
    write!(out, "({name}")?;
    if !args.is_empty() {
        out.push(' ');
        write_terms(out, args)?;
    }
    out.push(')');
    Ok(())
}

fn write_types(out: &mut String, types: &TypeHierarchy) -> Written {
    let mut items: Vec<(&Sym, Option<&Sym>)> = Vec::new();
    for (parent, children) in types.iter() {
        items.extend(children.iter().map(|c| (c, Some(parent))));
    }
    // types declared on their own come last, they cannot be followed by typed ones
    for (tpe, children) in types.iter() {
        if children.is_empty() && tpe != OBJECT {
            items.push((tpe, None));
        }
    }
    write_typed_list(out, items)
}

impl ToTsal for Term {
    fn write_tsal(&self, out: &mut String) -> Written {
        write!(out, "{}", self.symbol())?;
        Ok(())
    }
}

/// `(name a b)`, or `(= a b)` for equality.
impl ToTsal for Predicate {
    fn write_tsal(&self, out: &mut String) -> Written {
        write!(out, "({}", self.name)?;
        for arg in &self.args {
            out.push(' ');
            arg.write_tsal(out)?;
        }
        out.push(')');
        Ok(())
    }
}

impl ToTsal for Literal {
    fn write_tsal(&self, out: &mut String) -> Written {
        if self.is_negative() {
            out.push_str("(not ");
            self.predicate.write_tsal(out)?;
            out.push(')');
            Ok(())
        } else {
            self.predicate.write_tsal(out)
        }
    }
}

impl ToTsal for FluentRef {
    fn write_tsal(&self, out: &mut String) -> Written {
        write!(out, "({}", self.name)?;
        for arg in &self.args {
            out.push(' ');
            arg.write_tsal(out)?;
        }
        out.push(')');
        Ok(())
    }
}

impl ToTsal for Value {
    fn write_tsal(&self, out: &mut String) -> Written {
        match self {
            Value::Int(i) => write!(out, "{i}")?,
            Value::Real(x) => out.push_str(&fmt_real(*x)),
            Value::Symbol(s) => write!(out, "{s}")?,
            Value::Fluent(f) => f.write_tsal(out)?,
        }
        Ok(())
    }
}

impl ToTsal for Expression {
    fn write_tsal(&self, out: &mut String) -> Written {
        match self {
            Expression::Leaf(v) => v.write_tsal(out),
            Expression::Node { operator, left, right } => {
                write!(out, "({operator} ")?;
                left.write_tsal(out)?;
                out.push(' ');
                right.write_tsal(out)?;
                out.push(')');
                Ok(())
            }
        }
    }
}

impl ToTsal for Condition {
    fn write_tsal(&self, out: &mut String) -> Written {
        match self {
            Condition::Literal(l) => l.write_tsal(out),
            Condition::Expression(e) => e.write_tsal(out),
            Condition::Or(disjuncts) => {
                out.push_str("(or");
                for d in disjuncts {
                    out.push(' ');
                    d.write_tsal(out)?;
                }
                out.push(')');
                Ok(())
            }
        }
    }
}

/// `()` or `(and c1 c2 ...)`
fn write_conjunction(out: &mut String, conditions: &[Condition]) -> Written {
    if conditions.is_empty() {
        out.push_str("()");
        return Ok(());
    }
    out.push_str("(and");
    for c in conditions {
        out.push(' ');
        c.write_tsal(out)?;
    }
    out.push(')');
    Ok(())
}

impl ToTsal for EffectAtom {
    fn write_tsal(&self, out: &mut String) -> Written {
        match self {
            EffectAtom::Literal(l) => l.write_tsal(out),
            EffectAtom::Expression(e) => e.write_tsal(out),
        }
    }
}

impl ToTsal for ProbEffect {
    fn write_tsal(&self, out: &mut String) -> Written {
        if self.is_certain() {
            self.atom.write_tsal(out)
        } else {
            write!(out, "(probabilistic {} ", fmt_real(self.probability))?;
            self.atom.write_tsal(out)?;
            out.push(')');
            Ok(())
        }
    }
}

/// A single effect is written on its own, several ones in a conjunction.
fn write_outcome(out: &mut String, outcome: &[ProbEffect]) -> Written {
    match outcome {
        [] => Err(SerializeError::EmptyEffect { owner: String::new() }),
        [single] => single.write_tsal(out),
        several => {
            out.push_str("(and");
            for e in several {
                out.push(' ');
                e.write_tsal(out)?;
            }
            out.push(')');
            Ok(())
        }
    }
}

fn write_labeled(out: &mut String, labeled: &LabeledOutcome, branch: usize) -> Written {
    if labeled.body.is_empty() {
        return Err(SerializeError::EmptyBranch {
            owner: String::new(),
            branch,
        });
    }
    write!(out, "({} ", labeled.label)?;
    write_outcome(out, &labeled.body)?;
    out.push(')');
    Ok(())
}

impl ToTsal for Effects {
    fn write_tsal(&self, out: &mut String) -> Written {
        match self {
            Effects::Deterministic(outcome) => write_outcome(out, outcome),
            Effects::Probabilistic(branches) => {
                out.push_str("(oneof");
                for (branch, outcome) in branches.iter().enumerate() {
                    if outcome.is_empty() {
                        return Err(SerializeError::EmptyBranch {
                            owner: String::new(),
                            branch,
                        });
                    }
                    out.push(' ');
                    write_outcome(out, outcome)?;
                }
                out.push(')');
                Ok(())
            }
            Effects::Labeled(outcomes) => match outcomes.as_slice() {
                [single] => write_labeled(out, single, 0),
                _ => {
                    out.push_str("(oneof");
                    for (branch, labeled) in outcomes.iter().enumerate() {
                        out.push(' ');
                        write_labeled(out, labeled, branch)?;
                    }
                    out.push(')');
                    Ok(())
                }
            },
        }
    }
}

/// `(x)` for a leaf, the expression itself otherwise.
fn write_duration(out: &mut String, duration: &Expression) -> Written {
    if duration.is_leaf() {
        out.push('(');
        duration.write_tsal(out)?;
        out.push(')');
        Ok(())
    } else {
        duration.write_tsal(out)
    }
}

impl ToTsal for FrequencyDistribution {
    fn write_tsal(&self, out: &mut String) -> Written {
        write!(out, "({} {} {}", self.name, self.qualifier, self.value)?;
        for extra in &self.extra_args {
            write!(out, " {extra}")?;
        }
        out.push(')');
        Ok(())
    }
}

/// Common layout of actions and events, each key on its own line.
struct OperatorView<'a> {
    keyword: &'static str,
    name: &'a Sym,
    parameters: &'a [Term],
    duration: Option<&'a Expression>,
    preconditions: &'a [Condition],
    distribution: Option<&'a FrequencyDistribution>,
    effects: &'a Effects,
}

impl OperatorView<'_> {
    fn write(&self, out: &mut String, indent: &str) -> Written {
        write!(out, "{indent}({} {}\n{indent}\t:parameters (", self.keyword, self.name)?;
        write_terms(out, self.parameters)?;
        out.push_str(")\n");
        if let Some(duration) = self.duration {
            write!(out, "{indent}\t:duration ")?;
            write_duration(out, duration)?;
            out.push('\n');
        }
        write!(out, "{indent}\t:precondition ")?;
        write_conjunction(out, self.preconditions)?;
        out.push('\n');
        if let Some(distribution) = self.distribution {
            write!(out, "{indent}\t:interarrival ")?;
            distribution.write_tsal(out)?;
            out.push('\n');
        }
        write!(out, "{indent}\t:effect ")?;
        self.effects.write_tsal(out).map_err(|e| e.within(self.name))?;
        write!(out, "\n{indent})\n")?;
        Ok(())
    }
}

impl ToTsal for Action {
    fn write_tsal(&self, out: &mut String) -> Written {
        OperatorView {
            keyword: ":action",
            name: &self.name,
            parameters: &self.parameters,
            duration: self.duration.as_ref(),
            preconditions: &self.preconditions,
            distribution: None,
            effects: &self.effects,
        }
        .write(out, "")
    }
}

impl ToTsal for Event {
    fn write_tsal(&self, out: &mut String) -> Written {
        OperatorView {
            keyword: ":event",
            name: &self.name,
            parameters: &self.parameters,
            duration: self.duration.as_ref(),
            preconditions: &self.preconditions,
            distribution: self.distribution.as_ref(),
            effects: &self.effects,
        }
        .write(out, "")
    }
}

/// Writes a section whose entries each take one or more lines, indented by two tabs.
fn write_section<T>(out: &mut String, keyword: &str, entries: &[T], mut entry: impl FnMut(&mut String, &T) -> Written) -> Written {
    writeln!(out, "\t({keyword}")?;
    for e in entries {
        let mut buf = String::new();
        entry(&mut buf, e)?;
        for line in buf.lines() {
            writeln!(out, "\t\t{line}")?;
        }
    }
    writeln!(out, "\t)")?;
    Ok(())
}

impl ToTsal for Domain {
    fn write_tsal(&self, out: &mut String) -> Written {
        writeln!(out, "(define (domain {})", self.name)?;
        writeln!(
            out,
            "\t(:requirements{})",
            self.requirements.iter().map(|r| format!(" :{r}")).join("")
        )?;
        if !self.types.is_trivial() {
            out.push_str("\t(:types ");
            write_types(out, &self.types)?;
            out.push_str(")\n");
        }
        out.push_str("\t(:constants");
        if !self.constants.is_empty() {
            out.push(' ');
            write_terms(out, &self.constants)?;
        }
        out.push_str(")\n");

        write_section(out, ":predicates", &self.predicates, |out, p| {
            write_declaration(out, &p.name, &p.args)
        })?;
        write_section(out, ":fluents", &self.fluents, |out, f| {
            write_declaration(out, &f.name, &f.args)?;
            if !f.has_default_bounds() {
                // the bounds go inside the declaration
                out.pop();
                let Bounds { min, max, precision } = f.bounds;
                write!(out, " :bounds {min} {max} {precision})")?;
            }
            if let Some(tpe) = &f.tpe {
                write!(out, " - {tpe}")?;
            }
            Ok(())
        })?;
        write_section(out, ":derived-predicates", &self.derived_predicates, |out, d| {
            out.push_str("(:derived ");
            write_declaration(out, &d.name, &d.args)?;
            out.push(' ');
            write_conjunction(out, &d.body)?;
            out.push(')');
            Ok(())
        })?;
        write_section(out, ":processes", &self.processes, |out, p| {
            write!(out, "(= {} ", p.fluent)?;
            p.equation.expression().write_tsal(out)?;
            out.push(')');
            Ok(())
        })?;
        write_section(out, ":actions", &self.actions, |out, a| a.write_tsal(out))?;
        write_section(out, ":events", &self.events, |out, e| e.write_tsal(out))?;
        out.push_str(")\n");
        Ok(())
    }
}

impl ToTsal for InitEntry {
    fn write_tsal(&self, out: &mut String) -> Written {
        match self {
            InitEntry::Fact(p) => p.write_tsal(out),
            InitEntry::Assign { fluent, value } => {
                out.push_str("(= ");
                fluent.write_tsal(out)?;
                out.push(' ');
                value.write_tsal(out)?;
                out.push(')');
                Ok(())
            }
        }
    }
}

impl ToTsal for TimedLiteral {
    fn write_tsal(&self, out: &mut String) -> Written {
        write!(out, "(:at {} ", fmt_real(self.time))?;
        self.literal.write_tsal(out)?;
        out.push(')');
        Ok(())
    }
}

impl ToTsal for Problem {
    fn write_tsal(&self, out: &mut String) -> Written {
        writeln!(out, "(define (problem {})", self.name)?;
        writeln!(out, "\t(:domain {})", self.domain_name)?;
        out.push_str("\t(:objects");
        if !self.objects.is_empty() {
            out.push(' ');
            write_terms(out, &self.objects)?;
        }
        out.push_str(")\n");
        write_section(out, ":init", &self.init, |out, e| e.write_tsal(out))?;
        if !self.timed_init.is_empty() {
            write_section(out, ":timed-init", &self.timed_init, |out, t| t.write_tsal(out))?;
        }

        out.push_str("\t(:goal ");
        let conjunctions: Vec<_> = self.goals.conjunctions().collect();
        match conjunctions.as_slice() {
            [] => {
                return Err(SerializeError::EmptyGoal {
                    problem: self.name.to_string(),
                });
            }
            [single] => write_conjunction(out, single)?,
            several => {
                out.push_str("(or");
                for c in several {
                    out.push(' ');
                    write_conjunction(out, c)?;
                }
                out.push(')');
            }
        }
        out.push_str(")\n");

        if !self.metric.is_default() {
            write!(out, "\t(:metric {} ", self.metric.direction)?;
            self.metric.fluent.write_tsal(out)?;
            out.push_str(")\n");
        }
        out.push_str(")\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{InitEntry, SELF};
    use crate::errors::Message;

    fn lit(name: &str, args: &[&str]) -> Literal {
        Literal::positive(Predicate::new(
            name,
            args.iter().map(|a| Term::from_symbol(Sym::from(*a), None)),
        ))
    }

    fn domain_with(effects: Effects) -> Domain {
        let mut session = ParseSession::new();
        let mut dom = Domain::new("d");
        dom.add_action(session.action("act", vec![Term::variable("?x", None)], vec![], effects));
        dom
    }

    #[test]
    fn typed_lists() -> Result<(), SerializeError> {
        let mut out = String::new();
        write_terms(
            &mut out,
            &[
                Term::variable("?a", None),
                Term::variable("?b", Some("t".into())),
                Term::variable("?c", Some("t".into())),
                Term::variable("?d", None),
            ],
        )?;
        assert_eq!(out, "?a - object ?b ?c - t ?d");
        Ok(())
    }

    #[test]
    fn domain_layout() -> Res<()> {
        let mut dom = Domain::new("blocks");
        dom.add_requirement("strips");
        dom.add_type("block", None);
        dom.add_predicate(Predicate::new("on", [Term::variable("?x", Some("block".into()))]));
        dom.add_fluent(Fluent::new("level", []).with_bounds(Bounds { min: 0, max: 10, precision: 1 }));
        let text = dom.to_tsal().map_err(Message::from)?;
        assert_eq!(
            text,
            "(define (domain blocks)\n\
             \t(:requirements :strips)\n\
             \t(:types block)\n\
             \t(:constants)\n\
             \t(:predicates\n\
             \t\t(on ?x - block)\n\
             \t)\n\
             \t(:fluents\n\
             \t\t(level :bounds 0 10 1)\n\
             \t)\n\
             \t(:derived-predicates\n\
             \t)\n\
             \t(:processes\n\
             \t)\n\
             \t(:actions\n\
             \t)\n\
             \t(:events\n\
             \t)\n\
             )\n"
        );
        assert_eq!(parse_domain(text)?, dom);
        Ok(())
    }

    #[test]
    fn effect_shapes() -> Result<(), SerializeError> {
        let p = ProbEffect::certain(lit("p", &["?x"]));
        let q = ProbEffect::new(0.5, lit("q", &[])).unwrap();
        let mut out = String::new();
        Effects::Probabilistic(vec![vec![p.clone()], vec![p.clone(), q.clone()]]).write_tsal(&mut out)?;
        assert_eq!(out, "(oneof (p ?x) (and (p ?x) (probabilistic 0.5 (q))))");

        let mut out = String::new();
        Effects::Labeled(vec![LabeledOutcome::new("ok", vec![p.clone()])]).write_tsal(&mut out)?;
        assert_eq!(out, "(ok (p ?x))");

        let mut out = String::new();
        Effects::Labeled(vec![
            LabeledOutcome::new("ok", vec![p.clone()]),
            LabeledOutcome::new("ko", vec![q]),
        ])
        .write_tsal(&mut out)?;
        assert_eq!(out, "(oneof (ok (p ?x)) (ko (probabilistic 0.5 (q))))");
        Ok(())
    }

    #[test]
    fn empty_effects_are_rejected() {
        let err = domain_with(Effects::Deterministic(vec![])).to_tsal().unwrap_err();
        assert_eq!(err, SerializeError::EmptyEffect { owner: "act".into() });

        let p = ProbEffect::certain(lit("p", &["?x"]));
        let err = domain_with(Effects::Probabilistic(vec![vec![p], vec![]]))
            .to_tsal()
            .unwrap_err();
        assert_eq!(
            err,
            SerializeError::EmptyBranch {
                owner: "act".into(),
                branch: 1
            }
        );
    }

    #[test]
    fn problems_without_goal_are_rejected() {
        let pb = Problem::new("p", "d");
        assert_eq!(
            pb.to_tsal().unwrap_err(),
            SerializeError::EmptyGoal { problem: "p".into() }
        );
    }

    #[test]
    fn durations() -> Result<(), SerializeError> {
        let mut out = String::new();
        write_duration(&mut out, &Expression::leaf(5i64))?;
        write_duration(&mut out, &Expression::leaf(FluentRef::new("travel", [])))?;
        assert_eq!(out, "(5)((travel))");
        Ok(())
    }

    #[test]
    fn problem_layout() -> Res<()> {
        let mut pb = Problem::new("p", "d");
        pb.add_object(Term::constant("a", Some("block".into())));
        pb.add_init(InitEntry::Assign {
            fluent: FluentRef::new(SELF, []),
            value: Value::Symbol("alice".into()),
        });
        pb.add_timed_literal(TimedLiteral::new(lit("open", &[]), 3.0).map_err(Message::from)?);
        let tag = |agent: &str| {
            Condition::Expression(Expression::node(
                crate::Operator::Equals,
                Expression::leaf(FluentRef::new(SELF, [])),
                Expression::symbol(agent),
            ))
        };
        pb.set_goals(vec![
            vec![tag("bob"), Condition::Literal(lit("on", &["a", "a"]))],
            vec![tag("alice")],
        ])
        .map_err(Message::from)?;
        let text = pb.to_tsal().map_err(Message::from)?;
        assert_eq!(
            text,
            "(define (problem p)\n\
             \t(:domain d)\n\
             \t(:objects a - block)\n\
             \t(:init\n\
             \t\t(= (self) alice)\n\
             \t)\n\
             \t(:timed-init\n\
             \t\t(:at 3.0 (open))\n\
             \t)\n\
             \t(:goal (or (and (= (self) alice)) (and (= (self) bob) (on a a))))\n\
             )\n"
        );
        assert_eq!(parse_problem(text)?, pb);
        Ok(())
    }
}
