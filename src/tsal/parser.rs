//! Construction of domains and problems from TSAL s-expressions.
//!
//! Sections are optional but must appear in a fixed order:
//!  - domain: requirements, types, constants, fluents/predicates (in any order), derived predicates,
//!    processes, actions, events
//!  - problem: objects, init, timed-init, goal (mandatory), metric
use std::sync::Arc;

use crate::errors::*;
use crate::expressions::{Operator, Value};
use crate::fluents::Bounds;
use crate::predicates::{Args, EQUALITY};
use crate::problem::{InitEntry, Metric, MetricDirection, TimedLiteral};
use crate::tsal::forall::{self, Elimination, Quantified};
use crate::tsal::input::Input;
use crate::tsal::lexer::{Keyword, TokenKind};
use crate::tsal::sexpr::*;
use crate::*;

/// Parses a source containing a single domain definition.
pub fn parse_domain(input: impl Into<Input>) -> Res<Domain> {
    ParseSession::new().parse_domain(input)
}

/// Parses a source containing a single problem definition.
pub fn parse_problem(input: impl Into<Input>) -> Res<Problem> {
    ParseSession::new().parse_problem(input)
}

/// Parses a source containing a domain, a problem, or a domain followed by a problem.
pub fn parse_source(input: impl Into<Input>) -> Res<Parsed> {
    ParseSession::new().parse(input)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, derive_more::Display)]
enum UnitKind {
    #[display("domain")]
    Domain,
    #[display("problem")]
    Problem,
}

fn read_forms(session: &mut ParseSession, input: Arc<Input>) -> Res<Vec<SExpr>> {
    let (forms, diagnostics) = parse_many(input)?;
    session.report(diagnostics);
    Ok(forms)
}

fn unit_kind(e: &SExpr) -> Res<UnitKind> {
    let mut it = e
        .as_list_iter()
        .ok_or_else(|| e.invalid("expected a `(define ...)` form"))?;
    it.pop_keyword(Keyword::Define)?;
    let header = it.pop()?;
    match header.head_keyword() {
        Some(Keyword::Domain) => Ok(UnitKind::Domain),
        Some(Keyword::Problem) => Ok(UnitKind::Problem),
        _ => Err(header.invalid("expected `(domain NAME)` or `(problem NAME)`")),
    }
}

fn single_unit(forms: &[SExpr], expected: UnitKind) -> Res<&SExpr> {
    match forms {
        [single] if unit_kind(single)? == expected => Ok(single),
        [single] => Err(single.invalid(format!("expected a {expected} definition"))),
        [] => Err(Message::error(format!("empty source, expected a {expected} definition"))),
        [_, extra, ..] => Err(extra.invalid(format!("unexpected form after the {expected} definition"))),
    }
}

pub(crate) fn read_domain_unit(session: &mut ParseSession, input: Arc<Input>) -> Res<Domain> {
    let forms = read_forms(session, input)?;
    let dom = single_unit(&forms, UnitKind::Domain)?;
    read_domain(session, dom)
}

pub(crate) fn read_problem_unit(session: &mut ParseSession, input: Arc<Input>) -> Res<Problem> {
    let forms = read_forms(session, input)?;
    let pb = single_unit(&forms, UnitKind::Problem)?;
    read_problem(pb)
}

pub(crate) fn read_unit(session: &mut ParseSession, input: Arc<Input>) -> Res<Parsed> {
    let forms = read_forms(session, input)?;
    match forms.as_slice() {
        [] => Err(Message::error("empty source, expected a domain or a problem definition")),
        [single] => match unit_kind(single)? {
            UnitKind::Domain => Ok(Parsed::Domain(read_domain(session, single)?)),
            UnitKind::Problem => Ok(Parsed::Problem(read_problem(single)?)),
        },
        [dom, pb] => {
            if unit_kind(dom)? != UnitKind::Domain {
                return Err(dom.invalid("expected a domain definition before the problem"));
            }
            if unit_kind(pb)? != UnitKind::Problem {
                return Err(pb.invalid("expected a problem definition after the domain"));
            }
            Ok(Parsed::Both(read_domain(session, dom)?, read_problem(pb)?))
        }
        [_, _, extra, ..] => Err(extra.invalid("unexpected form after the domain and problem definitions")),
    }
}

/// Tracks the sections met so far to enforce their canonical order.
#[derive(Default)]
struct SectionOrder {
    last_rank: u8,
    seen: Vec<Keyword>,
}

impl SectionOrder {
    fn enter(&mut self, kw: Keyword, rank: u8, head: &SAtom, repeatable: bool) -> Res<()> {
        if !repeatable && self.seen.contains(&kw) {
            return Err(head.invalid("duplicated section"));
        }
        if rank < self.last_rank {
            let last = self.seen.last().map(|k| k.to_string()).unwrap_or_default();
            return Err(head.invalid(format!("section must appear before `{last}`")));
        }
        self.last_rank = rank;
        self.seen.push(kw);
        Ok(())
    }
}

fn domain_rank(kw: Keyword) -> Option<u8> {
    Some(match kw {
        Keyword::Requirements => 0,
        Keyword::Types => 1,
        Keyword::Constants => 2,
        Keyword::Fluents | Keyword::Predicates => 3,
        Keyword::DerivedPredicates | Keyword::Derived => 4,
        Keyword::Processes => 5,
        Keyword::Actions => 6,
        Keyword::Events => 7,
        _ => return None,
    })
}

fn problem_rank(kw: Keyword) -> Option<u8> {
    Some(match kw {
        Keyword::Requirements => 0,
        Keyword::Objects => 1,
        Keyword::Init => 2,
        Keyword::TimedInit => 3,
        Keyword::Goal => 4,
        Keyword::Metric => 5,
        _ => return None,
    })
}

fn read_domain(session: &mut ParseSession, dom: &SExpr) -> Res<Domain> {
    let mut dom_iter = dom.as_list_iter().ok_or_else(|| dom.invalid("Expected a list"))?;
    dom_iter.pop_keyword(Keyword::Define)?;

    // extract the name of the domain, of the form `(domain XXX)`
    let mut header = dom_iter.pop_list()?.iter();
    header.pop_keyword(Keyword::Domain)?;
    let name = header.pop_name().title("missing name of domain")?.clone();
    header.expect_end()?;

    let mut res = Domain::new(name);
    let mut order = SectionOrder::default();
    // artifacts of quantifier elimination, added once all declared entities are in
    let mut compiled: Vec<Elimination> = Vec::new();

    for current in dom_iter {
        let mut section = current
            .as_list_iter()
            .ok_or_else(|| current.invalid("expected a section"))?;
        let head = section.pop_atom()?;
        let kw = head
            .keyword()
            .filter(|kw| domain_rank(*kw).is_some())
            .ok_or_else(|| head.invalid("unknown domain section"))?;
        order.enter(kw, domain_rank(kw).unwrap_or_default(), head, kw == Keyword::Derived)?;
        tracing::debug!(domain = %res.name, section = %kw, "reading section");

        match kw {
            Keyword::Requirements => {
                for req in section {
                    let flag = req
                        .as_atom()
                        .filter(|a| a.canonical_str().starts_with(':'))
                        .ok_or_else(|| req.invalid("expected a requirement flag such as `:strips`"))?;
                    res.add_requirement(Sym::with_source(&flag.canonical_str()[1..], flag.loc()));
                }
            }
            Keyword::Types => {
                for (tpe, parent) in consume_typed_symbols(&mut section)? {
                    res.add_type(tpe, parent);
                }
                section.expect_end()?;
            }
            Keyword::Constants => {
                for (value, tpe) in consume_typed_symbols(&mut section)? {
                    res.add_constant(Term::constant(value, tpe));
                }
                section.expect_end()?;
            }
            Keyword::Predicates => {
                for decl in section {
                    res.add_predicate(read_predicate_decl(decl)?);
                }
            }
            Keyword::Fluents => read_fluents(&mut section, &mut res)?,
            Keyword::DerivedPredicates => {
                for derived in section {
                    let mut derived = derived
                        .as_list_iter()
                        .ok_or_else(|| derived.invalid("expected a `(:derived ...)` definition"))?;
                    derived.pop_keyword(Keyword::Derived)?;
                    res.add_derived_predicate(read_derived(&mut derived)?);
                }
            }
            Keyword::Derived => res.add_derived_predicate(read_derived(&mut section)?),
            Keyword::Processes => {
                for process in section {
                    res.add_process(read_process(process)?);
                }
            }
            Keyword::Actions => {
                for action in section {
                    let mut property = action
                        .as_list_iter()
                        .ok_or_else(|| action.invalid("expected an `(:action ...)` definition"))?;
                    property.pop_keyword(Keyword::Action)?;
                    let def = read_operator(session, &mut property, action, OperatorKind::Action, &mut compiled)?;
                    let mut action = session.action(def.name, def.parameters, def.preconditions, def.effects);
                    action.duration = def.duration;
                    res.add_action(action);
                }
            }
            Keyword::Events => {
                for event in section {
                    let mut property = event
                        .as_list_iter()
                        .ok_or_else(|| event.invalid("expected an `(:event ...)` definition"))?;
                    property.pop_keyword(Keyword::Event)?;
                    let def = read_operator(session, &mut property, event, OperatorKind::Event, &mut compiled)?;
                    let mut event = session.event(def.name, def.parameters, def.preconditions, def.effects);
                    event.duration = def.duration;
                    event.distribution = def.distribution;
                    res.add_event(event);
                }
            }
            _ => return Err(head.invalid("unsupported domain section")),
        }
    }

    for elim in compiled {
        res.add_predicate(elim.marker);
        res.add_event(elim.event);
    }
    Ok(res)
}

/// Consumes a list of possibly typed symbols `a b - t c`, stopping at the first keyword.
/// Untyped symbols are only allowed at the end of the list.
fn consume_typed_symbols(input: &mut ListIter) -> Res<Vec<(Sym, Option<Sym>)>> {
    let mut args = Vec::with_capacity(input.len());
    let mut untyped: Vec<Sym> = Vec::new();
    while let Some(next) = input.peek() {
        let atom = next.as_atom().ok_or_else(|| next.invalid("expected a symbol"))?;
        if atom.keyword().is_some() {
            break;
        }
        input.pop()?;
        if atom.operator() == Some(Operator::Minus) {
            if untyped.is_empty() {
                return Err(atom.invalid("type annotation without any symbol to apply to"));
            }
            let tpe = input.pop_name().title("expected a type name after `-`")?;
            args.extend(untyped.drain(..).map(|name| (name, Some(tpe.clone()))));
        } else if atom.is_name() || atom.is_variable() || atom.is_number() {
            untyped.push(atom.sym.clone());
        } else {
            return Err(atom.invalid("unexpected token in a typed list"));
        }
    }
    // no type given
    args.extend(untyped.into_iter().map(|name| (name, None)));
    Ok(args)
}

fn typed_terms(symbols: Vec<(Sym, Option<Sym>)>) -> Vec<Term> {
    symbols
        .into_iter()
        .map(|(sym, tpe)| Term::from_symbol(sym, tpe))
        .collect()
}

fn read_predicate_decl(decl: &SExpr) -> Res<Predicate> {
    let mut pred = decl
        .as_list_iter()
        .ok_or_else(|| decl.invalid("expected a predicate declaration"))?;
    let name = pred.pop_name()?.clone();
    let args = consume_typed_symbols(&mut pred)?;
    pred.expect_end()?;
    Ok(Predicate::new(name, typed_terms(args)))
}

fn read_fluents(section: &mut ListIter, res: &mut Domain) -> Res<()> {
    while let Ok(decl) = section.pop() {
        // element is necessarily a fluent name and parameters, e.g., (battery ?r - rover :bounds 0 10 1)
        let mut func = decl
            .as_list_iter()
            .ok_or_else(|| decl.invalid("expected a fluent declaration"))?;
        let name = func.pop_name()?.clone();
        let args = consume_typed_symbols(&mut func)?;
        let mut fluent = Fluent::new(name, typed_terms(args));
        if !func.is_empty() {
            func.pop_keyword(Keyword::Bounds)?;
            fluent.bounds = read_bounds(&mut func)?;
            func.expect_end()?;
        }

        // it can have a type annotation, e.g., (battery ?r) - number
        if section
            .peek()
            .and_then(|e| e.as_atom())
            .is_some_and(|a| a.operator() == Some(Operator::Minus))
        {
            section.pop()?;
            fluent.tpe = Some(section.pop_name().title("expected a type")?.clone());
        }
        res.add_fluent(fluent);
    }
    Ok(())
}

fn read_bounds(input: &mut ListIter) -> Res<Bounds> {
    let mut int = |what: &str| -> Res<i64> {
        let atom = input.pop_atom()?;
        atom.as_int().ok_or_else(|| atom.invalid(format!("expected an integer {what}")))
    };
    let min = int("lower bound")?;
    let max = int("upper bound")?;
    let precision = int("precision")?;
    let loc = input.loc();
    if min > max {
        return Err(InvariantError::new("fluent bounds", format!("lower bound {min} exceeds upper bound {max}")))
            .located(&loc);
    }
    let precision = u32::try_from(precision)
        .map_err(|_| InvariantError::new("fluent bounds", format!("precision {precision} is negative")))
        .located(&loc)?;
    Ok(Bounds { min, max, precision })
}

fn read_derived(input: &mut ListIter) -> Res<DerivedPredicate> {
    let head = read_predicate_decl(input.pop()?)?;
    let body = read_conditions(input.pop()?)?;
    input.expect_end()?;
    Ok(DerivedPredicate::new(head.name, head.args, body))
}

fn read_process(e: &SExpr) -> Res<Process> {
    let mut it = e.as_list_iter().ok_or_else(|| e.invalid("expected a process"))?;
    let eq = it.pop_atom()?;
    if eq.operator() != Some(Operator::Equals) {
        return Err(eq.invalid("expected `(= FLUENT EXPRESSION)`"));
    }
    let target = it.pop()?;
    let fluent = match target {
        SExpr::Atom(a) if a.is_name() => a.sym.clone(),
        SExpr::List(l) if l.len() == 1 && l.head().is_some_and(|h| h.is_name()) => l.items()[0]
            .as_atom()
            .map(|a| a.sym.clone())
            .ok_or_else(|| target.invalid("expected a fluent"))?,
        _ => return Err(target.invalid("expected a fluent")),
    };
    let expression = read_expression(it.pop()?)?;
    it.expect_end()?;
    let equation = Equation::new(expression).located(&e.loc())?;
    Ok(Process::new(fluent, equation))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, derive_more::Display)]
enum OperatorKind {
    #[display("action")]
    Action,
    #[display("event")]
    Event,
}

/// Content of an `(:action ...)` or `(:event ...)`, before it is given an identity.
struct OperatorDef {
    name: Sym,
    parameters: Vec<Term>,
    preconditions: Vec<Condition>,
    effects: Effects,
    duration: Option<Expression>,
    distribution: Option<FrequencyDistribution>,
}

fn duplicated(key: &SAtom) -> Message {
    key.invalid("duplicated key")
}

fn read_operator(
    session: &mut ParseSession,
    property: &mut ListIter,
    current: &SExpr,
    kind: OperatorKind,
    compiled: &mut Vec<Elimination>,
) -> Res<OperatorDef> {
    let name = property.pop_name().title(format!("missing name of {kind}"))?.clone();
    let mut parameters = None;
    let mut preconditions = None;
    let mut duration = None;
    let mut distribution = None;
    let mut effect: Option<(&SAtom, Vec<&SExpr>)> = None;

    while !property.is_empty() {
        let key = property.pop_atom()?;
        let kw = key.keyword().ok_or_else(|| key.invalid("expected a keyword"))?;
        if kw == Keyword::Effect {
            // an effect is one value, or several labeled outcomes
            let mut values = Vec::new();
            while let Some(value) = property.peek() {
                if value.as_atom().is_some_and(|a| a.keyword().is_some()) {
                    break;
                }
                values.push(property.pop()?);
            }
            if values.is_empty() {
                return Err(key.invalid("no value associated to key"));
            }
            if effect.replace((key, values)).is_some() {
                return Err(duplicated(key));
            }
            continue;
        }
        let value = property.pop().tag(key, "no value associated to key", None)?;
        match kw {
            Keyword::Parameters => {
                if parameters.is_some() {
                    return Err(duplicated(key));
                }
                let mut value = value
                    .as_list_iter()
                    .ok_or_else(|| value.invalid("expected a parameter list"))?;
                let params = typed_terms(consume_typed_symbols(&mut value)?);
                value.expect_end()?;
                if let Some(p) = params.iter().find(|p| !p.is_variable()) {
                    return Err(p.invalid("parameters must be variables"));
                }
                parameters = Some(params);
            }
            Keyword::Precondition => {
                if preconditions.is_some() {
                    return Err(duplicated(key));
                }
                preconditions = Some(read_conditions(value)?);
            }
            Keyword::Duration => {
                if duration.is_some() {
                    return Err(duplicated(key));
                }
                duration = Some(read_duration(value)?);
            }
            Keyword::Interarrival if kind == OperatorKind::Event => {
                if distribution.is_some() {
                    return Err(duplicated(key));
                }
                distribution = Some(read_distribution(value)?);
            }
            _ => return Err(key.invalid(format!("unsupported key in {kind}"))),
        }
    }

    let (effect_key, values) = effect.ok_or_else(|| current.invalid(format!("{kind} `{name}` has no effect")))?;
    let parameters = parameters.unwrap_or_default();
    let effects = EffectReader {
        session,
        parameters: &parameters,
        compiled,
        in_forall: false,
    }
    .read(&values)
    .tag(effect_key, format!("in the effect of `{name}`"), None)?;

    Ok(OperatorDef {
        name,
        parameters,
        preconditions: preconditions.unwrap_or_default(),
        effects,
        duration: duration.flatten(),
        distribution: distribution.flatten(),
    })
}

/// `(expr)`, or `()` for no duration.
fn read_duration(value: &SExpr) -> Res<Option<Expression>> {
    let list = value
        .as_list()
        .ok_or_else(|| value.invalid("expected a parenthesized duration"))?;
    match list.items() {
        [] => Ok(None),
        [single] => Ok(Some(read_expression(single)?)),
        _ => Ok(Some(read_expression(value)?)),
    }
}

/// `(name qualifier value extra...)`, or `()` for no distribution.
fn read_distribution(value: &SExpr) -> Res<Option<FrequencyDistribution>> {
    let mut it = value
        .as_list_iter()
        .ok_or_else(|| value.invalid("expected a frequency distribution"))?;
    if it.is_empty() {
        return Ok(None);
    }
    let name = it.pop_name()?.clone();
    let qualifier = it.pop_name()?.clone();
    let number = it.pop_atom()?;
    let value = number.as_f64().ok_or_else(|| number.invalid("expected a number"))?;
    let extra_args = it
        .map(|e| {
            e.as_atom()
                .map(|a| a.sym.clone())
                .ok_or_else(|| e.invalid("expected an atom"))
        })
        .collect::<Res<Vec<_>>>()?;
    Ok(Some(FrequencyDistribution {
        name,
        qualifier,
        value,
        extra_args,
    }))
}

/// `()`, `(and c1 c2 ...)` or a single condition.
pub(crate) fn read_conditions(e: &SExpr) -> Res<Vec<Condition>> {
    if e.is_empty_list() {
        Ok(Vec::new())
    } else if let Some(conjuncts) = e.as_application(Keyword::And) {
        conjuncts.iter().map(read_condition).collect()
    } else {
        Ok(vec![read_condition(e)?])
    }
}

fn read_condition(e: &SExpr) -> Res<Condition> {
    let list = e.as_list().ok_or_else(|| e.invalid("expected a condition"))?;
    let Some(head) = list.items().first() else {
        return Err(e.invalid("empty condition"));
    };
    let head = match head {
        // parenthesized expression, e.g. ((> (level) 3))
        SExpr::List(_) if list.len() == 1 => return Ok(Condition::Expression(read_expression(head)?)),
        SExpr::List(_) => return Err(e.invalid("expected a condition")),
        SExpr::Atom(head) => head,
    };
    match head.kind {
        TokenKind::Keyword(Keyword::Not) => Ok(Condition::Literal(read_literal(e)?)),
        TokenKind::Keyword(Keyword::Or) => {
            let disjuncts = list.items()[1..]
                .iter()
                .map(read_condition)
                .collect::<Res<Vec<_>>>()?;
            Ok(Condition::Or(disjuncts))
        }
        TokenKind::Keyword(Keyword::Forall) => {
            Err(Message::unsupported("quantified condition").snippet(e.error("only effects may be quantified")))
        }
        TokenKind::Operator(Operator::Equals) if is_equality_predicate(list) => {
            Ok(Condition::Literal(Literal::positive(read_predicate(e)?)))
        }
        TokenKind::Operator(_) => Ok(Condition::Expression(read_expression(e)?)),
        TokenKind::Name => Ok(Condition::Literal(Literal::positive(read_predicate(e)?))),
        _ => Err(head.invalid("unexpected token at the start of a condition")),
    }
}

/// `(= ?x ?y)` is the equality predicate, any other `=` is a comparison of expressions.
fn is_equality_predicate(list: &SList) -> bool {
    matches!(list.items(), [_, SExpr::Atom(a), SExpr::Atom(b)] if a.is_variable() && b.is_variable())
}

fn read_literal(e: &SExpr) -> Res<Literal> {
    match e.as_application(Keyword::Not) {
        Some([inner]) => Ok(Literal::negative(read_predicate(inner)?)),
        Some(_) => Err(e.invalid("`not` expects a single predicate")),
        None => Ok(Literal::positive(read_predicate(e)?)),
    }
}

fn read_predicate(e: &SExpr) -> Res<Predicate> {
    let mut it = e.as_list_iter().ok_or_else(|| e.invalid("expected a predicate"))?;
    let head = it.pop_atom()?;
    let name = if head.is_name() {
        head.sym.clone()
    } else if head.operator() == Some(Operator::Equals) {
        Sym::with_source(EQUALITY, head.loc())
    } else {
        return Err(head.invalid("expected a predicate name"));
    };
    let args = it.map(read_term).collect::<Res<Args>>()?;
    if name == EQUALITY && args.len() != 2 {
        return Err(e.invalid("equality expects two arguments"));
    }
    Ok(Predicate { name, args })
}

fn read_term(e: &SExpr) -> Res<Term> {
    match e.as_atom() {
        Some(a) if a.is_variable() => Ok(Term::variable(a.sym.clone(), None)),
        Some(a) if a.is_name() || a.is_number() => Ok(Term::constant(a.sym.clone(), None)),
        _ => Err(e.invalid("expected a variable or a constant")),
    }
}

fn read_value(a: &SAtom) -> Res<Value> {
    match a.kind {
        TokenKind::PosInteger(i) | TokenKind::NegInteger(i) => Ok(Value::Int(i)),
        TokenKind::Probability(x) | TokenKind::Decimal(x) => Ok(Value::Real(x)),
        TokenKind::Name | TokenKind::Variable => Ok(Value::Symbol(a.sym.clone())),
        _ => Err(a.invalid("expected a value")),
    }
}

fn read_fluent_ref(l: &SList) -> Res<FluentRef> {
    let mut it = l.iter();
    let name = it.pop_name()?.clone();
    let args = it.map(read_term).collect::<Res<Args>>()?;
    Ok(FluentRef { name, args })
}

/// Reads an expression:
///  - an atom is a leaf value
///  - `(op lhs rhs)` is an operator node
///  - `(name args...)` is a fluent
///  - `(x)` is the expression `x` itself
pub(crate) fn read_expression(e: &SExpr) -> Res<Expression> {
    let list = match e {
        SExpr::Atom(a) => return Ok(Expression::Leaf(read_value(a)?)),
        SExpr::List(l) => l,
    };
    match list.items() {
        [] => Err(e.invalid("empty expression")),
        [SExpr::Atom(op), lhs, rhs] if op.operator().is_some() => {
            let operator = op.operator().ok_or_else(|| op.invalid("expected an operator"))?;
            Ok(Expression::node(operator, read_expression(lhs)?, read_expression(rhs)?))
        }
        [SExpr::Atom(op), ..] if op.operator().is_some() => Err(e.invalid(format!("`{op}` expects two operands"))),
        [SExpr::Atom(name), ..] if name.is_name() => Ok(Expression::Leaf(Value::Fluent(read_fluent_ref(list)?))),
        [single] => read_expression(single),
        _ => Err(e.invalid("expected an expression")),
    }
}

/// Reads the effect of an operator, compiling away the quantified effects it contains.
struct EffectReader<'a> {
    session: &'a mut ParseSession,
    parameters: &'a [Term],
    compiled: &'a mut Vec<Elimination>,
    /// Set while reading the body of a `forall`.
    in_forall: bool,
}

/// `(label body)` where `label` is a name and `body` a list.
fn is_labeled(e: &SExpr) -> bool {
    matches!(e.as_list().map(|l| l.items()), Some([SExpr::Atom(label), SExpr::List(_)]) if label.is_name())
}

impl EffectReader<'_> {
    /// Dispatches on the shape of the effect:
    ///  - several values: labeled outcomes
    ///  - `(label body)`: a single labeled outcome
    ///  - `(oneof ...)`: labeled outcomes if all children are labeled, probabilistic branches if none is
    ///  - anything else: a deterministic conjunction
    fn read(mut self, values: &[&SExpr]) -> Res<Effects> {
        match values {
            [] => Err(Message::error("missing effect")),
            [single] => self.read_single(single),
            several => {
                let outcomes = several
                    .iter()
                    .map(|v| self.read_labeled(v))
                    .collect::<Res<Vec<_>>>()?;
                Ok(Effects::Labeled(outcomes))
            }
        }
    }

    fn read_single(&mut self, e: &SExpr) -> Res<Effects> {
        if is_labeled(e) {
            Ok(Effects::Labeled(vec![self.read_labeled(e)?]))
        } else if let Some(children) = e.as_application(Keyword::Oneof) {
            let num_labeled = children.iter().filter(|c| is_labeled(c)).count();
            if num_labeled == 0 {
                let branches = children
                    .iter()
                    .map(|c| self.read_conjunction(c))
                    .collect::<Res<Vec<_>>>()?;
                Effects::probabilistic(branches).located(&e.loc())
            } else if num_labeled == children.len() {
                let outcomes = children
                    .iter()
                    .map(|c| self.read_labeled(c))
                    .collect::<Res<Vec<_>>>()?;
                Effects::labeled(outcomes).located(&e.loc())
            } else {
                Err(e.invalid("cannot mix labeled and unlabeled branches in `oneof`"))
            }
        } else {
            Ok(Effects::Deterministic(self.read_conjunction(e)?))
        }
    }

    fn read_labeled(&mut self, e: &SExpr) -> Res<LabeledOutcome> {
        match e.as_list().map(|l| l.items()) {
            Some([SExpr::Atom(label), body]) if label.is_name() => {
                Ok(LabeledOutcome::new(label.sym.clone(), self.read_conjunction(body)?))
            }
            _ => Err(e.invalid("expected a labeled outcome `(label effect)`")),
        }
    }

    /// `()`, `(and e1 e2 ...)` or a single effect.
    fn read_conjunction(&mut self, e: &SExpr) -> Res<Outcome> {
        let mut out = Vec::new();
        if e.is_empty_list() {
            return Ok(out);
        }
        match e.as_application(Keyword::And) {
            Some(items) => {
                for item in items {
                    self.read_item(item, &mut out)?;
                }
            }
            None => self.read_item(e, &mut out)?,
        }
        Ok(out)
    }

    fn read_item(&mut self, e: &SExpr, out: &mut Outcome) -> Res<()> {
        match e.head_keyword() {
            Some(Keyword::Forall) if self.in_forall => {
                return Err(Message::unsupported("nested `forall` effect")
                    .snippet(e.error("`forall` is not allowed inside the body of another `forall`")));
            }
            Some(Keyword::Forall) => out.push(self.eliminate_forall(e)?),
            Some(Keyword::When) => {
                return Err(Message::unsupported("conditional effect outside of a `forall`")
                    .snippet(e.error("`when` is only supported inside `forall`")));
            }
            Some(Keyword::Probabilistic) => out.push(read_probabilistic(e)?),
            Some(Keyword::And | Keyword::Oneof) => return Err(e.invalid("nested effect structure is not supported")),
            _ => out.push(ProbEffect::certain(read_effect_atom(e)?)),
        }
        Ok(())
    }

    /// `(forall (?v - t) (when condition effect))` or `(forall (?v - t) effect)`
    fn eliminate_forall(&mut self, e: &SExpr) -> Res<ProbEffect> {
        let mut it = e.as_list_iter().ok_or_else(|| e.invalid("expected a list"))?;
        it.pop_keyword(Keyword::Forall)?;
        let mut vars = it.pop_list()?.iter();
        let variables = typed_terms(consume_typed_symbols(&mut vars)?);
        vars.expect_end()?;
        if variables.is_empty() || variables.iter().any(|v| !v.is_variable()) {
            return Err(vars.loc().invalid("`forall` must bind at least one variable"));
        }
        let body = it.pop()?;
        it.expect_end()?;
        self.in_forall = true;
        let (condition, effect) = match body.as_application(Keyword::When) {
            Some([condition, effect]) => (read_conditions(condition)?, self.read_conjunction(effect)?),
            Some(_) => return Err(body.invalid("`when` expects a condition and an effect")),
            None => (Vec::new(), self.read_conjunction(body)?),
        };
        self.in_forall = false;
        let elim = forall::eliminate(
            self.session,
            self.parameters,
            Quantified {
                variables,
                condition,
                effect,
            },
        );
        let trigger = elim.trigger.clone();
        self.compiled.push(elim);
        Ok(trigger)
    }
}

/// `(probabilistic p effect)`
fn read_probabilistic(e: &SExpr) -> Res<ProbEffect> {
    let mut it = e.as_list_iter().ok_or_else(|| e.invalid("expected a list"))?;
    it.pop_keyword(Keyword::Probabilistic)?;
    let p = it.pop_atom()?;
    let probability = p.as_f64().ok_or_else(|| p.invalid("expected a probability"))?;
    let atom = read_effect_atom(it.pop()?)?;
    it.expect_end()?;
    ProbEffect::new(probability, atom).located(&e.loc())
}

fn read_effect_atom(e: &SExpr) -> Res<EffectAtom> {
    match read_condition(e)? {
        Condition::Literal(l) => Ok(EffectAtom::Literal(l)),
        Condition::Expression(x) => Ok(EffectAtom::Expression(x)),
        Condition::Or(_) => Err(e.invalid("disjunctions are not allowed in effects")),
    }
}

fn read_problem(pb: &SExpr) -> Res<Problem> {
    let mut pb_iter = pb.as_list_iter().ok_or_else(|| pb.invalid("Expected a list"))?;
    pb_iter.pop_keyword(Keyword::Define)?;

    let mut header = pb_iter.pop_list()?.iter();
    header.pop_keyword(Keyword::Problem)?;
    let name = header.pop_name().title("missing name of problem")?.clone();
    header.expect_end()?;

    let mut domain_ref = pb_iter.pop_list().title("expected `(:domain NAME)`")?.iter();
    domain_ref.pop_keyword(Keyword::DomainRef)?;
    let domain_name = domain_ref.pop_name()?.clone();
    domain_ref.expect_end()?;

    let mut res = Problem::new(name, domain_name);
    let mut order = SectionOrder::default();
    let mut init_loc = None;
    let mut goal = None;

    for current in pb_iter {
        let mut section = current
            .as_list_iter()
            .ok_or_else(|| current.invalid("expected a section"))?;
        let head = section.pop_atom()?;
        let kw = head
            .keyword()
            .filter(|kw| problem_rank(*kw).is_some())
            .ok_or_else(|| head.invalid("unknown problem section"))?;
        order.enter(kw, problem_rank(kw).unwrap_or_default(), head, false)?;
        tracing::debug!(problem = %res.name, section = %kw, "reading section");

        match kw {
            // requirements are declared by the domain
            Keyword::Requirements => {}
            Keyword::Objects => {
                for (value, tpe) in consume_typed_symbols(&mut section)? {
                    res.add_object(Term::constant(value, tpe));
                }
                section.expect_end()?;
            }
            Keyword::Init => {
                init_loc = Some(current.loc());
                let entries = match section.rest() {
                    [conjunction] => conjunction.as_application(Keyword::And).unwrap_or(section.rest()),
                    entries => entries,
                };
                for entry in entries {
                    res.add_init(read_init_entry(entry)?);
                }
            }
            Keyword::TimedInit => {
                for timed in section {
                    res.add_timed_literal(read_timed_literal(timed)?);
                }
            }
            Keyword::Goal => {
                let value = section.pop()?;
                section.expect_end()?;
                goal = Some((current.loc(), read_goal(value)?));
            }
            Keyword::Metric => res.metric = read_metric(&mut section)?,
            _ => return Err(head.invalid("unsupported problem section")),
        }
    }

    let (goal_loc, conjunctions) = goal.ok_or_else(|| pb.invalid("problem has no `:goal` section"))?;
    res.agent().map(|_| ()).located(&init_loc.unwrap_or_else(|| pb.loc()))?;
    res.set_goals(conjunctions).located(&goal_loc)?;
    Ok(res)
}

/// `(= (f args) value)` or a ground predicate.
fn read_init_entry(e: &SExpr) -> Res<InitEntry> {
    match e.as_list().map(|l| l.items()) {
        Some([SExpr::Atom(op), SExpr::List(fluent), value]) if op.operator() == Some(Operator::Equals) => {
            let fluent = read_fluent_ref(fluent)?;
            let value = match value {
                SExpr::Atom(a) => read_value(a)?,
                SExpr::List(_) => return Err(value.invalid("expected a value")),
            };
            Ok(InitEntry::Assign { fluent, value })
        }
        _ => Ok(InitEntry::Fact(read_predicate(e)?)),
    }
}

/// `(:at time literal)`
fn read_timed_literal(e: &SExpr) -> Res<TimedLiteral> {
    let mut it = e.as_list_iter().ok_or_else(|| e.invalid("expected `(:at TIME LITERAL)`"))?;
    it.pop_keyword(Keyword::At)?;
    let time = it.pop_atom()?;
    let time_value = time.as_f64().ok_or_else(|| time.invalid("expected a time"))?;
    let literal = read_literal(it.pop()?)?;
    it.expect_end()?;
    TimedLiteral::new(literal, time_value).located(&e.loc())
}

/// A goal is a single conjunction, or a disjunction of conjunctions, one per agent.
fn read_goal(value: &SExpr) -> Res<Vec<Vec<Condition>>> {
    match value.as_application(Keyword::Or) {
        Some(conjunctions) => conjunctions.iter().map(read_conditions).collect(),
        None => Ok(vec![read_conditions(value)?]),
    }
}

/// `minimize (f args)` or `maximize (f args)`
fn read_metric(section: &mut ListIter) -> Res<Metric> {
    let direction = section.pop_name()?;
    let direction = match direction.canonical_str() {
        "minimize" => MetricDirection::Minimize,
        "maximize" => MetricDirection::Maximize,
        _ => return Err(direction.invalid("expected `minimize` or `maximize`")),
    };
    let fluent = read_fluent_ref(section.pop_list()?)?;
    section.expect_end()?;
    Ok(Metric { direction, fluent })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKS: &str = "(define (domain d) (:requirements :strips) (:types block) (:predicates (on ?x ?y)) \
        (:fluents (level)) (:processes) (:actions (:action move :parameters (?x - block) \
        :precondition (and (on ?x ?x)) :effect (on ?x ?x))) (:events))";

    fn action_effects(effect: &str) -> Res<Effects> {
        let dom = parse_domain(format!(
            "(define (domain d) (:actions (:action a :parameters (?x ?y) :precondition () :effect {effect})))"
        ))?;
        Ok(dom.actions[0].effects.clone())
    }

    fn lit(name: &str, args: &[&str]) -> Literal {
        Literal::positive(Predicate::new(
            name,
            args.iter().map(|a| Term::from_symbol(Sym::from(*a), None)),
        ))
    }

    #[test]
    fn end_to_end_domain() -> Res<()> {
        let dom = parse_domain(BLOCKS)?;
        assert_eq!(dom.name, "d");
        assert_eq!(dom.requirements, vec![Sym::from("strips")]);
        assert_eq!(dom.types.children("block").unwrap(), &[] as &[Sym]);
        assert!(dom.types.contains(crate::types::OBJECT));
        assert_eq!(dom.types.type_names().len(), 2);
        assert_eq!(dom.predicates.len(), 1);
        assert_eq!(dom.predicates[0].name, "on");
        assert_eq!(dom.predicates[0].arity(), 2);
        assert_eq!(dom.fluents.len(), 1);
        assert_eq!(dom.fluents[0].name, "level");
        assert_eq!(dom.fluents[0].bounds, Bounds::default());
        assert!(dom.derived_predicates.is_empty());
        assert!(dom.processes.is_empty());
        assert_eq!(dom.actions.len(), 1);
        let mv = &dom.actions[0];
        assert_eq!(mv.name, "move");
        assert_eq!(mv.parameters, vec![Term::variable("?x", Some("block".into()))]);
        assert_eq!(mv.preconditions, vec![Condition::Literal(lit("on", &["?x", "?x"]))]);
        assert_eq!(
            mv.effects,
            Effects::Deterministic(vec![ProbEffect::certain(lit("on", &["?x", "?x"]))])
        );
        assert!(dom.events.is_empty());
        Ok(())
    }

    #[test]
    fn fluent_declarations() -> Res<()> {
        let dom = parse_domain(
            "(define (domain d) (:fluents (battery) (fuel ?t - truck :bounds -5 50 1) (loc ?t) - place))",
        )?;
        assert_eq!(dom.fluents[0].bounds, Bounds { min: 0, max: 100, precision: 2 });
        assert_eq!(dom.fluents[1].bounds, Bounds { min: -5, max: 50, precision: 1 });
        assert_eq!(dom.fluents[1].args[0], Term::variable("?t", Some("truck".into())));
        assert_eq!(dom.fluents[2].tpe, Some(Sym::from("place")));
        assert!(parse_domain("(define (domain d) (:fluents (f :bounds 10 0 2)))").is_err());
        Ok(())
    }

    #[test]
    fn effect_shapes() -> Res<()> {
        let p = ProbEffect::certain(lit("p", &["?x"]));
        let q = ProbEffect::certain(lit("q", &[]));

        assert_eq!(action_effects("(p ?x)")?, Effects::Deterministic(vec![p.clone()]));
        assert_eq!(
            action_effects("(and (p ?x) (q))")?,
            Effects::Deterministic(vec![p.clone(), q.clone()])
        );
        assert_eq!(
            action_effects("(oneof (p ?x) (and (q) (p ?x)))")?,
            Effects::Probabilistic(vec![vec![p.clone()], vec![q.clone(), p.clone()]])
        );
        assert_eq!(
            action_effects("(ok (p ?x))")?,
            Effects::Labeled(vec![LabeledOutcome::new("ok", vec![p.clone()])])
        );
        assert_eq!(
            action_effects("(oneof (ok (p ?x)) (ko (q)))")?,
            Effects::Labeled(vec![
                LabeledOutcome::new("ok", vec![p.clone()]),
                LabeledOutcome::new("ko", vec![q.clone()])
            ])
        );
        assert_eq!(action_effects("(ok (p ?x)) (ko (q))")?, action_effects("(oneof (ok (p ?x)) (ko (q)))")?);
        assert_eq!(action_effects("()")?, Effects::Deterministic(vec![]));
        assert!(action_effects("(oneof (ok (p ?x)) (q))").is_err());

        let Effects::Deterministic(eff) = action_effects("(probabilistic 0.25 (not (p ?x)))")? else {
            panic!("expected a deterministic effect")
        };
        assert_eq!(eff[0].probability, 0.25);
        assert_eq!(eff[0].atom, EffectAtom::Literal(lit("p", &["?x"]).negated()));
        Ok(())
    }

    #[test]
    fn invalid_effects() {
        let err = action_effects("(probabilistic 1.5 (p ?x))").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Invariant(_)));

        let err = action_effects("(when (q) (p ?x))").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Unsupported(_)));

        assert!(parse_domain("(define (domain d) (:actions (:action a :parameters ())))").is_err());
    }

    #[test]
    fn expressions() -> Res<()> {
        let dom = parse_domain(
            "(define (domain d) (:actions (:action a :parameters (?r) :duration ((travel ?r)) \
             :precondition (and (>= (battery ?r) 10) (= ?r ?r) (or (p) (not (q)))) \
             :effect (and (- (battery ?r) 2.5) (= (pos) 3)))))",
        )?;
        let a = &dom.actions[0];
        let battery = Expression::leaf(FluentRef::new("battery", [Term::variable("?r", None)]));
        assert_eq!(
            a.duration,
            Some(Expression::leaf(FluentRef::new("travel", [Term::variable("?r", None)])))
        );
        assert_eq!(
            a.preconditions[0],
            Condition::Expression(Expression::node(Operator::GtEq, battery.clone(), Expression::leaf(10i64)))
        );
        assert!(a.preconditions[1].as_literal().is_some_and(|l| l.predicate.is_equality()));
        assert!(matches!(&a.preconditions[2], Condition::Or(d) if d.len() == 2));
        let Effects::Deterministic(eff) = &a.effects else {
            panic!("expected a deterministic effect")
        };
        assert_eq!(
            eff[0].atom,
            EffectAtom::Expression(Expression::node(Operator::Minus, battery, Expression::leaf(2.5f64)))
        );
        Ok(())
    }

    #[test]
    fn sections_are_ordered() {
        assert!(parse_domain("(define (domain d) (:predicates (p)) (:types t))").is_err());
        assert!(parse_domain("(define (domain d) (:predicates (p)) (:predicates (q)))").is_err());
        assert!(parse_domain("(define (domain d) (:fluents (f)) (:predicates (p)))").is_ok());
        assert!(parse_domain("(define (domain d) (:derived (p ?x) (q ?x)) (:derived (r) ()))").is_ok());
    }

    #[test]
    fn derived_and_processes() -> Res<()> {
        let dom = parse_domain(
            "(define (domain d) (:derived-predicates (:derived (reachable ?x - place) (and (road ?x) (not (blocked ?x))))) \
             (:processes (= level (+ level 1)) (= (temp) (* temp 0.5))) \
             (:events (:event drift :parameters () :precondition () :interarrival (exponential mean 2.5 x) :effect (moved))))",
        )?;
        assert_eq!(dom.derived_predicates[0].name, "reachable");
        assert_eq!(dom.derived_predicates[0].body.len(), 2);
        assert_eq!(dom.processes.len(), 2);
        assert_eq!(dom.processes[1].fluent, "temp");
        assert_eq!(dom.processes[0].equation.variables(), &[Sym::from("level")]);
        let dist = dom.events[0].distribution.as_ref().unwrap();
        assert_eq!(dist.name, "exponential");
        assert_eq!(dist.value, 2.5);
        assert_eq!(dist.extra_args, vec![Sym::from("x")]);

        let err = parse_domain("(define (domain d) (:processes (= level 3)))").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Invariant(_)));
        Ok(())
    }

    #[test]
    fn problem() -> Res<()> {
        let pb = parse_problem(
            "(define (problem p) (:domain d) (:objects a b - block alice bob) \
             (:init (= (self) alice) (on a b) (= (height a) 2)) \
             (:timed-init (:at 10 (not (on a b)))) \
             (:goal (or (and (= (self) alice) (on b a)) (and (= (self) bob) (on a b)))) \
             (:metric maximize (reward)))",
        )?;
        assert_eq!(pb.agent().unwrap(), "alice");
        assert_eq!(pb.objects.len(), 4);
        assert_eq!(pb.objects[0], Term::constant("a", Some("block".into())));
        assert_eq!(pb.objects[3], Term::constant("bob", None));
        assert_eq!(pb.init.len(), 3);
        assert!(matches!(&pb.init[2], InitEntry::Assign { value: Value::Int(2), .. }));
        assert_eq!(pb.timed_init[0].time, 10.0);
        assert!(pb.timed_init[0].literal.is_negative());
        assert_eq!(pb.goals.own.len(), 2);
        assert_eq!(pb.goals.others[&Sym::from("bob")].len(), 2);
        assert_eq!(pb.metric.direction, MetricDirection::Maximize);
        Ok(())
    }

    #[test]
    fn problem_validation() {
        let no_self = parse_problem("(define (problem p) (:domain d) (:init (on a b)) (:goal (and (on b a))))");
        assert!(matches!(
            no_self.unwrap_err().kind(),
            ErrorKind::Validation(ValidationError::MissingSelf)
        ));

        let untagged = parse_problem("(define (problem p) (:domain d) (:init (self a)) (:goal (and (on b a))))");
        assert!(matches!(
            untagged.unwrap_err().kind(),
            ErrorKind::Validation(ValidationError::MissingAgentTag { index: 0 })
        ));

        let no_goal = parse_problem("(define (problem p) (:domain d) (:init (self a)))");
        assert!(matches!(no_goal.unwrap_err().kind(), ErrorKind::Syntax));

        let past = parse_problem(
            "(define (problem p) (:domain d) (:init (self a)) (:timed-init (:at -1 (p))) (:goal (= (self) a)))",
        );
        assert!(matches!(past.unwrap_err().kind(), ErrorKind::Invariant(_)));
    }

    #[test]
    fn source_units() -> Res<()> {
        let both = parse_source(format!(
            "{BLOCKS} (define (problem p) (:domain d) (:init (self a)) (:goal (= (self) a)))"
        ))?;
        assert!(matches!(both, Parsed::Both(..)));
        assert!(matches!(parse_source(BLOCKS)?, Parsed::Domain(_)));
        assert!(parse_problem(BLOCKS).is_err());
        assert!(parse_domain("").is_err());
        Ok(())
    }

    #[test]
    fn lex_errors_are_recovered() -> Res<()> {
        let mut session = ParseSession::new();
        let dom = session.parse_domain("(define (domain d) # (:predicates (p)))")?;
        assert_eq!(dom.predicates.len(), 1);
        assert_eq!(session.diagnostics().len(), 1);
        Ok(())
    }
}
