use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::Res;
use crate::Sym;
use crate::errors::*;
use crate::expressions::Operator;
use crate::tsal::input::Input;
use crate::tsal::lexer::{Keyword, Token, TokenKind};

/// A token other than a parenthesis.
#[derive(Clone, Debug)]
pub struct SAtom {
    pub kind: TokenKind,
    pub sym: Sym,
}

impl SAtom {
    pub fn canonical_str(&self) -> &str {
        self.sym.canonical_str()
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(kw) => Some(kw),
            _ => None,
        }
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.keyword() == Some(kw)
    }

    pub fn operator(&self) -> Option<Operator> {
        match self.kind {
            TokenKind::Operator(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_name(&self) -> bool {
        self.kind == TokenKind::Name
    }

    pub fn is_variable(&self) -> bool {
        self.kind == TokenKind::Variable
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Probability(_) | TokenKind::Decimal(_) | TokenKind::NegInteger(_) | TokenKind::PosInteger(_)
        )
    }

    /// Numeric value of the atom, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            TokenKind::Probability(x) | TokenKind::Decimal(x) => Some(x),
            TokenKind::NegInteger(i) | TokenKind::PosInteger(i) => Some(i as f64),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.kind {
            TokenKind::NegInteger(i) | TokenKind::PosInteger(i) => Some(i),
            _ => None,
        }
    }
}

impl Display for SAtom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sym)
    }
}

impl Spanned for SAtom {
    fn span(&self) -> Option<&Span> {
        self.sym.span.as_ref()
    }
}

impl Spanned for &SAtom {
    fn span(&self) -> Option<&Span> {
        (*self).span()
    }
}

#[derive(Clone, Debug)]
pub struct SList {
    items: Vec<SExpr>,
    span: Span,
}

impl SList {
    pub fn iter(&self) -> ListIter<'_> {
        ListIter {
            elems: self.items.as_slice(),
            span: &self.span,
        }
    }

    pub fn items(&self) -> &[SExpr] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn head(&self) -> Option<&SAtom> {
        self.items.first().and_then(|e| e.as_atom())
    }
}

impl Display for SList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        crate::utils::disp_slice(f, &self.items, " ")?;
        write!(f, ")")
    }
}

impl Spanned for SList {
    fn span(&self) -> Option<&Span> {
        Some(&self.span)
    }
}

#[derive(Clone, Debug)]
pub enum SExpr {
    Atom(SAtom),
    List(SList),
}

impl SExpr {
    pub fn as_atom(&self) -> Option<&SAtom> {
        match self {
            SExpr::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&SList> {
        match self {
            SExpr::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_iter(&self) -> Option<ListIter<'_>> {
        self.as_list().map(|l| l.iter())
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.as_atom().is_some_and(|a| a.is_keyword(kw))
    }

    /// True for the empty list `()`.
    pub fn is_empty_list(&self) -> bool {
        self.as_list().is_some_and(|l| l.is_empty())
    }

    /// If this expression is of the form `(kw args...)`, returns `args`.
    pub fn as_application(&self, kw: Keyword) -> Option<&[SExpr]> {
        match self.as_list()?.items() {
            [head, rest @ ..] if head.is_keyword(kw) => Some(rest),
            _ => None,
        }
    }

    /// Keyword at the head of this list, if any.
    pub fn head_keyword(&self) -> Option<Keyword> {
        self.as_list()?.head()?.keyword()
    }
}

impl Display for SExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SExpr::Atom(a) => write!(f, "{a}"),
            SExpr::List(l) => write!(f, "{l}"),
        }
    }
}

impl Spanned for SExpr {
    fn span(&self) -> Option<&Span> {
        match self {
            SExpr::Atom(a) => a.span(),
            SExpr::List(l) => l.span(),
        }
    }
}

impl Spanned for &SExpr {
    fn span(&self) -> Option<&Span> {
        (*self).span()
    }
}

/// Cursor over the elements of a list, consuming them from the front.
pub struct ListIter<'a> {
    elems: &'a [SExpr],
    span: &'a Span,
}

impl<'a> ListIter<'a> {
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn loc(&self) -> Span {
        self.span.clone()
    }

    pub fn peek(&self) -> Option<&'a SExpr> {
        self.elems.first()
    }

    /// Remaining elements, without consuming them.
    pub fn rest(&self) -> &'a [SExpr] {
        self.elems
    }

    pub fn pop(&mut self) -> Res<&'a SExpr> {
        match self.elems.split_first() {
            Some((head, tail)) => {
                self.elems = tail;
                Ok(head)
            }
            None => Err(self.span.clone().end().invalid("unexpected end of list")),
        }
    }

    pub fn pop_atom(&mut self) -> Res<&'a SAtom> {
        let e = self.pop()?;
        e.as_atom().ok_or_else(|| e.invalid("expected an atom"))
    }

    pub fn pop_list(&mut self) -> Res<&'a SList> {
        let e = self.pop()?;
        e.as_list().ok_or_else(|| e.invalid("expected a list"))
    }

    pub fn pop_keyword(&mut self, kw: Keyword) -> Res<&'a SAtom> {
        let e = self.pop()?;
        match e.as_atom() {
            Some(a) if a.is_keyword(kw) => Ok(a),
            _ => Err(e.invalid(format!("expected `{kw}`"))),
        }
    }

    /// Pops a name (an identifier that is not a reserved word).
    pub fn pop_name(&mut self) -> Res<&'a Sym> {
        let e = self.pop()?;
        match e.as_atom() {
            Some(a) if a.is_name() => Ok(&a.sym),
            _ => Err(e.invalid("expected a name")),
        }
    }

    /// Succeeds if there is no element left.
    pub fn expect_end(&self) -> Res<()> {
        match self.peek() {
            None => Ok(()),
            Some(e) => Err(e.invalid("unexpected element")),
        }
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a SExpr;

    fn next(&mut self) -> Option<Self::Item> {
        self.pop().ok()
    }
}

/// Tokenizes the input and groups its tokens into s-expressions.
/// Returns the top-level expressions along with the lexer diagnostics.
pub fn parse_many(input: Arc<Input>) -> Res<(Vec<SExpr>, Vec<Message>)> {
    let lexed = super::lexer::tokenize(input)?;
    let forms = read_forms(&lexed.tokens)?;
    Ok((forms, lexed.diagnostics))
}

fn read_forms(tokens: &[Token]) -> Res<Vec<SExpr>> {
    let mut stack: Vec<(&Span, Vec<SExpr>)> = Vec::new();
    let mut top = Vec::new();
    for tok in tokens {
        let finished = match tok.kind {
            TokenKind::LParen => {
                stack.push((&tok.span, Vec::new()));
                continue;
            }
            TokenKind::RParen => {
                let (open, items) = stack
                    .pop()
                    .ok_or_else(|| tok.span.invalid("unmatched closing parenthesis"))?;
                SExpr::List(SList {
                    items,
                    span: open.to(&tok.span),
                })
            }
            kind => SExpr::Atom(SAtom {
                kind,
                sym: Sym::with_source(tok.text(), tok.span.clone()),
            }),
        };
        match stack.last_mut() {
            Some((_, parent)) => parent.push(finished),
            None => top.push(finished),
        }
    }
    match stack.pop() {
        Some((open, _)) => Err(open.invalid("unclosed parenthesis")),
        None => Ok(top),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Res<Vec<SExpr>> {
        parse_many(Arc::new(Input::from_string(s))).map(|(forms, _)| forms)
    }

    #[test]
    fn nesting() -> Res<()> {
        let forms = parse("(define (domain d)) (a (b c) ())")?;
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].to_string(), "(define (domain d))");
        assert!(forms[0].as_application(Keyword::Define).is_some());
        let second = forms[1].as_list().unwrap();
        assert_eq!(second.len(), 3);
        assert!(second.items()[2].is_empty_list());
        assert_eq!(second.loc().str(), "(a (b c) ())");
        Ok(())
    }

    #[test]
    fn unbalanced() {
        assert!(parse("(a (b c)").is_err());
        assert!(parse("(a b))").is_err());
    }

    #[test]
    fn list_iteration() -> Res<()> {
        let forms = parse("(:action move :parameters (?x))")?;
        let mut it = forms[0].as_list_iter().unwrap();
        it.pop_keyword(Keyword::Action)?;
        assert_eq!(it.pop_name()?, "move");
        assert!(it.pop_name().is_err());
        assert!(it.pop_list()?.head().unwrap().is_variable());
        assert!(it.is_empty());
        assert!(it.pop().is_err());
        Ok(())
    }
}
