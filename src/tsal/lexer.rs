//! Tokenization of normalized TSAL text.
//!
//! Rules are tried in a fixed order and the first one matching at the current position wins
//! (no longest-match): this is what makes `0.75` a probability rather than a decimal and `-3` a
//! negative integer rather than a minus sign followed by an integer.

use std::sync::{Arc, LazyLock};

use annotate_snippets::Level;
use derive_more::derive::Display;
use regex::Regex;

use crate::errors::{Message, Res, Span};
use crate::expressions::Operator;
use crate::tsal::input::Input;

/// Reserved words of the language.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum Keyword {
    #[display("define")]
    Define,
    #[display("domain")]
    Domain,
    #[display("problem")]
    Problem,
    #[display(":domain")]
    DomainRef,
    #[display(":requirements")]
    Requirements,
    #[display(":types")]
    Types,
    #[display(":constants")]
    Constants,
    #[display(":predicates")]
    Predicates,
    #[display(":fluents")]
    Fluents,
    #[display(":bounds")]
    Bounds,
    #[display(":derived")]
    Derived,
    #[display(":derived-predicates")]
    DerivedPredicates,
    #[display(":processes")]
    Processes,
    #[display(":action")]
    Action,
    #[display(":actions")]
    Actions,
    #[display(":event")]
    Event,
    #[display(":events")]
    Events,
    #[display(":parameters")]
    Parameters,
    #[display(":precondition")]
    Precondition,
    #[display(":effect")]
    Effect,
    #[display(":duration")]
    Duration,
    #[display(":interarrival")]
    Interarrival,
    #[display(":objects")]
    Objects,
    #[display(":init")]
    Init,
    #[display(":timed-init")]
    TimedInit,
    #[display(":goal")]
    Goal,
    #[display(":metric")]
    Metric,
    #[display(":at")]
    At,
    #[display("and")]
    And,
    #[display("not")]
    Not,
    #[display("or")]
    Or,
    #[display("oneof")]
    Oneof,
    #[display("forall")]
    Forall,
    #[display("when")]
    When,
    #[display("probabilistic")]
    Probabilistic,
}

impl Keyword {
    const ALL: [Keyword; 35] = [
        Keyword::Define,
        Keyword::Domain,
        Keyword::Problem,
        Keyword::DomainRef,
        Keyword::Requirements,
        Keyword::Types,
        Keyword::Constants,
        Keyword::Predicates,
        Keyword::Fluents,
        Keyword::Bounds,
        Keyword::Derived,
        Keyword::DerivedPredicates,
        Keyword::Processes,
        Keyword::Action,
        Keyword::Actions,
        Keyword::Event,
        Keyword::Events,
        Keyword::Parameters,
        Keyword::Precondition,
        Keyword::Effect,
        Keyword::Duration,
        Keyword::Interarrival,
        Keyword::Objects,
        Keyword::Init,
        Keyword::TimedInit,
        Keyword::Goal,
        Keyword::Metric,
        Keyword::At,
        Keyword::And,
        Keyword::Not,
        Keyword::Or,
        Keyword::Oneof,
        Keyword::Forall,
        Keyword::When,
        Keyword::Probabilistic,
    ];

    /// Looks up a reserved word by its exact (lower case) spelling.
    pub fn from_reserved(word: &str) -> Option<Keyword> {
        static RESERVED: LazyLock<hashbrown::HashMap<String, Keyword>> =
            LazyLock::new(|| Keyword::ALL.into_iter().map(|k| (k.to_string(), k)).collect());
        RESERVED.get(word).copied()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Name,
    Variable,
    Keyword(Keyword),
    /// `0` or `1` followed by a fractional part
    Probability(f64),
    Decimal(f64),
    NegInteger(i64),
    PosInteger(i64),
    /// Any operator other than parentheses. The hyphen of typed lists is an `Operator::Minus`.
    Operator(Operator),
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text(&self) -> &str {
        self.span.str()
    }
}

#[derive(Copy, Clone, Debug)]
enum Rule {
    Word,
    DigitWord,
    Variable,
    Probability,
    Decimal,
    NegInteger,
    PosInteger,
    Punctuation,
}

static RULES: LazyLock<Vec<(Rule, Regex)>> = LazyLock::new(|| {
    [
        (Rule::Word, r"^:?[a-zA-Z_][a-zA-Z_0-9\-]*"),
        (Rule::DigitWord, r"^[0-9]+[a-zA-Z_][a-zA-Z_0-9\-]*"),
        (Rule::Variable, r"^\?[a-zA-Z_][a-zA-Z_0-9\-]*"),
        (Rule::Probability, r"^[0-1]\.[0-9]+"),
        (Rule::Decimal, r"^[+\-]?[0-9]*\.[0-9]+"),
        (Rule::NegInteger, r"^-[0-9]+"),
        (Rule::PosInteger, r"^[0-9]+"),
        (Rule::Punctuation, r"^(?:!=|>=|<=|\+|\*|\(|\)|-|/|=|>|<|%)"),
    ]
    .into_iter()
    .map(|(rule, re)| (rule, Regex::new(re).expect("invalid lexer rule")))
    .collect()
});

/// Result of tokenizing an input: the tokens and the diagnostics for the characters that were skipped.
/// A numeric literal that does not fit its type is not skippable and fails the tokenization.
#[derive(Debug)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Message>,
}

pub fn tokenize(input: Arc<Input>) -> Res<Lexed> {
    let text = input.text.as_str();
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    let mut pos = 0;
    while let Some(c) = text[pos..].chars().next() {
        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }
        let rest = &text[pos..];
        let matched = RULES
            .iter()
            .find_map(|(rule, re)| re.find(rest).map(|m| (*rule, m.end())));
        match matched {
            Some((rule, len)) => {
                let span = Span::new(input.clone(), pos, pos + len - 1);
                let kind = classify(rule, &rest[..len]).ok_or_else(|| span.invalid("number out of range"))?;
                tokens.push(Token { kind, span });
                pos += len;
            }
            None => {
                let span = Span::new(input.clone(), pos, pos + c.len_utf8() - 1);
                tracing::warn!("illegal character '{c}' at byte {pos}, skipped");
                diagnostics.push(
                    Message::warning(format!("illegal character: {c}")).snippet(span.annotate(Level::WARNING, "skipped")),
                );
                pos += c.len_utf8();
            }
        }
    }
    Ok(Lexed { tokens, diagnostics })
}

fn classify(rule: Rule, lexeme: &str) -> Option<TokenKind> {
    Some(match rule {
        Rule::Word => match Keyword::from_reserved(lexeme) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Name,
        },
        Rule::DigitWord => TokenKind::Name,
        Rule::Variable => TokenKind::Variable,
        Rule::Probability => TokenKind::Probability(lexeme.parse().ok()?),
        Rule::Decimal => TokenKind::Decimal(lexeme.parse().ok()?),
        Rule::NegInteger => TokenKind::NegInteger(lexeme.parse().ok()?),
        Rule::PosInteger => TokenKind::PosInteger(lexeme.parse().ok()?),
        Rule::Punctuation => match lexeme {
            "(" => TokenKind::LParen,
            ")" => TokenKind::RParen,
            op => TokenKind::Operator(Operator::from_symbol(op)?),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(s: &str) -> Vec<TokenKind> {
        tokenize(Arc::new(Input::from_string(s)))
            .unwrap()
            .tokens
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn numeric_precedence() {
        assert_eq!(kinds("0.75"), vec![TokenKind::Probability(0.75)]);
        assert_eq!(kinds("-3"), vec![TokenKind::NegInteger(-3)]);
        assert_eq!(kinds("3"), vec![TokenKind::PosInteger(3)]);
        assert_eq!(kinds("2.5"), vec![TokenKind::Decimal(2.5)]);
        assert_eq!(kinds("-0.5"), vec![TokenKind::Decimal(-0.5)]);
        assert_eq!(kinds(".5"), vec![TokenKind::Decimal(0.5)]);
        // first applicable rule, not longest match
        assert_eq!(kinds("1.25"), vec![TokenKind::Probability(1.25)]);
    }

    #[test]
    fn words() {
        assert_eq!(
            kinds("(:action move-to ?x - block)"),
            vec![
                TokenKind::LParen,
                TokenKind::Keyword(Keyword::Action),
                TokenKind::Name,
                TokenKind::Variable,
                TokenKind::Operator(Operator::Minus),
                TokenKind::Name,
                TokenKind::RParen,
            ]
        );
        assert_eq!(kinds(":strips"), vec![TokenKind::Name]);
        assert_eq!(kinds("0forall"), vec![TokenKind::Name]);
        assert_eq!(kinds("forall1"), vec![TokenKind::Name]);
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("!= >= <= + * / = > < %"),
            [
                Operator::Neq,
                Operator::GtEq,
                Operator::LtEq,
                Operator::Plus,
                Operator::Times,
                Operator::Divide,
                Operator::Equals,
                Operator::Gt,
                Operator::Lt,
                Operator::Mod
            ]
            .into_iter()
            .map(TokenKind::Operator)
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn illegal_characters_are_skipped() {
        let lexed = tokenize(Arc::new(Input::from_string("(on # a)"))).unwrap();
        assert_eq!(lexed.tokens.len(), 4);
        assert_eq!(lexed.tokens[2].text(), "a");
        assert_eq!(lexed.diagnostics.len(), 1);
        assert!(lexed.diagnostics[0].is_warning());
        assert!(lexed.diagnostics[0].title().contains('#'));
    }

    #[test]
    fn oversized_numbers_are_errors() {
        let err = tokenize(Arc::new(Input::from_string("(at 99999999999999999999 (p))"))).unwrap_err();
        assert!(err.title().contains("number out of range"));
        assert!(err.title().contains("99999999999999999999"));
        assert!(!err.is_warning());
        assert!(tokenize(Arc::new(Input::from_string("(at 9223372036854775807 (p))"))).is_ok());
    }
}
