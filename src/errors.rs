use std::{
    fmt::{Debug, Display},
    ops::Range,
    sync::Arc,
};

use crate::{Sym, tsal::input::Input};
use annotate_snippets::*;
use thiserror::Error;

pub type Res<T> = Result<T, Message>;

pub type SrcRange = Range<usize>;

/// A substring of a file, with metadata for displaying (filename, indices, ...)
#[derive(Clone)]
pub struct Span {
    input: Arc<Input>,
    span: SrcRange,
}

impl Span {
    /// Span covering the bytes `first..=last` of the input.
    pub fn new(input: Arc<Input>, first: usize, last: usize) -> Self {
        Span {
            input,
            span: first..(last + 1),
        }
    }

    pub fn str(&self) -> &str {
        &self.input.text.as_str()[self.span.clone()]
    }

    /// Span extending from the start of `self` to the end of `other`.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            input: self.input.clone(),
            span: self.span.start..other.span.end.max(self.span.start),
        }
    }

    pub fn annotate(&self, lvl: Level<'static>, message: impl ToString) -> Annot {
        Annot {
            level: lvl,
            span: self.clone(),
            message: message.to_string(),
        }
    }

    pub fn error(&self, message: impl ToString) -> Annot {
        self.annotate(Level::ERROR, message)
    }

    /// Span of the last character
    pub fn end(self) -> Self {
        let last = self.span.end.saturating_sub(1).max(self.span.start);
        Self {
            input: self.input,
            span: last..(last + 1),
        }
    }

    pub fn invalid(&self, msg: impl ToString) -> Message {
        let msg = msg.to_string();
        if self.span.len() < 40 {
            Message::error(format!("{msg}: {}", self.str())).snippet(self.clone().error(msg))
        } else {
            Message::error(&msg).snippet(self.clone().error(msg))
        }
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{}]", self.span.start, self.span.end)
    }
}

pub trait Spanned: Display {
    fn span(&self) -> Option<&Span>;

    fn span_or_default(&self) -> Span {
        self.span().cloned().unwrap_or_else(|| {
            // no source for this entity (e.g. synthesized), display it on its own
            let text = self.to_string();
            let span = 0..text.len();
            Span {
                input: Arc::new(Input::verbatim(text)),
                span,
            }
        })
    }

    fn loc(&self) -> Span {
        self.span_or_default()
    }

    fn invalid(&self, msg: impl ToString) -> Message {
        self.span_or_default().invalid(msg)
    }

    fn error(&self, message: impl ToString) -> Annot {
        self.annotate(Level::ERROR, message)
    }

    fn annotate(&self, lvl: Level<'static>, message: impl ToString) -> Annot {
        Annot {
            level: lvl,
            span: self.span_or_default(),
            message: message.to_string(),
        }
    }
}

impl Spanned for &Sym {
    fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }
}

pub struct Annot {
    level: Level<'static>,
    span: Span,
    message: String,
}

impl Annot {
    fn build(&self) -> Snippet<'_, Annotation<'_>> {
        let annotation_kind = match self.level {
            Level::ERROR => AnnotationKind::Primary,
            _ => AnnotationKind::Context,
        };
        let annotation = annotation_kind.span(self.span.span.clone()).label(&self.message);
        let snippet = Snippet::source(&self.span.input.text)
            .line_start(1)
            .fold(true)
            .annotation(annotation);
        if let Some(file) = self.span.input.source.as_ref() {
            snippet.path(file.as_str())
        } else {
            snippet
        }
    }
}

/// Violation of a structural rule of the model (e.g. a probability outside of `[0, 1]`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {entity}: {invariant}")]
pub struct InvariantError {
    pub entity: &'static str,
    pub invariant: String,
}

impl InvariantError {
    pub fn new(entity: &'static str, invariant: impl ToString) -> Self {
        InvariantError {
            entity,
            invariant: invariant.to_string(),
        }
    }
}

/// Cross-entity rules of a planning problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no `self` entry in the initial state: the owning agent is unknown")]
    MissingSelf,
    #[error("the initial state declares two owning agents: `{0}` and `{1}`")]
    DuplicateSelf(Sym, Sym),
    #[error("goal #{index} is not tagged with its agent, expected an `(= (self) <agent>)` entry")]
    MissingAgentTag { index: usize },
    #[error("goal #{index} is tagged with more than one agent")]
    AmbiguousAgentTag { index: usize },
    #[error("more than one goal for agent `{0}`")]
    DuplicateAgentGoal(Sym),
}

/// An entity that has no canonical TSAL rendering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    #[error("`{owner}` has an empty effect")]
    EmptyEffect { owner: String },
    #[error("branch #{branch} of `{owner}` has an empty effect")]
    EmptyBranch { owner: String, branch: usize },
    #[error("problem `{problem}` has no goal")]
    EmptyGoal { problem: String },
    #[error("formatting failed")]
    Fmt(#[from] std::fmt::Error),
}

impl SerializeError {
    /// Names the operator whose effect could not be written.
    pub fn within(self, owner: &Sym) -> SerializeError {
        match self {
            SerializeError::EmptyEffect { .. } => SerializeError::EmptyEffect {
                owner: owner.to_string(),
            },
            SerializeError::EmptyBranch { branch, .. } => SerializeError::EmptyBranch {
                owner: owner.to_string(),
                branch,
            },
            e => e,
        }
    }
}

/// Category of a [`Message`], allowing callers to react to a failure without parsing its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Invariant(InvariantError),
    Validation(ValidationError),
    /// A construct that is recognized but not supported (e.g. a top-level conditional effect).
    Unsupported(String),
    Serialization(SerializeError),
    Io,
}

#[derive(Error)]
pub struct Message {
    level: Level<'static>,
    kind: ErrorKind,
    title: String,
    snippets: Vec<Annot>,
    info: Vec<String>,
}

impl Message {
    pub fn new(level: Level<'static>, title: impl ToString) -> Self {
        Self {
            level,
            kind: ErrorKind::Syntax,
            title: title.to_string(),
            snippets: Vec::new(),
            info: Vec::new(),
        }
    }

    pub fn error(title: impl ToString) -> Self {
        Self::new(Level::ERROR, title)
    }

    /// A recoverable problem, reported without interrupting the processing.
    pub fn warning(title: impl ToString) -> Self {
        Self::new(Level::WARNING, title)
    }

    pub fn unsupported(construct: impl ToString) -> Self {
        let construct = construct.to_string();
        Self::error(format!("unsupported construct: {construct}")).with_kind(ErrorKind::Unsupported(construct))
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_warning(&self) -> bool {
        self.level == Level::WARNING
    }

    pub fn snippet(mut self, snippet: Annot) -> Self {
        self.snippets.push(snippet);
        self
    }

    pub fn ctx(mut self, s: impl ToString) -> Message {
        self.info.push(s.to_string());
        self
    }
}

impl From<InvariantError> for Message {
    fn from(e: InvariantError) -> Self {
        Message::error(&e).with_kind(ErrorKind::Invariant(e))
    }
}

impl From<ValidationError> for Message {
    fn from(e: ValidationError) -> Self {
        Message::error(&e).with_kind(ErrorKind::Validation(e))
    }
}

impl From<SerializeError> for Message {
    fn from(e: SerializeError) -> Self {
        Message::error(&e).with_kind(ErrorKind::Serialization(e))
    }
}

impl From<std::io::Error> for Message {
    fn from(e: std::io::Error) -> Self {
        Message::error(e).with_kind(ErrorKind::Io)
    }
}

pub trait Ctx<T> {
    fn ctx(self, error_context: impl Display) -> std::result::Result<T, Message>;
}
impl<T> Ctx<T> for std::result::Result<T, Message> {
    fn ctx(self, error_context: impl Display) -> Result<T, Message> {
        self.map_err(|e| e.ctx(error_context))
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let renderer = Renderer::styled();
        let disp = self
            .level
            .clone()
            .primary_title(&self.title)
            .elements(self.snippets.iter().map(|s| s.build()));
        let disp = renderer.render(&[disp]);
        f.write_str(&disp)?;
        for info in &self.info {
            write!(f, "\n  note: {info}")?;
        }
        Ok(())
    }
}
impl Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

pub trait ErrorMessageExt<T> {
    /// Replaces the title of the error, keeping its annotations.
    fn title(self, title: impl ToString) -> Result<T, Message>;
    /// Annotates the error with the location of `tagged`.
    fn tag(self, tagged: impl Spanned, tag: impl ToString, level: Option<Level<'static>>) -> Result<T, Message>;
}

impl<T> ErrorMessageExt<T> for Result<T, Message> {
    fn title(self, title: impl ToString) -> Result<T, Message> {
        self.map_err(|mut m| {
            m.title = title.to_string();
            m
        })
    }

    fn tag(self, tagged: impl Spanned, tag: impl ToString, level: Option<Level<'static>>) -> Result<T, Message> {
        self.map_err(|m| m.snippet(tagged.annotate(level.unwrap_or(Level::INFO), tag)))
    }
}

/// Attaches a source location to model-level errors (which carry none).
pub(crate) trait Located<T> {
    fn located(self, span: &Span) -> Res<T>;
}

impl<T, E: Into<Message>> Located<T> for Result<T, E> {
    fn located(self, span: &Span) -> Res<T> {
        self.map_err(|e| {
            let msg: Message = e.into();
            let label = msg.title.clone();
            msg.snippet(span.error(label))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_keep_their_kind() {
        let msg: Message = InvariantError::new("probabilistic effect", "probability 1.5 is not in [0, 1]").into();
        assert_eq!(
            msg.kind(),
            &ErrorKind::Invariant(InvariantError::new(
                "probabilistic effect",
                "probability 1.5 is not in [0, 1]"
            ))
        );
        let msg: Message = ValidationError::MissingSelf.into();
        assert!(matches!(msg.kind(), ErrorKind::Validation(ValidationError::MissingSelf)));
        assert!(!msg.is_warning());
    }

    #[test]
    fn located_errors_render_the_source() {
        let input = Arc::new(Input::from_string("(define (domain d))"));
        let span = Span::new(input, 8, 17);
        let res: Result<(), InvariantError> = Err(InvariantError::new("domain", "is empty"));
        let msg = res.located(&span).unwrap_err();
        assert_eq!(msg.title(), "invalid domain: is empty");
        assert!(msg.to_string().contains("(define"));
    }

    #[test]
    fn serialize_errors_name_their_owner() {
        let e = SerializeError::EmptyEffect { owner: "effect".into() }.within(&Sym::from("move"));
        assert_eq!(e.to_string(), "`move` has an empty effect");
    }
}
