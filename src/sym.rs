use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

use compact_str::CompactString;
use derive_more::derive::Display;

use crate::errors::{Span, Spanned};

/// A name of the model: read from a TSAL source (hence lower cased) or synthesized by the parser.
///
/// The span only serves diagnostics. Two symbols with the same text are equal, ordered and hashed
/// alike wherever they come from, and a `&str` can be used to look them up in maps and sets.
#[derive(Clone, Display)]
#[display("{text}")]
pub struct Sym {
    text: CompactString,
    pub span: Option<Span>,
}

impl Sym {
    pub fn new(text: impl Into<CompactString>) -> Sym {
        Sym {
            text: text.into(),
            span: None,
        }
    }

    pub fn with_source(text: impl Into<CompactString>, source: Span) -> Sym {
        Sym {
            text: text.into(),
            span: Some(source),
        }
    }

    pub fn canonical_str(&self) -> &str {
        &self.text
    }

    /// ASCII case-insensitive comparison, used for variable names.
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.text.eq_ignore_ascii_case(other)
    }
}

impl Spanned for Sym {
    fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }
}

impl Debug for Sym {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl AsRef<str> for Sym {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl Borrow<str> for Sym {
    fn borrow(&self) -> &str {
        &self.text
    }
}

impl From<&str> for Sym {
    fn from(text: &str) -> Self {
        Sym::new(text)
    }
}

impl From<String> for Sym {
    fn from(text: String) -> Self {
        Sym::new(text)
    }
}

impl From<&Sym> for Sym {
    fn from(sym: &Sym) -> Self {
        sym.clone()
    }
}

impl PartialEq for Sym {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}
impl Eq for Sym {}

impl PartialEq<str> for Sym {
    fn eq(&self, other: &str) -> bool {
        self.canonical_str() == other
    }
}
impl PartialEq<&str> for Sym {
    fn eq(&self, other: &&str) -> bool {
        self.canonical_str() == *other
    }
}
impl PartialEq<Sym> for str {
    fn eq(&self, other: &Sym) -> bool {
        other == self
    }
}

impl PartialOrd for Sym {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Sym {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl Hash for Sym {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // must agree with `str`'s hash for `Borrow<str>` lookups
        self.canonical_str().hash(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[test]
    fn spans_do_not_affect_identity() {
        let input = std::sync::Arc::new(crate::tsal::input::Input::from_string("(on a b)"));
        let located = Sym::with_source("on", Span::new(input, 1, 2));
        let synthesized = Sym::from("on");
        assert_eq!(located, synthesized);
        assert_eq!(located, "on");
        assert!(located.span().is_some() && synthesized.span().is_none());

        let set: HashSet<Sym> = [located].into_iter().collect();
        assert!(set.contains(&synthesized));
        assert!(set.contains("on"));
    }
}
