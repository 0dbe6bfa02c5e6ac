use std::path::Path;

/// Source text of a TSAL document, together with the file it was read from.
///
/// Text is normalized on construction: every line is lower cased, trailing blanks are
/// removed and everything after a `;` is dropped as a comment.
pub struct Input {
    pub(crate) text: String,
    pub(crate) source: Option<String>,
}

impl Input {
    pub fn from_string(input: impl AsRef<str>) -> Input {
        Input {
            text: normalize(input.as_ref()),
            source: None,
        }
    }

    pub fn from_file(file: &Path) -> Result<Input, std::io::Error> {
        let s = std::fs::read_to_string(file)?;
        Ok(Input {
            text: normalize(&s),
            source: Some(file.display().to_string()),
        })
    }

    /// Input whose text is kept as is, used to display entities that have no source.
    pub(crate) fn verbatim(text: impl ToString) -> Input {
        Input {
            text: text.to_string(),
            source: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Input::from_string(s)
    }
}

impl From<String> for Input {
    fn from(s: String) -> Self {
        Input::from_string(s)
    }
}

impl TryFrom<&Path> for Input {
    type Error = std::io::Error;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        Input::from_file(path)
    }
}

/// Lower cases the text and strips `;` comments, line by line.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let code = match line.find(';') {
            Some(comment) => &line[..comment],
            None => line,
        };
        out.push_str(&code.trim_end().to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_case_are_normalized() {
        let input = Input::from_string("(Define ; a comment\n  (DOMAIN Blocks))   \n");
        assert_eq!(input.text(), "(define\n  (domain blocks))");
        assert!(input.source().is_none());
    }

    #[test]
    fn verbatim_input_is_untouched() {
        assert_eq!(Input::verbatim("FORALL0 ; x").text(), "FORALL0 ; x");
    }
}
