use std::path::{Path, PathBuf};

use crate::errors::{Ctx, Message, Res};
use crate::tsal::input::Input;
use crate::tsal::legacy::{self, SourceKind};
use crate::tsal::writer::ToTsal;
use crate::{Domain, ParseSession, Problem};

/// Format of a source file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Tsal,
    /// Legacy PDDL, converted to TSAL before parsing.
    Legacy,
}

#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub format: SourceFormat,
}

impl SourceFile {
    pub fn tsal(path: impl Into<PathBuf>) -> Self {
        SourceFile {
            path: path.into(),
            format: SourceFormat::Tsal,
        }
    }

    pub fn legacy(path: impl Into<PathBuf>) -> Self {
        SourceFile {
            path: path.into(),
            format: SourceFormat::Legacy,
        }
    }

    /// Files whose name ends with `pddl` (in any case) are legacy sources, all others are TSAL.
    pub fn detect(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_legacy = path
            .to_str()
            .is_some_and(|p| p.to_ascii_lowercase().ends_with("pddl"));
        if is_legacy {
            SourceFile::legacy(path)
        } else {
            SourceFile::tsal(path)
        }
    }

    /// Path of the TSAL source to parse, converting the file first if it is a legacy one.
    fn prepare(self, kind: SourceKind) -> Res<PathBuf> {
        match self.format {
            SourceFormat::Tsal => Ok(self.path),
            SourceFormat::Legacy => legacy::convert_file(&self.path, kind)
                .map_err(Message::from)
                .ctx(format!("while converting {}", self.path.display())),
        }
    }
}

/// Reads a domain and/or a problem from files and gives access to their models and canonical text.
pub struct Interpreter {
    domain_file: Option<PathBuf>,
    problem_file: Option<PathBuf>,
    domain: Option<Domain>,
    problem: Option<Problem>,
    diagnostics: Vec<Message>,
}

impl Interpreter {
    pub fn new(domain: Option<SourceFile>, problem: Option<SourceFile>) -> Res<Self> {
        let domain_file = domain.map(|f| f.prepare(SourceKind::Domain)).transpose()?;
        let problem_file = problem.map(|f| f.prepare(SourceKind::Problem)).transpose()?;
        let mut interpreter = Interpreter {
            domain_file,
            problem_file,
            domain: None,
            problem: None,
            diagnostics: Vec::new(),
        };
        interpreter.parse()?;
        Ok(interpreter)
    }

    /// Parses the files again, in a fresh session: the result does not depend on previous parses.
    pub fn parse(&mut self) -> Res<()> {
        let mut session = ParseSession::new();
        self.domain = match &self.domain_file {
            Some(path) => Some(parse_file(path, |input| session.parse_domain(input))?),
            None => None,
        };
        self.problem = match &self.problem_file {
            Some(path) => Some(parse_file(path, |input| session.parse_problem(input))?),
            None => None,
        };
        self.diagnostics = session.into_diagnostics();
        Ok(())
    }

    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    pub fn problem(&self) -> Option<&Problem> {
        self.problem.as_ref()
    }

    /// Warnings raised by the lexer during the last parse.
    pub fn diagnostics(&self) -> &[Message] {
        &self.diagnostics
    }

    pub fn render_domain(&self) -> Res<Option<String>> {
        self.domain
            .as_ref()
            .map(|d| d.to_tsal().map_err(Message::from))
            .transpose()
    }

    pub fn render_problem(&self) -> Res<Option<String>> {
        self.problem
            .as_ref()
            .map(|p| p.to_tsal().map_err(Message::from))
            .transpose()
    }
}

fn parse_file<T>(path: &Path, parse: impl FnOnce(Input) -> Res<T>) -> Res<T> {
    tracing::info!(file = %path.display(), "parsing");
    let input = Input::from_file(path).map_err(Message::from).ctx(format!("while reading {}", path.display()))?;
    parse(input)
}
