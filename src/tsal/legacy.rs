//! Textual conversion between legacy PDDL sources and TSAL.
//!
//! The conversion never parses the source: it works on balanced parenthesized groups anchored on
//! section keywords, and on a fixed table of operator spellings.
//!  - legacy to TSAL: actions, events and derived predicates are gathered into their
//!    `(:actions ...)`, `(:events ...)` and `(:derived-predicates ...)` containers,
//!    and the metric of a problem is dropped. Derived predicates always precede the operators.
//!  - TSAL to legacy: containers are unwrapped, processes and timed initial literals are dropped.
//!
//! Parentheses inside `;` comments and string literals are ignored.
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::expressions::Operator;

/// Whether a source holds a domain or a problem.
#[derive(Copy, Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub enum SourceKind {
    #[display("domain")]
    Domain,
    #[display("problem")]
    Problem,
}

/// Legacy spelling and TSAL spelling of each operator.
const KEYWORDS: [(&str, &str); 7] = [
    (":functions", ":fluents"),
    ("(increase", "(+"),
    ("(decrease", "(-"),
    ("(eq", "(="),
    ("(set", "(="),
    ("(neq", "(!="),
    ("(mod", "(%"),
];

fn anchor(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("invalid section anchor")
}

static LEGACY_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| anchor(r"(:functions|\((?:increase|decrease|eq|set|neq|mod))(\s|\)|$)"));
static FLUENTS_SECTION: LazyLock<Regex> = LazyLock::new(|| anchor(r"(:fluents)(\s|\)|$)"));

static ACTION: LazyLock<Regex> = LazyLock::new(|| anchor(r"\(:action\s"));
static ACTIONS: LazyLock<Regex> = LazyLock::new(|| anchor(r"\(:actions\s"));
static EVENT: LazyLock<Regex> = LazyLock::new(|| anchor(r"\(:event\s"));
static EVENTS: LazyLock<Regex> = LazyLock::new(|| anchor(r"\(:events\s"));
static DERIVED: LazyLock<Regex> = LazyLock::new(|| anchor(r"\(:derived\s"));
static DERIVED_PREDICATES: LazyLock<Regex> = LazyLock::new(|| anchor(r"\(:derived-predicates\s"));
static PROCESSES: LazyLock<Regex> = LazyLock::new(|| anchor(r"\(:processes\s"));
static METRIC: LazyLock<Regex> = LazyLock::new(|| anchor(r"\(:metric\s"));
static TIMED_INIT: LazyLock<Regex> = LazyLock::new(|| anchor(r"\(:timed-init\s"));

/// Rewrites a legacy source into TSAL.
pub fn legacy_to_tsal(text: &str, kind: SourceKind) -> String {
    let text = tsal_keywords(text);
    match kind {
        SourceKind::Domain => {
            let text = wrap_groups(&text, &ACTION, ":actions");
            let text = wrap_groups(&text, &EVENT, ":events");
            wrap_groups_before(&text, &DERIVED, ":derived-predicates", &[&*ACTIONS, &*EVENTS])
        }
        SourceKind::Problem => extract_groups(&text, &METRIC).0,
    }
}

/// Rewrites a TSAL source into the legacy format.
pub fn tsal_to_legacy(text: &str, kind: SourceKind) -> String {
    let text = legacy_keywords(text);
    match kind {
        SourceKind::Domain => {
            let text = unwrap_groups(&text, &ACTIONS, &ACTION);
            let text = unwrap_groups(&text, &EVENTS, &EVENT);
            let text = unwrap_groups(&text, &DERIVED_PREDICATES, &DERIVED);
            extract_groups(&text, &PROCESSES).0
        }
        SourceKind::Problem => extract_groups(&text, &TIMED_INIT).0,
    }
}

/// Converts a legacy file to TSAL, writing the result next to it: the last four characters of the
/// file name are replaced by `tsal` (`rover.pddl` becomes `rover.tsal`). Returns the path of the written file.
pub fn convert_file(path: impl AsRef<Path>, kind: SourceKind) -> io::Result<PathBuf> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("not a file: {}", path.display())))?;
    let stem = name.get(..name.len().saturating_sub(4)).unwrap_or(name);
    let target = path.with_file_name(format!("{stem}tsal"));
    let text = std::fs::read_to_string(path)?;
    std::fs::write(&target, legacy_to_tsal(&text, kind))?;
    tracing::info!(source = %path.display(), target = %target.display(), "converted legacy {kind}");
    Ok(target)
}

/// For each byte of `text`, true if it is code, false if it belongs to a comment or a string literal.
fn code_mask(text: &str) -> Vec<bool> {
    let bytes = text.as_bytes();
    let mut mask = vec![true; bytes.len()];
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b';' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    mask[i] = false;
                    i += 1;
                }
            }
            b'"' => {
                mask[i] = false;
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    mask[i] = false;
                    i += 1;
                }
                if i < bytes.len() {
                    mask[i] = false;
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    mask
}

/// End (exclusive) of the balanced group whose opening parenthesis is at `start`.
fn balanced_group(text: &str, mask: &[bool], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.bytes().enumerate().skip(start) {
        if !mask[i] {
            continue;
        }
        match c {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// A group removed from a text.
struct Group {
    /// Text of the group, from its opening to its closing parenthesis.
    text: String,
    /// Indentation of the line of the group, if the group starts a line.
    indent: String,
    /// Position of the group in the text it was removed from.
    at: usize,
    /// True if the newline that followed the group was removed with it.
    ended_line: bool,
}

/// Removes from `text` all top-level groups opened by `anchor`, returning the remaining text and the groups.
/// A group alone on its lines is removed along with its indentation and the newline that follows it.
fn extract_groups(text: &str, anchor: &Regex) -> (String, Vec<Group>) {
    let mask = code_mask(text);
    let mut spans: Vec<(Range<usize>, Range<usize>, bool)> = Vec::new();
    for m in anchor.find_iter(text) {
        let start = m.start();
        if !mask[start] || spans.last().is_some_and(|(removed, _, _)| start < removed.end) {
            continue;
        }
        let Some(end) = balanced_group(text, &mask, start) else {
            tracing::debug!("unbalanced group at byte {start}, left as is");
            continue;
        };
        let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
        let removal_start = if text[line_start..start].trim().is_empty() {
            line_start
        } else {
            start
        };
        let ended_line = text[end..].starts_with('\n');
        let removal_end = if ended_line { end + 1 } else { end };
        spans.push((removal_start..removal_end, start..end, ended_line));
    }

    let mut rest = String::with_capacity(text.len());
    let mut groups = Vec::with_capacity(spans.len());
    let mut last = 0;
    for (removed, group, ended_line) in spans {
        rest.push_str(&text[last..removed.start]);
        groups.push(Group {
            text: text[group.clone()].to_string(),
            indent: text[removed.start..group.start].to_string(),
            at: rest.len(),
            ended_line,
        });
        last = removed.end;
    }
    rest.push_str(&text[last..]);
    tracing::debug!(anchor = anchor.as_str(), count = groups.len(), "extracted groups");
    (rest, groups)
}

/// Gathers the groups opened by `anchor` into a `(container ...)` group placed where the first of them was.
fn wrap_groups(text: &str, anchor: &Regex, container: &str) -> String {
    let (mut rest, groups) = extract_groups(text, anchor);
    let Some(first) = groups.first() else {
        return rest;
    };
    let mut block = container_block(&groups, container, &first.indent);
    if first.ended_line {
        block.push('\n');
    }
    rest.insert_str(first.at, &block);
    rest
}

/// Like [`wrap_groups`], but the container is placed before the first group opened by one of `successors`
/// when there is one.
fn wrap_groups_before(text: &str, anchor: &Regex, container: &str, successors: &[&Regex]) -> String {
    let (mut rest, groups) = extract_groups(text, anchor);
    let Some(first) = groups.first() else {
        return rest;
    };
    let mask = code_mask(&rest);
    let successor = successors
        .iter()
        .filter_map(|re| re.find_iter(&rest).map(|m| m.start()).find(|&start| mask[start]))
        .min();
    let Some(start) = successor else {
        let mut block = container_block(&groups, container, &first.indent);
        if first.ended_line {
            block.push('\n');
        }
        rest.insert_str(first.at, &block);
        return rest;
    };
    let line_start = rest[..start].rfind('\n').map_or(0, |i| i + 1);
    let (at, indent) = if rest[line_start..start].trim().is_empty() {
        (line_start, rest[line_start..start].to_string())
    } else {
        (start, String::new())
    };
    let mut block = container_block(&groups, container, &indent);
    block.push(if at == line_start { '\n' } else { ' ' });
    rest.insert_str(at, &block);
    rest
}

/// `(container ...)` holding `groups`, one level deeper than `indent`. The last line is not terminated.
fn container_block(groups: &[Group], container: &str, indent: &str) -> String {
    let mut block = format!("{indent}({container}\n");
    for group in groups {
        for (i, line) in group.text.lines().enumerate() {
            if i == 0 {
                block.push_str(indent);
            }
            block.push('\t');
            block.push_str(line);
            block.push('\n');
        }
    }
    block.push_str(indent);
    block.push(')');
    block
}

/// Replaces each container group opened by `container` by the `item` groups it holds.
fn unwrap_groups(text: &str, container: &Regex, item: &Regex) -> String {
    let (mut rest, containers) = extract_groups(text, container);
    // later insertions first, earlier positions stay valid
    for c in containers.iter().rev() {
        let (_, items) = extract_groups(&c.text, item);
        let mut block = String::new();
        for group in &items {
            for (i, line) in group.text.lines().enumerate() {
                if i == 0 {
                    block.push_str(&c.indent);
                    block.push_str(line);
                } else {
                    block.push_str(line.strip_prefix('\t').unwrap_or(line));
                }
                block.push('\n');
            }
        }
        if !c.ended_line && block.ends_with('\n') {
            block.pop();
        }
        rest.insert_str(c.at, &block);
    }
    rest
}

/// Legacy to TSAL operator spellings.
fn tsal_keywords(text: &str) -> String {
    let mask = code_mask(text);
    LEGACY_KEYWORD
        .replace_all(text, |caps: &Captures| {
            let (Some(kw), Some(next)) = (caps.get(1), caps.get(2)) else {
                return String::new();
            };
            let spelling = KEYWORDS
                .iter()
                .find(|(legacy, _)| legacy.eq_ignore_ascii_case(kw.as_str()))
                .filter(|_| mask[kw.start()])
                .map_or(kw.as_str(), |(_, tsal)| tsal);
            format!("{spelling}{}", next.as_str())
        })
        .into_owned()
}

/// List being scanned by [`legacy_keywords`].
#[derive(Default)]
struct Frame {
    /// Inside the value of an `:effect` key.
    in_effect: bool,
    /// The last key met in this list is `:effect`: the lists that follow are effects.
    effect_key: bool,
    /// The list is an operator application (`(+ a b)`, `(> a b)`, ...).
    is_operator: bool,
}

/// TSAL to legacy operator spellings.
///
/// `=`, `+` and `-` are fluent updates (`set`, `increase`, `decrease`) when they appear directly
/// in an effect and apply to a parenthesized fluent. Elsewhere `=` is `eq`, and `+` and `-` are left as is.
fn legacy_keywords(text: &str) -> String {
    let mask = code_mask(text);
    let bytes = text.as_bytes();
    let token_end = |mut j: usize| {
        while j < bytes.len() && mask[j] && !bytes[j].is_ascii_whitespace() && bytes[j] != b'(' && bytes[j] != b')' {
            j += 1;
        }
        j
    };
    let mut stack = vec![Frame::default()];
    let mut edits: Vec<(Range<usize>, &str)> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !mask[i] || bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        match bytes[i] {
            b'(' => {
                let (in_effect, parent_is_operator) = stack
                    .last()
                    .map_or((false, false), |p| (p.in_effect || p.effect_key, p.is_operator));
                let head_start = i + 1;
                let head_end = token_end(head_start);
                let head = &text[head_start..head_end];
                let applies_to_fluent = text[head_end..].trim_start().starts_with('(');
                let update = in_effect && !parent_is_operator && applies_to_fluent;
                let spelling = match head {
                    "=" if update => Some("set"),
                    "=" => Some("eq"),
                    "+" if update => Some("increase"),
                    "-" if update => Some("decrease"),
                    "!=" => Some("neq"),
                    "%" => Some("mod"),
                    _ => None,
                };
                if let Some(spelling) = spelling {
                    edits.push((head_start..head_end, spelling));
                }
                stack.push(Frame {
                    in_effect,
                    effect_key: false,
                    is_operator: Operator::from_symbol(head).is_some(),
                });
                i = head_end.max(i + 1);
            }
            b')' => {
                if stack.len() > 1 {
                    stack.pop();
                }
                i += 1;
            }
            _ => {
                let end = token_end(i).max(i + 1);
                let atom = &text[i..end];
                if atom.starts_with(':') {
                    if let Some(top) = stack.last_mut() {
                        top.effect_key = atom.eq_ignore_ascii_case(":effect");
                    }
                }
                i = end;
            }
        }
    }

    let mut out = text.to_string();
    for (range, spelling) in edits.into_iter().rev() {
        out.replace_range(range, spelling);
    }
    let mask = code_mask(&out);
    FLUENTS_SECTION
        .replace_all(&out, |caps: &Captures| match (caps.get(1), caps.get(2)) {
            (Some(kw), Some(next)) if mask[kw.start()] => format!(":functions{}", next.as_str()),
            _ => caps.get(0).map_or(String::new(), |m| m.as_str().to_string()),
        })
        .into_owned()
}
