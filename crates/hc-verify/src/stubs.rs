// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pattern-based stub detection.
//!
//! Catches the ways a "finished" file can still be hollow: TODO/FIXME
//! markers, `NotImplementedError`, bare `...` statements, and function
//! bodies that are a lone `pass`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static DEF_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:async\s+)?def\s+\w+").expect("def regex"));

/// What kind of stub was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StubKind {
    /// A `TODO` marker.
    Todo,
    /// A `FIXME` marker.
    Fixme,
    /// `raise NotImplementedError`.
    NotImplemented,
    /// A bare `...` statement.
    Ellipsis,
    /// A function body that is a single `pass`.
    EmptyBody,
}

impl StubKind {
    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Fixme => "fixme",
            Self::NotImplemented => "not_implemented",
            Self::Ellipsis => "ellipsis",
            Self::EmptyBody => "empty_body",
        }
    }
}

/// One detected stub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StubLocation {
    /// One-based line number.
    pub line: u32,
    /// The matched stub kind.
    pub kind: StubKind,
    /// The offending line, trimmed.
    pub text: String,
}

/// Scan source text for stub patterns.
#[must_use]
pub fn detect_stubs(source: &str) -> Vec<StubLocation> {
    let lines: Vec<&str> = source.lines().collect();
    let mut stubs = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let line_no = (index + 1) as u32;
        let trimmed = line.trim();

        if trimmed.contains("TODO") {
            stubs.push(StubLocation {
                line: line_no,
                kind: StubKind::Todo,
                text: trimmed.to_string(),
            });
            continue;
        }
        if trimmed.contains("FIXME") {
            stubs.push(StubLocation {
                line: line_no,
                kind: StubKind::Fixme,
                text: trimmed.to_string(),
            });
            continue;
        }
        if trimmed.contains("NotImplementedError") {
            stubs.push(StubLocation {
                line: line_no,
                kind: StubKind::NotImplemented,
                text: trimmed.to_string(),
            });
            continue;
        }
        if trimmed == "..." {
            stubs.push(StubLocation {
                line: line_no,
                kind: StubKind::Ellipsis,
                text: trimmed.to_string(),
            });
            continue;
        }
        if trimmed == "pass" && is_lone_body(&lines, index) {
            stubs.push(StubLocation {
                line: line_no,
                kind: StubKind::EmptyBody,
                text: trimmed.to_string(),
            });
        }
    }
    stubs
}

/// Is the `pass` at `index` the entire body of the preceding `def`?
fn is_lone_body(lines: &[&str], index: usize) -> bool {
    // Walk back over blanks/comments to the previous significant line.
    let mut back = index;
    while back > 0 {
        back -= 1;
        let candidate = lines[back].trim();
        if candidate.is_empty() || candidate.starts_with('#') || candidate.starts_with("\"\"\"") {
            continue;
        }
        return DEF_LINE_RE.is_match(lines[back]);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_and_fixme_markers_are_found() {
        let source = "x = 1  # TODO: finish this\n# FIXME handle errors\n";
        let stubs = detect_stubs(source);
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].kind, StubKind::Todo);
        assert_eq!(stubs[0].line, 1);
        assert_eq!(stubs[1].kind, StubKind::Fixme);
    }

    #[test]
    fn not_implemented_and_ellipsis_are_found() {
        let source = "def f():\n    raise NotImplementedError\n\ndef g():\n    ...\n";
        let stubs = detect_stubs(source);
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].kind, StubKind::NotImplemented);
        assert_eq!(stubs[1].kind, StubKind::Ellipsis);
    }

    #[test]
    fn lone_pass_body_is_an_empty_body() {
        let source = "def f():\n    pass\n";
        let stubs = detect_stubs(source);
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].kind, StubKind::EmptyBody);
        assert_eq!(stubs[0].line, 2);
    }

    #[test]
    fn pass_after_real_code_is_not_a_stub() {
        let source = "def f():\n    x = 1\n    pass\n";
        assert!(detect_stubs(source).is_empty());
    }

    #[test]
    fn clean_file_has_no_stubs() {
        let source = "def f(x: int) -> int:\n    return x * 2\n";
        assert!(detect_stubs(source).is_empty());
    }

    #[test]
    fn pass_after_docstring_still_counts() {
        let source = "def f():\n    \"\"\"docs\"\"\"\n    pass\n";
        let stubs = detect_stubs(source);
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].kind, StubKind::EmptyBody);
    }
}
