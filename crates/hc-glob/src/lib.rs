// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-glob
#![deny(unsafe_code)]
//!
//! Ignore-pattern compilation and matching for scan passes.
//!
//! Analyzer outputs are filtered through an [`IgnoreRules`] value before
//! findings are mapped back to artifacts, so files under `.healthignore`
//! patterns never contribute weakness signals. The engine's own state
//! directory is always ignored.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// File name of the per-project ignore file.
pub const IGNORE_FILE: &str = ".healthignore";

/// Patterns that are always ignored regardless of project configuration.
const BUILTIN_IGNORES: &[&str] = &[".health/**", ".git/**"];

/// Decision for a path evaluated against the ignore rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    /// The path participates in scans.
    Scanned,
    /// The path matched an ignore pattern.
    Ignored,
}

impl MatchDecision {
    /// Returns `true` only for [`MatchDecision::Scanned`].
    #[must_use]
    pub fn is_scanned(self) -> bool {
        matches!(self, Self::Scanned)
    }
}

/// Compiled ignore rules for one project.
///
/// Rules combine the built-in ignores (engine state, VCS internals) with
/// user patterns from `.healthignore` and any extra patterns passed on the
/// command line. A path matching any pattern is ignored.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    set: GlobSet,
}

impl IgnoreRules {
    /// Compile rules from user-supplied patterns plus the built-ins.
    ///
    /// # Errors
    ///
    /// Fails if any pattern is not a valid glob.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut b = GlobSetBuilder::new();
        for p in BUILTIN_IGNORES {
            b.add(Glob::new(p).with_context(|| format!("invalid builtin glob: {p}"))?);
        }
        for p in patterns {
            b.add(Glob::new(p).with_context(|| format!("invalid glob: {p}"))?);
        }
        Ok(Self { set: b.build()? })
    }

    /// Load `.healthignore` from `project_root` (if present), merge with
    /// `extra` patterns, and compile.
    ///
    /// The ignore file holds one glob per line; blank lines and `#` comments
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read, or a pattern is invalid.
    pub fn load(project_root: &Path, extra: &[String]) -> Result<Self> {
        let mut patterns = Vec::new();
        let ignore_path = project_root.join(IGNORE_FILE);
        if ignore_path.exists() {
            let content = std::fs::read_to_string(&ignore_path)
                .with_context(|| format!("read {}", ignore_path.display()))?;
            patterns.extend(parse_ignore_file(&content));
        }
        patterns.extend(extra.iter().cloned());
        Self::new(&patterns)
    }

    /// Evaluate a path (relative to the project root) against the rules.
    #[must_use]
    pub fn decide_path(&self, candidate: &Path) -> MatchDecision {
        if self.set.is_match(candidate) {
            MatchDecision::Ignored
        } else {
            MatchDecision::Scanned
        }
    }

    /// Convenience wrapper around [`decide_path`](Self::decide_path).
    #[must_use]
    pub fn decide_str(&self, candidate: &str) -> MatchDecision {
        self.decide_path(Path::new(candidate))
    }

    /// Drop ignored paths from an iterator of path strings.
    pub fn retain_scanned<'a, I>(&'a self, paths: I) -> impl Iterator<Item = String> + 'a
    where
        I: IntoIterator<Item = String> + 'a,
    {
        paths
            .into_iter()
            .filter(move |p| self.decide_str(p).is_scanned())
    }
}

/// Parse ignore-file content into patterns, skipping blanks and comments.
fn parse_ignore_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn scans_everything_without_user_patterns() {
        let rules = IgnoreRules::new(&Vec::new()).expect("compile rules");
        assert_eq!(rules.decide_str("src/app.py"), MatchDecision::Scanned);
    }

    #[test]
    fn state_directory_is_always_ignored() {
        let rules = IgnoreRules::new(&Vec::new()).expect("compile rules");
        assert_eq!(
            rules.decide_str(".health/audit.log"),
            MatchDecision::Ignored
        );
        assert_eq!(rules.decide_str(".git/config"), MatchDecision::Ignored);
    }

    #[test]
    fn user_patterns_are_honored() {
        let rules = IgnoreRules::new(&patterns(&["generated/**", "*.pb.py"])).expect("compile");
        assert_eq!(
            rules.decide_str("generated/schema.py"),
            MatchDecision::Ignored
        );
        assert_eq!(rules.decide_str("api_pb2.pb.py"), MatchDecision::Ignored);
        assert_eq!(rules.decide_str("src/app.py"), MatchDecision::Scanned);
    }

    #[test]
    fn invalid_pattern_returns_error() {
        let err = IgnoreRules::new(&patterns(&["["])).expect_err("invalid glob should fail");
        assert!(err.to_string().contains("invalid glob"), "got: {err:?}");
    }

    #[test]
    fn ignore_file_parsing_skips_comments_and_blanks() {
        let parsed = parse_ignore_file("# vendored\nvendor/**\n\n  \nbuild/**\n");
        assert_eq!(parsed, vec!["vendor/**".to_string(), "build/**".to_string()]);
    }

    #[test]
    fn load_reads_ignore_file_from_project_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(IGNORE_FILE), "migrations/**\n").expect("write");
        let rules = IgnoreRules::load(dir.path(), &patterns(&["extra/**"])).expect("load");
        assert_eq!(
            rules.decide_str("migrations/0001_init.py"),
            MatchDecision::Ignored
        );
        assert_eq!(rules.decide_str("extra/x.py"), MatchDecision::Ignored);
        assert_eq!(rules.decide_str("src/app.py"), MatchDecision::Scanned);
    }

    #[test]
    fn retain_scanned_filters_ignored_paths() {
        let rules = IgnoreRules::new(&patterns(&["tests/**"])).expect("compile");
        let kept: Vec<String> = rules
            .retain_scanned(vec![
                "src/a.py".to_string(),
                "tests/test_a.py".to_string(),
            ])
            .collect();
        assert_eq!(kept, vec!["src/a.py".to_string()]);
    }
}
