// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-analyzers
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Static-analysis adapters for scan passes.
//!
//! Each analyzer is a pure adapter from one external tool's output to
//! [`WeaknessSignal`]s, keyed back to artifact ids through project-root
//! relative paths. Analyzers degrade gracefully: a missing tool or report
//! contributes no signals and warns once, because the absence of a
//! verification signal is not a negative one.
//!
//! Analyzers run concurrently (parallel leaves); the scan driver joins them
//! before scoring.

/// Cyclomatic complexity adapter.
pub mod complexity;
/// Coverage-report adapter.
pub mod coverage;
/// Linter-report adapter.
pub mod lint;
/// Weakness scoring and ranking.
pub mod score;
/// VCS staleness adapter.
pub mod staleness;
/// Type-checker adapter.
pub mod types;

pub use score::rank_weaknesses;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use hc_config::AnalyzerThresholds;
use hc_core::WeaknessSignal;
use hc_glob::IgnoreRules;
use tracing::warn;

/// One analyzable artifact: id plus its project-relative file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// The artifact id findings map back to.
    pub artifact_id: String,
    /// Path relative to the project root.
    pub file: String,
}

/// Everything an analyzer needs for one scan pass.
pub struct AnalyzerContext<'a> {
    /// Root of the project being scanned.
    pub project_root: &'a Path,
    /// Analyzable artifacts (virtual nodes are excluded upstream).
    pub targets: &'a [ScanTarget],
    /// Configured thresholds.
    pub thresholds: &'a AnalyzerThresholds,
    /// Transitive fan-out per artifact (the staleness gate needs it).
    pub fan_out: &'a BTreeMap<String, u32>,
    /// Compiled ignore rules; findings on ignored paths are dropped.
    pub ignore: &'a IgnoreRules,
}

impl AnalyzerContext<'_> {
    /// Map a path as reported by a tool back to a scan target.
    ///
    /// Tool output may use absolute paths or `./`-prefixed paths; both are
    /// normalized relative to `project_root` before matching, and ignored
    /// paths never match.
    #[must_use]
    pub fn target_for(&self, reported_path: &str) -> Option<&ScanTarget> {
        let normalized = self.normalize(reported_path);
        if !self.ignore.decide_str(&normalized).is_scanned() {
            return None;
        }
        self.targets.iter().find(|t| t.file == normalized)
    }

    /// Normalize a reported path to project-root relative form.
    #[must_use]
    pub fn normalize(&self, reported_path: &str) -> String {
        let unified = reported_path.replace('\\', "/");
        let path = Path::new(&unified);
        let relative = path
            .strip_prefix(self.project_root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        relative.strip_prefix("./").unwrap_or(&relative).to_string()
    }

    /// Locate a report file: `.health/reports/<name>` first, then the
    /// project root.
    #[must_use]
    pub fn find_report(&self, names: &[&str]) -> Option<PathBuf> {
        for name in names {
            let staged = self.project_root.join(".health/reports").join(name);
            if staged.exists() {
                return Some(staged);
            }
            let root = self.project_root.join(name);
            if root.exists() {
                return Some(root);
            }
        }
        None
    }
}

/// A static analyzer producing weakness signals from one tool's output.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable analyzer name (used in logs and the registry).
    fn name(&self) -> &'static str;

    /// Run the analyzer over the scan targets.
    ///
    /// Missing tools and missing reports are not errors: the analyzer
    /// returns no signals. Errors are reserved for unexpected failures
    /// (unreadable report, malformed beyond tolerance) and never abort the
    /// scan — the driver logs and drops them.
    async fn run(&self, ctx: &AnalyzerContext<'_>) -> anyhow::Result<Vec<WeaknessSignal>>;
}

/// Emit a missing-tool warning only on the first occurrence.
pub(crate) fn warn_once(flag: &AtomicBool, analyzer: &str, detail: &str) {
    if !flag.swap(true, Ordering::Relaxed) {
        warn!(analyzer, detail, "analyzer input unavailable, skipping");
    }
}

/// A typed registry of named [`Analyzer`] constructors.
///
/// Selection is by configuration name, not runtime class hierarchy; the
/// default set holds the five standard analyzers.
#[derive(Default)]
pub struct AnalyzerRegistry {
    analyzers: Vec<(String, Arc<dyn Analyzer>)>,
}

impl AnalyzerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard analyzer set: coverage, complexity, lint, types,
    /// staleness.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(coverage::CoverageAnalyzer::default());
        registry.register(complexity::ComplexityAnalyzer::default());
        registry.register(lint::LintAnalyzer::default());
        registry.register(types::TypesAnalyzer::default());
        registry.register(staleness::StalenessAnalyzer::default());
        registry
    }

    /// Register an analyzer under its own name, replacing any previous
    /// entry with that name.
    pub fn register(&mut self, analyzer: impl Analyzer + 'static) {
        let name = analyzer.name().to_string();
        self.analyzers.retain(|(n, _)| n != &name);
        self.analyzers.push((name, Arc::new(analyzer)));
    }

    /// Registered analyzer names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Run every analyzer concurrently and collect all signals.
    ///
    /// Signal order is deterministic: registration order first, then each
    /// analyzer's own (report-driven) order. An analyzer error is logged
    /// and contributes nothing — tool failures never abort a scan.
    pub async fn run_all(&self, ctx: &AnalyzerContext<'_>) -> Vec<WeaknessSignal> {
        let runs = self
            .analyzers
            .iter()
            .map(|(name, analyzer)| {
                let analyzer = Arc::clone(analyzer);
                async move { (name.clone(), analyzer.run(ctx).await) }
            })
            .collect::<Vec<_>>();

        let mut signals = Vec::new();
        for (name, result) in futures::future::join_all(runs).await {
            match result {
                Ok(batch) => signals.extend(batch),
                Err(err) => {
                    warn!(analyzer = %name, error = %err, "analyzer failed, dropping its signals");
                }
            }
        }
        signals
    }
}

#[cfg(test)]
mod tests;
