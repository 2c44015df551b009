// SPDX-License-Identifier: MIT OR Apache-2.0
//! VCS staleness adapter.
//!
//! A file is stale only when three gates all hold: it has not been touched
//! for longer than the configured months, its coverage is below the
//! coverage threshold, and its fan-out exceeds the configured gate. Old but
//! well-covered (or leaf) code is left alone.
//!
//! Commit times come from `git log`; when git or the repository is absent
//! the analyzer contributes nothing.

use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use chrono::Utc;
use hc_core::{WeaknessKind, WeaknessSignal};
use serde_json::Value;
use tokio::process::Command;

use crate::{Analyzer, AnalyzerContext, warn_once};

/// Mean length of a month in seconds, for commit-age bucketing.
const SECONDS_PER_MONTH: f64 = 30.44 * 24.0 * 3600.0;

/// Adapter for commit-age staleness.
#[derive(Debug, Default)]
pub struct StalenessAnalyzer {
    warned: AtomicBool,
}

#[async_trait]
impl Analyzer for StalenessAnalyzer {
    fn name(&self) -> &'static str {
        "staleness"
    }

    async fn run(&self, ctx: &AnalyzerContext<'_>) -> anyhow::Result<Vec<WeaknessSignal>> {
        if which::which("git").is_err() {
            warn_once(&self.warned, self.name(), "git not found on PATH");
            return Ok(Vec::new());
        }

        // Coverage is one of the three gates; without a report nothing
        // can qualify as stale.
        let Some(coverage_report) = ctx.find_report(&["coverage.json"]) else {
            warn_once(&self.warned, self.name(), "no coverage report for the staleness gate");
            return Ok(Vec::new());
        };
        let coverage: Value =
            serde_json::from_str(&tokio::fs::read_to_string(&coverage_report).await?)?;

        let mut signals = Vec::new();
        let now = Utc::now().timestamp();

        for target in ctx.targets {
            let Some(commit_ts) = last_commit_timestamp(ctx, &target.file).await else {
                continue;
            };
            let months_stale = (now - commit_ts).max(0) as f64 / SECONDS_PER_MONTH;
            let fan_out = ctx.fan_out.get(&target.artifact_id).copied().unwrap_or(0);
            let file_coverage = coverage_fraction(&coverage, ctx, &target.file);

            if let Some(signal) = staleness_signal(
                &target.artifact_id,
                months_stale,
                file_coverage,
                fan_out,
                ctx.thresholds.staleness_months,
                ctx.thresholds.staleness_fan_out,
                ctx.thresholds.coverage,
            ) {
                signals.push(signal);
            }
        }
        Ok(signals)
    }
}

/// The triple gate and severity formula, kept pure for testing.
///
/// Severity is `min(1, months/12 × fan_out/10)`.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn staleness_signal(
    artifact_id: &str,
    months_stale: f64,
    coverage: Option<f64>,
    fan_out: u32,
    months_gate: u32,
    fan_out_gate: u32,
    coverage_threshold: f64,
) -> Option<WeaknessSignal> {
    let coverage = coverage?;
    if months_stale <= f64::from(months_gate) {
        return None;
    }
    if coverage >= coverage_threshold {
        return None;
    }
    if fan_out <= fan_out_gate {
        return None;
    }

    let severity = ((months_stale / 12.0) * (f64::from(fan_out) / 10.0)).min(1.0);
    Some(
        WeaknessSignal::new(artifact_id, WeaknessKind::StaleCode, severity)
            .with_evidence("months_stale", serde_json::json!(months_stale))
            .with_evidence("coverage", serde_json::json!(coverage))
            .with_evidence("fan_out", serde_json::json!(fan_out)),
    )
}

/// Covered fraction for `file` from a coverage.py-style report.
fn coverage_fraction(report: &Value, ctx: &AnalyzerContext<'_>, file: &str) -> Option<f64> {
    let files = report.get("files")?.as_object()?;
    for (reported_path, entry) in files {
        if ctx.normalize(reported_path) == file {
            return entry
                .pointer("/summary/percent_covered")
                .and_then(Value::as_f64)
                .map(|p| p / 100.0);
        }
    }
    None
}

/// Unix timestamp of the file's last commit, or `None` outside a repo.
async fn last_commit_timestamp(ctx: &AnalyzerContext<'_>, file: &str) -> Option<i64> {
    let output = Command::new("git")
        .args(["log", "-1", "--format=%ct", "--", file])
        .current_dir(ctx.project_root)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}
