// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linter-report adapter.
//!
//! Reads a ruff-style JSON report (a flat array of findings with a
//! `filename` field) and emits `lint_errors` for files with at least one
//! finding. Severity is `min(1, count / cap)` with the configured cap.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use hc_core::{WeaknessKind, WeaknessSignal};
use serde_json::Value;

use crate::{Analyzer, AnalyzerContext, warn_once};

const REPORT_NAMES: &[&str] = &["lint.json"];

/// Adapter for linter JSON reports.
#[derive(Debug, Default)]
pub struct LintAnalyzer {
    warned: AtomicBool,
}

#[async_trait]
impl Analyzer for LintAnalyzer {
    fn name(&self) -> &'static str {
        "lint"
    }

    async fn run(&self, ctx: &AnalyzerContext<'_>) -> anyhow::Result<Vec<WeaknessSignal>> {
        let Some(report_path) = ctx.find_report(REPORT_NAMES) else {
            warn_once(&self.warned, self.name(), "no lint report found");
            return Ok(Vec::new());
        };
        let content = tokio::fs::read_to_string(&report_path).await?;
        let report: Value = serde_json::from_str(&content)?;
        Ok(signals_from_report(ctx, &report))
    }
}

/// Pure mapping from a parsed report to signals.
pub fn signals_from_report(ctx: &AnalyzerContext<'_>, report: &Value) -> Vec<WeaknessSignal> {
    let cap = f64::from(ctx.thresholds.lint_error_cap.max(1));
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    let Some(findings) = report.as_array() else {
        return Vec::new();
    };

    for finding in findings {
        let Some(reported_path) = finding.get("filename").and_then(Value::as_str) else {
            continue;
        };
        if let Some(target) = ctx.target_for(reported_path) {
            *counts.entry(target.artifact_id.clone()).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(artifact_id, count)| {
            let severity = (count as f64 / cap).min(1.0);
            WeaknessSignal::new(artifact_id, WeaknessKind::LintErrors, severity)
                .with_evidence("error_count", serde_json::json!(count))
        })
        .collect()
}
