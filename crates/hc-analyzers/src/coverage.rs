// SPDX-License-Identifier: MIT OR Apache-2.0
//! Coverage-report adapter.
//!
//! Reads a coverage.py-style JSON report and emits `low_coverage` for every
//! target whose covered fraction falls below the configured threshold.
//! Severity scales with the shortfall: `(threshold − coverage) / threshold`.

use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use hc_core::{WeaknessKind, WeaknessSignal};
use serde_json::Value;

use crate::{Analyzer, AnalyzerContext, warn_once};

/// Report file names probed, in order.
const REPORT_NAMES: &[&str] = &["coverage.json"];

/// Adapter for coverage JSON reports.
#[derive(Debug, Default)]
pub struct CoverageAnalyzer {
    warned: AtomicBool,
}

#[async_trait]
impl Analyzer for CoverageAnalyzer {
    fn name(&self) -> &'static str {
        "coverage"
    }

    async fn run(&self, ctx: &AnalyzerContext<'_>) -> anyhow::Result<Vec<WeaknessSignal>> {
        let Some(report_path) = ctx.find_report(REPORT_NAMES) else {
            warn_once(&self.warned, self.name(), "no coverage report found");
            return Ok(Vec::new());
        };
        let content = tokio::fs::read_to_string(&report_path).await?;
        let report: Value = serde_json::from_str(&content)?;
        Ok(signals_from_report(ctx, &report))
    }
}

/// Pure mapping from a parsed report to signals.
pub fn signals_from_report(ctx: &AnalyzerContext<'_>, report: &Value) -> Vec<WeaknessSignal> {
    let threshold = ctx.thresholds.coverage;
    let mut signals = Vec::new();
    // A zero threshold disables the analyzer outright.
    if threshold <= 0.0 {
        return signals;
    }

    let Some(files) = report.get("files").and_then(Value::as_object) else {
        return signals;
    };

    for (reported_path, entry) in files {
        let Some(target) = ctx.target_for(reported_path) else {
            continue;
        };
        let Some(percent) = entry
            .pointer("/summary/percent_covered")
            .and_then(Value::as_f64)
        else {
            continue;
        };
        let coverage = percent / 100.0;
        if coverage < threshold {
            let severity = (threshold - coverage) / threshold;
            signals.push(
                WeaknessSignal::new(&target.artifact_id, WeaknessKind::LowCoverage, severity)
                    .with_evidence("coverage", serde_json::json!(coverage))
                    .with_evidence("threshold", serde_json::json!(threshold)),
            );
        }
    }
    signals
}
