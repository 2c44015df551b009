// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cyclomatic complexity adapter.
//!
//! Reads a radon-style JSON report (`path → [{name, complexity}, ...]`) and
//! emits `high_complexity` when a file's worst function exceeds the
//! threshold. Severity is `min(1, (c − threshold) / 10)`.

use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use hc_core::{WeaknessKind, WeaknessSignal};
use serde_json::Value;

use crate::{Analyzer, AnalyzerContext, warn_once};

const REPORT_NAMES: &[&str] = &["complexity.json"];

/// Adapter for complexity JSON reports.
#[derive(Debug, Default)]
pub struct ComplexityAnalyzer {
    warned: AtomicBool,
}

#[async_trait]
impl Analyzer for ComplexityAnalyzer {
    fn name(&self) -> &'static str {
        "complexity"
    }

    async fn run(&self, ctx: &AnalyzerContext<'_>) -> anyhow::Result<Vec<WeaknessSignal>> {
        let Some(report_path) = ctx.find_report(REPORT_NAMES) else {
            warn_once(&self.warned, self.name(), "no complexity report found");
            return Ok(Vec::new());
        };
        let content = tokio::fs::read_to_string(&report_path).await?;
        let report: Value = serde_json::from_str(&content)?;
        Ok(signals_from_report(ctx, &report))
    }
}

/// Pure mapping from a parsed report to signals.
pub fn signals_from_report(ctx: &AnalyzerContext<'_>, report: &Value) -> Vec<WeaknessSignal> {
    let threshold = f64::from(ctx.thresholds.complexity);
    let mut signals = Vec::new();

    let Some(files) = report.as_object() else {
        return signals;
    };

    for (reported_path, blocks) in files {
        let Some(target) = ctx.target_for(reported_path) else {
            continue;
        };
        let Some(blocks) = blocks.as_array() else {
            continue;
        };

        let worst = blocks
            .iter()
            .filter_map(|b| {
                let complexity = b.get("complexity").and_then(Value::as_f64)?;
                let name = b.get("name").and_then(Value::as_str).unwrap_or("<anon>");
                Some((complexity, name))
            })
            .max_by(|a, b| a.0.total_cmp(&b.0));

        if let Some((max_complexity, function)) = worst
            && max_complexity > threshold
        {
            let severity = ((max_complexity - threshold) / 10.0).min(1.0);
            signals.push(
                WeaknessSignal::new(&target.artifact_id, WeaknessKind::HighComplexity, severity)
                    .with_evidence("max_complexity", serde_json::json!(max_complexity))
                    .with_evidence("threshold", serde_json::json!(threshold))
                    .with_evidence("function", serde_json::json!(function)),
            );
        }
    }
    signals
}
