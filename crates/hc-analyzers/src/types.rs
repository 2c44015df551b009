// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type-checker adapter.
//!
//! Parses mypy-style structured output (`path:line: error: message`) and
//! emits `missing_types` for files with at least one error. Severity is
//! `min(1, count / cap)` with the configured cap.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use hc_core::{WeaknessKind, WeaknessSignal};

use crate::{Analyzer, AnalyzerContext, warn_once};

const REPORT_NAMES: &[&str] = &["types.txt", "mypy.txt"];

/// Adapter for type-checker output.
#[derive(Debug, Default)]
pub struct TypesAnalyzer {
    warned: AtomicBool,
}

#[async_trait]
impl Analyzer for TypesAnalyzer {
    fn name(&self) -> &'static str {
        "types"
    }

    async fn run(&self, ctx: &AnalyzerContext<'_>) -> anyhow::Result<Vec<WeaknessSignal>> {
        let Some(report_path) = ctx.find_report(REPORT_NAMES) else {
            warn_once(&self.warned, self.name(), "no type-checker output found");
            return Ok(Vec::new());
        };
        let content = tokio::fs::read_to_string(&report_path).await?;
        Ok(signals_from_output(ctx, &content))
    }
}

/// Pure mapping from checker output text to signals.
pub fn signals_from_output(ctx: &AnalyzerContext<'_>, output: &str) -> Vec<WeaknessSignal> {
    let cap = f64::from(ctx.thresholds.type_error_cap.max(1));
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for line in output.lines() {
        let Some((reported_path, rest)) = line.split_once(':') else {
            continue;
        };
        if !rest.contains("error:") {
            continue;
        }
        if let Some(target) = ctx.target_for(reported_path.trim()) {
            *counts.entry(target.artifact_id.clone()).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(artifact_id, count)| {
            let severity = (count as f64 / cap).min(1.0);
            WeaknessSignal::new(artifact_id, WeaknessKind::MissingTypes, severity)
                .with_evidence("error_count", serde_json::json!(count))
        })
        .collect()
}
