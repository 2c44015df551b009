// SPDX-License-Identifier: MIT OR Apache-2.0
//! Weakness scoring and ranking.
//!
//! Pure aggregation: group signals by artifact, apply the fan-out-boosted
//! severity formula, and rank. Determinism matters here — scan-after-scan
//! on an unchanged tree must produce byte-identical reports.

use std::collections::BTreeMap;

use hc_config::EngineConfig;
use hc_core::{WeaknessScore, WeaknessSignal};

/// Aggregate `signals` into ranked [`WeaknessScore`]s.
///
/// - Artifacts without a file (virtual nodes) are skipped.
/// - Artifacts whose extension is outside the configured source set are
///   skipped.
/// - Scores sort by `total_severity` descending, then `fan_out`
///   descending, then artifact id ascending.
#[must_use]
pub fn rank_weaknesses(
    signals: Vec<WeaknessSignal>,
    files: &BTreeMap<String, String>,
    fan_out: &BTreeMap<String, u32>,
    depth: &BTreeMap<String, u32>,
    config: &EngineConfig,
) -> Vec<WeaknessScore> {
    let mut grouped: BTreeMap<String, Vec<WeaknessSignal>> = BTreeMap::new();
    for signal in signals {
        grouped
            .entry(signal.artifact_id.clone())
            .or_default()
            .push(signal);
    }

    let mut scores: Vec<WeaknessScore> = grouped
        .into_iter()
        .filter_map(|(artifact_id, signals)| {
            let file = files.get(&artifact_id)?;
            if !config.is_source_file(file) {
                return None;
            }
            Some(WeaknessScore::compute(
                artifact_id.clone(),
                Some(file.clone()),
                signals,
                fan_out.get(&artifact_id).copied().unwrap_or(0),
                depth.get(&artifact_id).copied().unwrap_or(0),
            ))
        })
        .collect();

    scores.sort_by(|a, b| {
        b.total_severity
            .total_cmp(&a.total_severity)
            .then_with(|| b.fan_out.cmp(&a.fan_out))
            .then_with(|| a.artifact_id.cmp(&b.artifact_id))
    });
    scores
}
