// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-telemetry
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Metrics collection for scans and cascades.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::info;

// ---------------------------------------------------------------------------
// CascadeMetrics
// ---------------------------------------------------------------------------

/// Metrics captured for a single cascade run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CascadeMetrics {
    /// The weak node the cascade was rooted at.
    pub weak_node: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Number of waves executed.
    pub waves: u32,
    /// Artifacts regenerated successfully.
    pub artifacts_regenerated: u32,
    /// Artifacts whose regeneration failed.
    pub artifacts_failed: u32,
    /// Final overall confidence.
    pub overall_confidence: f64,
    /// Whether the cascade completed (vs aborted or still paused).
    pub completed: bool,
    /// Whether the cascade escalated to a human.
    pub escalated: bool,
}

// ---------------------------------------------------------------------------
// MetricsSummary
// ---------------------------------------------------------------------------

/// Aggregated statistics across multiple cascades.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSummary {
    /// Number of cascades recorded.
    pub count: usize,
    /// Mean duration in milliseconds.
    pub mean_duration_ms: f64,
    /// Median (p50) duration in milliseconds.
    pub p50_duration_ms: f64,
    /// Completion rate (completed / total).
    pub completion_rate: f64,
    /// Escalation rate (escalated / total).
    pub escalation_rate: f64,
    /// Mean overall confidence across cascades.
    pub mean_confidence: f64,
    /// Per-root cascade counts (deterministic ordering).
    pub root_counts: BTreeMap<String, usize>,
}

impl Default for MetricsSummary {
    fn default() -> Self {
        Self {
            count: 0,
            mean_duration_ms: 0.0,
            p50_duration_ms: 0.0,
            completion_rate: 0.0,
            escalation_rate: 0.0,
            mean_confidence: 0.0,
            root_counts: BTreeMap::new(),
        }
    }
}

/// Compute a percentile value from a **sorted** slice.
fn percentile(sorted: &[u64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] as f64 * (1.0 - frac) + sorted[upper] as f64 * frac
}

// ---------------------------------------------------------------------------
// MetricsCollector
// ---------------------------------------------------------------------------

/// Thread-safe collector for cascade metrics.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<Vec<CascadeMetrics>>>,
}

impl MetricsCollector {
    /// Create a new, empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished cascade's metrics.
    pub fn record(&self, metrics: CascadeMetrics) {
        info!(
            weak_node = %metrics.weak_node,
            waves = metrics.waves,
            confidence = metrics.overall_confidence,
            completed = metrics.completed,
            "cascade metrics recorded"
        );
        let mut data = self.inner.lock().expect("metrics lock poisoned");
        data.push(metrics);
    }

    /// All recorded cascades, in recording order.
    #[must_use]
    pub fn cascades(&self) -> Vec<CascadeMetrics> {
        self.inner.lock().expect("metrics lock poisoned").clone()
    }

    /// Number of cascades recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("metrics lock poisoned").len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate everything recorded so far.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let data = self.inner.lock().expect("metrics lock poisoned");
        if data.is_empty() {
            return MetricsSummary::default();
        }

        let count = data.len();
        let mut durations: Vec<u64> = data.iter().map(|m| m.duration_ms).collect();
        durations.sort_unstable();

        let completed = data.iter().filter(|m| m.completed).count();
        let escalated = data.iter().filter(|m| m.escalated).count();
        let confidence_total: f64 = data.iter().map(|m| m.overall_confidence).sum();

        let mut root_counts: BTreeMap<String, usize> = BTreeMap::new();
        for metrics in data.iter() {
            *root_counts.entry(metrics.weak_node.clone()).or_insert(0) += 1;
        }

        MetricsSummary {
            count,
            mean_duration_ms: durations.iter().sum::<u64>() as f64 / count as f64,
            p50_duration_ms: percentile(&durations, 50.0),
            completion_rate: completed as f64 / count as f64,
            escalation_rate: escalated as f64 / count as f64,
            mean_confidence: confidence_total / count as f64,
            root_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(weak_node: &str, duration_ms: u64, completed: bool) -> CascadeMetrics {
        CascadeMetrics {
            weak_node: weak_node.to_string(),
            duration_ms,
            waves: 3,
            artifacts_regenerated: 3,
            artifacts_failed: 0,
            overall_confidence: 1.0,
            completed,
            escalated: false,
        }
    }

    #[test]
    fn empty_collector_summarizes_to_defaults() {
        let collector = MetricsCollector::new();
        assert!(collector.is_empty());
        assert_eq!(collector.summary(), MetricsSummary::default());
    }

    #[test]
    fn summary_aggregates_counts_and_rates() {
        let collector = MetricsCollector::new();
        collector.record(metrics("a", 100, true));
        collector.record(metrics("a", 300, true));
        collector.record(metrics("b", 200, false));

        let summary = collector.summary();
        assert_eq!(summary.count, 3);
        assert!((summary.mean_duration_ms - 200.0).abs() < 1e-9);
        assert!((summary.p50_duration_ms - 200.0).abs() < 1e-9);
        assert!((summary.completion_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.root_counts["a"], 2);
        assert_eq!(summary.root_counts["b"], 1);
    }

    #[test]
    fn clones_share_storage() {
        let collector = MetricsCollector::new();
        let clone = collector.clone();
        clone.record(metrics("a", 50, true));
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn percentile_interpolates() {
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(percentile(&[10], 99.0), 10.0);
        assert!((percentile(&[0, 10], 50.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_round_trip_through_json() {
        let m = metrics("a", 100, true);
        let json = serde_json::to_string(&m).unwrap();
        let back: CascadeMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
