// SPDX-License-Identifier: MIT OR Apache-2.0
//! Weakness signals, aggregated scores, and scan reports.
//!
//! Signals are produced by the static analyzers; scores aggregate them per
//! artifact with a fan-out boost so widely-depended-on weak nodes rank first.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The kind of weakness a signal reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum WeaknessKind {
    /// Test coverage below the configured threshold.
    LowCoverage,
    /// Cyclomatic complexity above the configured threshold.
    HighComplexity,
    /// Linter reported errors.
    LintErrors,
    /// Old code that is both poorly covered and widely depended on.
    StaleCode,
    /// Historically failure-prone (from verification history).
    FailureProne,
    /// Type checker reported errors or missing annotations.
    MissingTypes,
    /// The extracted contract no longer matches a frozen one.
    BrokenContract,
}

impl std::fmt::Display for WeaknessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LowCoverage => "low_coverage",
            Self::HighComplexity => "high_complexity",
            Self::LintErrors => "lint_errors",
            Self::StaleCode => "stale_code",
            Self::FailureProne => "failure_prone",
            Self::MissingTypes => "missing_types",
            Self::BrokenContract => "broken_contract",
        };
        f.write_str(s)
    }
}

/// One analyzer observation attached to one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeaknessSignal {
    /// The artifact this signal is about.
    pub artifact_id: String,
    /// What kind of weakness was observed.
    pub kind: WeaknessKind,
    /// Severity in `[0, 1]`.
    pub severity: f64,
    /// Kind-specific evidence, e.g. `{"coverage": 0.23, "threshold": 0.5}`.
    #[serde(default)]
    pub evidence: BTreeMap<String, serde_json::Value>,
}

impl WeaknessSignal {
    /// Create a signal with clamped severity and no evidence.
    #[must_use]
    pub fn new(artifact_id: impl Into<String>, kind: WeaknessKind, severity: f64) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            kind,
            severity: severity.clamp(0.0, 1.0),
            evidence: BTreeMap::new(),
        }
    }

    /// Attach one evidence key/value pair.
    #[must_use]
    pub fn with_evidence(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.evidence.insert(key.into(), value);
        self
    }
}

/// Derived label for how risky a cascade from this node would be.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum CascadeRisk {
    /// Little downstream exposure.
    Low,
    /// Moderate severity or fan-out.
    Medium,
    /// Severe weakness with real downstream exposure.
    High,
    /// Severe weakness on a load-bearing node.
    Critical,
}

impl CascadeRisk {
    /// Label thresholds applied to `total_severity × (1 + fan_out/10)`.
    ///
    /// Unlike `total_severity`, the labeling product is deliberately
    /// unbounded so heavy fan-out can push a node into `critical`.
    #[must_use]
    pub fn from_score(total_severity: f64, fan_out: u32) -> Self {
        let boosted = total_severity * (1.0 + f64::from(fan_out) / 10.0);
        if boosted > 2.0 {
            Self::Critical
        } else if boosted > 1.0 {
            Self::High
        } else if boosted > 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for CascadeRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Aggregated weakness score for one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeaknessScore {
    /// The scored artifact.
    pub artifact_id: String,
    /// The artifact's file, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// The contributing signals, in analyzer emission order.
    pub signals: Vec<WeaknessSignal>,
    /// Number of artifacts that transitively depend on this node.
    pub fan_out: u32,
    /// Longest inbound dependency chain length.
    pub depth: u32,
    /// `clamp(mean(severities) × (1 + 0.05·fan_out), 0, 1)`.
    pub total_severity: f64,
    /// Derived risk label (see [`CascadeRisk::from_score`]).
    pub cascade_risk: CascadeRisk,
}

impl WeaknessScore {
    /// Aggregate `signals` into a score for one artifact.
    ///
    /// The mean severity gets a multiplicative fan-out boost and is clamped
    /// back into `[0, 1]` so scores stay comparable for ranking; the risk
    /// label uses a heavier, unbounded boost.
    ///
    /// # Examples
    ///
    /// ```
    /// use hc_core::{WeaknessKind, WeaknessScore, WeaknessSignal, CascadeRisk};
    ///
    /// let signal = WeaknessSignal::new("a", WeaknessKind::LowCoverage, 0.6);
    /// let score = WeaknessScore::compute("a", Some("a.py".into()), vec![signal], 2, 0);
    /// assert!((score.total_severity - 0.66).abs() < 1e-9);
    /// assert_eq!(score.cascade_risk, CascadeRisk::Medium);
    /// ```
    #[must_use]
    pub fn compute(
        artifact_id: impl Into<String>,
        file_path: Option<String>,
        signals: Vec<WeaknessSignal>,
        fan_out: u32,
        depth: u32,
    ) -> Self {
        let mean = if signals.is_empty() {
            0.0
        } else {
            signals.iter().map(|s| s.severity).sum::<f64>() / signals.len() as f64
        };
        let total_severity = (mean * (1.0 + 0.05 * f64::from(fan_out))).clamp(0.0, 1.0);
        Self {
            artifact_id: artifact_id.into(),
            file_path,
            signals,
            fan_out,
            depth,
            total_severity,
            cascade_risk: CascadeRisk::from_score(total_severity, fan_out),
        }
    }

    /// The distinct weakness kinds present, in signal order.
    #[must_use]
    pub fn kinds(&self) -> Vec<WeaknessKind> {
        let mut kinds = Vec::new();
        for s in &self.signals {
            if !kinds.contains(&s.kind) {
                kinds.push(s.kind);
            }
        }
        kinds
    }
}

/// Full weakness report for one scan pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeaknessReport {
    /// Root of the scanned project.
    pub project_root: String,
    /// When the scan ran.
    pub scan_time: DateTime<Utc>,
    /// Number of analyzable files visited.
    pub files_scanned: u32,
    /// Scores sorted by severity descending.
    pub scores: Vec<WeaknessScore>,
    /// Count of `critical` risk scores.
    pub critical_count: u32,
    /// Count of `high` risk scores.
    pub high_count: u32,
    /// Count of `medium` risk scores.
    pub medium_count: u32,
    /// Count of `low` risk scores.
    pub low_count: u32,
}

impl WeaknessReport {
    /// Build a report from ranked scores, deriving the risk counts.
    #[must_use]
    pub fn new(
        project_root: impl Into<String>,
        scan_time: DateTime<Utc>,
        files_scanned: u32,
        scores: Vec<WeaknessScore>,
    ) -> Self {
        let count = |risk: CascadeRisk| scores.iter().filter(|s| s.cascade_risk == risk).count() as u32;
        Self {
            project_root: project_root.into(),
            scan_time,
            files_scanned,
            critical_count: count(CascadeRisk::Critical),
            high_count: count(CascadeRisk::High),
            medium_count: count(CascadeRisk::Medium),
            low_count: count(CascadeRisk::Low),
            scores,
        }
    }

    /// Look up the score for one artifact.
    #[must_use]
    pub fn score_for(&self, artifact_id: &str) -> Option<&WeaknessScore> {
        self.scores.iter().find(|s| s.artifact_id == artifact_id)
    }
}
