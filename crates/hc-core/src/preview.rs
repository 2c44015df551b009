// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cascade previews: the blast radius of regenerating one weak node.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::ExtractedContract;

/// Coarse effort estimate derived from the impacted-node count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedEffort {
    /// At most 3 impacted artifacts.
    Small,
    /// At most 10 impacted artifacts.
    Medium,
    /// At most 25 impacted artifacts.
    Large,
    /// More than 25 impacted artifacts.
    Epic,
}

impl EstimatedEffort {
    /// Derive the effort bucket from `total_impacted`.
    #[must_use]
    pub fn from_total(total_impacted: u32) -> Self {
        match total_impacted {
            0..=3 => Self::Small,
            4..=10 => Self::Medium,
            11..=25 => Self::Large,
            _ => Self::Epic,
        }
    }
}

impl std::fmt::Display for EstimatedEffort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Epic => "epic",
        };
        f.write_str(s)
    }
}

/// Pure value computed from the graph and a chosen weak node.
///
/// The preview is deterministic: the same graph and weak node always
/// produce the same waves, and wave members serialize in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CascadePreview {
    /// The root artifact being regenerated.
    pub weak_node: String,
    /// Direct successors of the weak node.
    pub direct_dependents: Vec<String>,
    /// All transitive dependents (exclusive of the weak node).
    pub transitive_dependents: Vec<String>,
    /// `|direct| + |transitive-only| + 1`.
    pub total_impacted: u32,
    /// Topological waves; `waves[0]` is always `[weak_node]`.
    pub waves: Vec<Vec<String>>,
    /// Effort bucket from [`EstimatedEffort::from_total`].
    pub estimated_effort: EstimatedEffort,
    /// Deterministic human-readable risk factors.
    pub risk_assessment: String,
    /// Contracts frozen at preview time, keyed by artifact id.
    #[serde(default)]
    pub contracts: BTreeMap<String, ExtractedContract>,
    /// Set when the cascade exceeds the configured size or depth limits.
    /// Execution is blocked until the caller explicitly raises the limit.
    #[serde(default)]
    pub cascade_too_large: bool,
    /// Set when wave computation found a cycle in the cascade subgraph and
    /// fell back to a final insertion-order wave.
    #[serde(default)]
    pub cycle_in_cascade: bool,
    /// Reserved for dry-run delta previews; always empty in this version.
    #[serde(default)]
    pub deltas: Vec<serde_json::Value>,
}

impl CascadePreview {
    /// All artifact ids in the cascade: the weak node plus every dependent.
    #[must_use]
    pub fn impacted_ids(&self) -> Vec<String> {
        let mut ids = vec![self.weak_node.clone()];
        ids.extend(self.transitive_dependents.iter().cloned());
        ids
    }

    /// Number of waves.
    #[must_use]
    pub fn wave_count(&self) -> u32 {
        self.waves.len() as u32
    }

    /// Frozen contract for `artifact_id`, if extraction succeeded at
    /// preview time.
    #[must_use]
    pub fn frozen_contract(&self, artifact_id: &str) -> Option<&ExtractedContract> {
        self.contracts.get(artifact_id)
    }
}
