// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-planner
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Cascade planning.
//!
//! Given a selected weak node, the planner computes the blast radius
//! (invalidation closure), the topological waves, and the frozen contracts
//! every later wave will be checked against. Planning is deterministic:
//! the same graph and weak node always produce the same preview, and the
//! preview is a pure value — execution concerns live in the executor.

use std::collections::BTreeMap;
use std::path::Path;

use hc_config::CascadeLimits;
use hc_contract::extract_contract;
use hc_core::{
    CascadePreview, CoreError, ErrorKind, EstimatedEffort, Phase, WeaknessScore,
};
use hc_graph::{ArtifactGraph, GraphError, topological_waves};
use tracing::{debug, warn};

/// Errors from cascade planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The selected weak node does not exist.
    #[error("artifact not found: {id}")]
    ArtifactNotFound {
        /// The missing id.
        id: String,
    },
}

impl From<PlanError> for CoreError {
    fn from(err: PlanError) -> Self {
        match &err {
            PlanError::ArtifactNotFound { id } => {
                CoreError::new(ErrorKind::ArtifactNotFound, Phase::Plan, err.to_string())
                    .with_context("artifact_id", id.clone())
            }
        }
    }
}

/// Where a frozen contract came from, for audit purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractSource {
    /// Extraction succeeded; the preview carries the contract.
    Extracted,
    /// The file was missing or unparseable; the wave verifier treats the
    /// artifact's contract check as passing.
    Unavailable,
}

impl ContractSource {
    /// The wire string recorded in `contract_captured` events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::Unavailable => "unavailable",
        }
    }
}

/// A computed preview plus per-artifact contract provenance.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// The preview value handed to the executor.
    pub preview: CascadePreview,
    /// Contract provenance for every artifact in the cascade, in cascade
    /// order (weak node first).
    pub contract_sources: Vec<(String, ContractSource)>,
}

/// Compute a cascade preview for regenerating `weak_node`.
///
/// Contract extraction failures are tolerated per artifact: the preview
/// simply lacks that contract and the provenance records `unavailable`.
/// A cascade exceeding the configured size or depth limits is still
/// previewed but flagged `cascade_too_large`; execution is blocked until
/// the caller raises the limit.
///
/// # Errors
///
/// Returns [`PlanError::ArtifactNotFound`] when `weak_node` is not in the
/// graph.
pub fn plan_cascade(
    graph: &ArtifactGraph,
    weak_node: &str,
    score: Option<&WeaknessScore>,
    limits: &CascadeLimits,
    project_root: &Path,
) -> Result<PlanOutcome, PlanError> {
    let not_found = |_: GraphError| PlanError::ArtifactNotFound {
        id: weak_node.to_string(),
    };

    let direct_dependents = graph.dependents(weak_node).map_err(not_found)?;
    let transitive_dependents = graph.transitive_dependents(weak_node).map_err(not_found)?;
    let plan = topological_waves(graph, weak_node).map_err(not_found)?;
    let chain_depth = graph.dependent_depth(weak_node).map_err(not_found)?;

    let total_impacted = transitive_dependents.len() as u32 + 1;
    let cascade_too_large =
        total_impacted > limits.max_cascade_size || chain_depth > limits.max_cascade_depth;
    if plan.cycle_in_cascade {
        warn!(weak_node, "cycle in cascade subgraph, scheduling remainder as a final wave");
    }

    let mut contracts = BTreeMap::new();
    let mut contract_sources = Vec::new();
    let mut cascade_order = vec![weak_node.to_string()];
    cascade_order.extend(transitive_dependents.iter().cloned());

    for artifact_id in &cascade_order {
        let artifact = graph.get(artifact_id).map_err(not_found)?;
        let Some(file) = &artifact.produces_file else {
            contract_sources.push((artifact_id.clone(), ContractSource::Unavailable));
            continue;
        };
        match extract_contract(artifact_id, &project_root.join(file)) {
            Ok(contract) => {
                debug!(artifact_id = %artifact_id, hash = %contract.interface_hash, "contract frozen");
                contracts.insert(artifact_id.clone(), contract);
                contract_sources.push((artifact_id.clone(), ContractSource::Extracted));
            }
            Err(err) => {
                warn!(artifact_id = %artifact_id, error = %err, "contract extraction failed, continuing without");
                contract_sources.push((artifact_id.clone(), ContractSource::Unavailable));
            }
        }
    }

    let fan_out = transitive_dependents.len() as u32;
    let risk_assessment = assess_risk(
        total_impacted,
        fan_out,
        score,
        plan.cycle_in_cascade,
        cascade_too_large,
    );

    Ok(PlanOutcome {
        preview: CascadePreview {
            weak_node: weak_node.to_string(),
            direct_dependents,
            transitive_dependents,
            total_impacted,
            waves: plan.waves,
            estimated_effort: EstimatedEffort::from_total(total_impacted),
            risk_assessment,
            contracts,
            cascade_too_large,
            cycle_in_cascade: plan.cycle_in_cascade,
            deltas: Vec::new(),
        },
        contract_sources,
    })
}

/// Deterministic concatenation of the risk factors.
fn assess_risk(
    total_impacted: u32,
    fan_out: u32,
    score: Option<&WeaknessScore>,
    cycle_in_cascade: bool,
    cascade_too_large: bool,
) -> String {
    let mut factors = Vec::new();
    if total_impacted > 20 {
        factors.push(format!("large cascade ({total_impacted} artifacts)"));
    }
    if fan_out > 10 {
        factors.push(format!("high fan-out ({fan_out} dependents)"));
    }
    if let Some(score) = score
        && score.cascade_risk == hc_core::CascadeRisk::Critical
    {
        factors.push("critical weakness signals".to_string());
    }
    if cycle_in_cascade {
        factors.push("cycle in cascade subgraph".to_string());
    }
    if cascade_too_large {
        factors.push("exceeds configured cascade limits".to_string());
    }

    if factors.is_empty() {
        "low risk".to_string()
    } else {
        factors.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_core::{ArtifactBuilder, WeaknessKind, WeaknessSignal};

    fn write(root: &Path, rel: &str, content: &str) {
        let abs = root.join(rel);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(abs, content).unwrap();
    }

    fn chain_graph() -> ArtifactGraph {
        ArtifactGraph::from_artifacts([
            ArtifactBuilder::new("a").file("a.py").build(),
            ArtifactBuilder::new("b").file("b.py").requires(["a"]).build(),
            ArtifactBuilder::new("c").file("c.py").requires(["b"]).build(),
        ])
        .unwrap()
    }

    #[test]
    fn preview_waves_match_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "def fa() -> int:\n    return 1\n");
        write(dir.path(), "b.py", "def fb() -> int:\n    return 2\n");
        write(dir.path(), "c.py", "def fc() -> int:\n    return 3\n");

        let graph = chain_graph();
        let outcome = plan_cascade(
            &graph,
            "a",
            None,
            &CascadeLimits::default(),
            dir.path(),
        )
        .unwrap();
        let preview = outcome.preview;

        assert_eq!(preview.weak_node, "a");
        assert_eq!(preview.total_impacted, 3);
        assert_eq!(
            preview.waves,
            vec![
                vec!["a".to_string()],
                vec!["b".to_string()],
                vec!["c".to_string()]
            ]
        );
        assert_eq!(preview.estimated_effort, EstimatedEffort::Small);
        assert_eq!(preview.contracts.len(), 3);
        assert!(!preview.cascade_too_large);
        assert!(preview.deltas.is_empty());
    }

    #[test]
    fn preview_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "def fa():\n    pass\n");
        write(dir.path(), "b.py", "def fb():\n    pass\n");
        write(dir.path(), "c.py", "def fc():\n    pass\n");
        let graph = chain_graph();
        let one = plan_cascade(&graph, "a", None, &CascadeLimits::default(), dir.path())
            .unwrap()
            .preview;
        let two = plan_cascade(&graph, "a", None, &CascadeLimits::default(), dir.path())
            .unwrap()
            .preview;
        assert_eq!(one, two);
    }

    #[test]
    fn missing_files_are_tolerated_as_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "def fa():\n    pass\n");
        // b.py and c.py do not exist on disk.
        let graph = chain_graph();
        let outcome =
            plan_cascade(&graph, "a", None, &CascadeLimits::default(), dir.path()).unwrap();

        assert_eq!(outcome.preview.contracts.len(), 1);
        assert_eq!(
            outcome.contract_sources,
            vec![
                ("a".to_string(), ContractSource::Extracted),
                ("b".to_string(), ContractSource::Unavailable),
                ("c".to_string(), ContractSource::Unavailable),
            ]
        );
    }

    #[test]
    fn leaf_node_previews_as_single_wave() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "c.py", "def fc():\n    pass\n");
        let graph = chain_graph();
        let preview = plan_cascade(&graph, "c", None, &CascadeLimits::default(), dir.path())
            .unwrap()
            .preview;
        assert_eq!(preview.total_impacted, 1);
        assert_eq!(preview.waves, vec![vec!["c".to_string()]]);
        assert_eq!(preview.estimated_effort, EstimatedEffort::Small);
        assert_eq!(preview.risk_assessment, "low risk");
    }

    #[test]
    fn oversized_cascade_is_flagged_not_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let graph = chain_graph();
        let limits = CascadeLimits {
            max_cascade_size: 2,
            max_cascade_depth: 5,
        };
        let preview = plan_cascade(&graph, "a", None, &limits, dir.path())
            .unwrap()
            .preview;
        assert!(preview.cascade_too_large);
        assert!(preview.risk_assessment.contains("exceeds configured cascade limits"));
    }

    #[test]
    fn depth_limit_also_flags() {
        let dir = tempfile::tempdir().unwrap();
        let graph = chain_graph();
        let limits = CascadeLimits {
            max_cascade_size: 50,
            max_cascade_depth: 1,
        };
        let preview = plan_cascade(&graph, "a", None, &limits, dir.path())
            .unwrap()
            .preview;
        assert!(preview.cascade_too_large);
    }

    #[test]
    fn critical_score_shows_in_risk_assessment() {
        let dir = tempfile::tempdir().unwrap();
        let graph = chain_graph();
        let score = WeaknessScore::compute(
            "a",
            Some("a.py".into()),
            vec![WeaknessSignal::new("a", WeaknessKind::LowCoverage, 1.0)],
            15,
            0,
        );
        let preview = plan_cascade(
            &graph,
            "a",
            Some(&score),
            &CascadeLimits::default(),
            dir.path(),
        )
        .unwrap()
        .preview;
        assert!(preview.risk_assessment.contains("critical weakness signals"));
    }

    #[test]
    fn unknown_weak_node_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let graph = chain_graph();
        let err = plan_cascade(&graph, "ghost", None, &CascadeLimits::default(), dir.path())
            .unwrap_err();
        assert!(matches!(err, PlanError::ArtifactNotFound { .. }));
    }
}
