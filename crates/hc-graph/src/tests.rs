// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::*;
use hc_core::{ArtifactBuilder, IntegrationKind};

fn node(id: &str, requires: &[&str]) -> hc_core::Artifact {
    ArtifactBuilder::new(id)
        .file(format!("{id}.py"))
        .requires(requires.iter().copied())
        .build()
}

/// A ← B ← C (B depends on A, C depends on B).
fn chain() -> ArtifactGraph {
    ArtifactGraph::from_artifacts([node("a", &[]), node("b", &["a"]), node("c", &["b"])])
        .expect("chain builds")
}

/// Diamond: B and C both depend on A; D depends on both.
fn diamond() -> ArtifactGraph {
    ArtifactGraph::from_artifacts([
        node("a", &[]),
        node("b", &["a"]),
        node("c", &["a"]),
        node("d", &["b", "c"]),
    ])
    .expect("diamond builds")
}

// ── mutation invariants ────────────────────────────────────────────

#[test]
fn duplicate_id_is_rejected() {
    let mut g = chain();
    let err = g.add(node("a", &[])).unwrap_err();
    assert_eq!(
        err,
        GraphError::DuplicateId {
            id: "a".to_string()
        }
    );
    assert_eq!(g.len(), 3);
}

#[test]
fn dangling_requires_is_rejected() {
    let mut g = ArtifactGraph::new();
    let err = g.add(node("x", &["ghost"])).unwrap_err();
    assert_eq!(
        err,
        GraphError::DanglingRequires {
            id: "x".to_string(),
            missing: "ghost".to_string()
        }
    );
    assert!(g.is_empty());
}

#[test]
fn self_require_is_a_cycle() {
    let mut g = ArtifactGraph::new();
    let err = g.add(node("x", &["x"])).unwrap_err();
    assert_eq!(
        err,
        GraphError::CycleDetected {
            id: "x".to_string()
        }
    );
}

#[test]
fn update_detects_cycle_through_existing_edges() {
    let mut g = chain();
    // a -> ... -> c already; making a require c closes the loop.
    let err = g.update(node("a", &["c"])).unwrap_err();
    assert_eq!(
        err,
        GraphError::CycleDetected {
            id: "a".to_string()
        }
    );
    // Atomicity: nothing changed.
    assert!(g.get("a").unwrap().requires.is_empty());
}

#[test]
fn update_rewires_dependent_cache() {
    let mut g = diamond();
    g.update(node("d", &["b"])).unwrap();
    assert_eq!(g.dependents("c").unwrap(), Vec::<String>::new());
    assert_eq!(g.dependents("b").unwrap(), vec!["d".to_string()]);
}

#[test]
fn integration_must_target_required_artifact() {
    let mut g = ArtifactGraph::new();
    g.add(node("user", &[])).unwrap();
    let mut bad = ArtifactBuilder::new("consumer")
        .file("consumer.py")
        .integration("user", IntegrationKind::Import, "consumer.py")
        .build();
    bad.requires.clear(); // break the invariant by hand
    let err = g.add(bad).unwrap_err();
    assert!(matches!(
        err,
        GraphError::IntegrationOutsideRequires { .. }
    ));
}

#[test]
fn remove_refuses_while_dependents_exist() {
    let mut g = chain();
    let err = g.remove("a").unwrap_err();
    assert_eq!(
        err,
        GraphError::HasDependents {
            id: "a".to_string(),
            dependents: vec!["b".to_string()]
        }
    );
}

#[test]
fn add_then_remove_round_trips() {
    let mut g = chain();
    let before = serde_json::to_string(&g).unwrap();
    g.add(node("d", &["c"])).unwrap();
    g.remove("d").unwrap();
    let after = serde_json::to_string(&g).unwrap();
    assert_eq!(before, after);
}

#[test]
fn remove_leaf_then_lookups_stay_consistent() {
    let mut g = diamond();
    g.remove("d").unwrap();
    assert!(!g.contains("d"));
    assert_eq!(g.dependents("b").unwrap(), Vec::<String>::new());
    // Index was rebuilt; later artifacts still resolve.
    assert_eq!(g.get("c").unwrap().id, "c");
}

// ── traversal ──────────────────────────────────────────────────────

#[test]
fn dependents_are_cached_in_insertion_order() {
    let g = diamond();
    assert_eq!(
        g.dependents("a").unwrap(),
        vec!["b".to_string(), "c".to_string()]
    );
}

#[test]
fn transitive_dependents_follow_insertion_order() {
    let g = diamond();
    assert_eq!(
        g.transitive_dependents("a").unwrap(),
        vec!["b".to_string(), "c".to_string(), "d".to_string()]
    );
    assert_eq!(
        g.transitive_dependents("b").unwrap(),
        vec!["d".to_string()]
    );
    assert_eq!(g.transitive_dependents("d").unwrap(), Vec::<String>::new());
}

#[test]
fn transitive_dependents_is_stable_across_calls() {
    let g = diamond();
    assert_eq!(
        g.transitive_dependents("a").unwrap(),
        g.transitive_dependents("a").unwrap()
    );
}

#[test]
fn fan_out_counts_the_closure() {
    let g = chain();
    assert_eq!(g.fan_out("a").unwrap(), 2);
    assert_eq!(g.fan_out("b").unwrap(), 1);
    assert_eq!(g.fan_out("c").unwrap(), 0);
}

#[test]
fn depth_is_longest_inbound_chain() {
    let g = diamond();
    assert_eq!(g.depth("a").unwrap(), 0);
    assert_eq!(g.depth("b").unwrap(), 1);
    assert_eq!(g.depth("d").unwrap(), 2);
}

#[test]
fn dependent_depth_is_longest_downstream_chain() {
    let g = diamond();
    assert_eq!(g.dependent_depth("a").unwrap(), 2);
    assert_eq!(g.dependent_depth("d").unwrap(), 0);
}

#[test]
fn unknown_id_is_not_found() {
    let g = chain();
    assert!(matches!(
        g.dependents("ghost"),
        Err(GraphError::NotFound { .. })
    ));
    assert!(matches!(
        g.transitive_dependents("ghost"),
        Err(GraphError::NotFound { .. })
    ));
}

// ── invalidation closure ───────────────────────────────────────────

#[test]
fn invalidation_closure_excludes_seeds_by_default() {
    let g = diamond();
    let closure = g.invalidation_closure(&["a".to_string()], false);
    assert_eq!(
        closure,
        vec!["b".to_string(), "c".to_string(), "d".to_string()]
    );
}

#[test]
fn invalidation_closure_can_include_seeds() {
    let g = chain();
    let closure = g.invalidation_closure(&["b".to_string()], true);
    assert_eq!(closure, vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn invalidation_closure_unions_multiple_seeds() {
    let g = diamond();
    let closure = g.invalidation_closure(&["b".to_string(), "c".to_string()], false);
    assert_eq!(closure, vec!["d".to_string()]);
}

// ── waves ──────────────────────────────────────────────────────────

#[test]
fn chain_waves_are_one_node_each() {
    let g = chain();
    let plan = topological_waves(&g, "a").unwrap();
    assert_eq!(
        plan.waves,
        vec![
            vec!["a".to_string()],
            vec!["b".to_string()],
            vec!["c".to_string()]
        ]
    );
    assert!(!plan.cycle_in_cascade);
}

#[test]
fn diamond_middle_nodes_share_a_wave() {
    let g = diamond();
    let plan = topological_waves(&g, "a").unwrap();
    assert_eq!(
        plan.waves,
        vec![
            vec!["a".to_string()],
            vec!["b".to_string(), "c".to_string()],
            vec!["d".to_string()]
        ]
    );
}

#[test]
fn leaf_node_gets_a_single_wave() {
    let g = chain();
    let plan = topological_waves(&g, "c").unwrap();
    assert_eq!(plan.waves, vec![vec!["c".to_string()]]);
}

#[test]
fn out_of_cascade_requires_do_not_block_waves() {
    // e depends on both c (in cascade from a) and x (outside it).
    let mut g = chain();
    g.add(node("x", &[])).unwrap();
    g.add(node("e", &["c", "x"])).unwrap();
    let plan = topological_waves(&g, "a").unwrap();
    assert_eq!(
        plan.waves,
        vec![
            vec!["a".to_string()],
            vec!["b".to_string()],
            vec!["c".to_string()],
            vec!["e".to_string()]
        ]
    );
    assert!(!plan.cycle_in_cascade);
}

// ── serde ──────────────────────────────────────────────────────────

#[test]
fn graph_round_trips_through_json() {
    let g = diamond();
    let json = serde_json::to_string(&g).unwrap();
    let back: ArtifactGraph = serde_json::from_str(&json).unwrap();
    assert_eq!(back.artifact_ids(), g.artifact_ids());
    assert_eq!(back.dependents("a").unwrap(), g.dependents("a").unwrap());
}

#[test]
fn corrupt_serialized_graph_fails_to_load() {
    // b requires a ghost node; reconstruction re-validates.
    let json = r#"[{"id":"b","requires":["ghost"]}]"#;
    assert!(serde_json::from_str::<ArtifactGraph>(json).is_err());
}

#[test]
fn empty_graph_behaves() {
    let g = ArtifactGraph::new();
    assert!(g.is_empty());
    assert_eq!(g.artifact_ids(), Vec::<String>::new());
    assert_eq!(g.invalidation_closure(&[], false), Vec::<String>::new());
}
