// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-based tests spanning crate boundaries: graph/wave invariants,
//! audit chain integrity, contract hash purity, and the confidence
//! formula.

use std::collections::HashSet;

use hc_audit::{AuditLog, BreakReason, IntegrityReport, MemoryBackend, SigningKey, verify_entries};
use hc_core::{ArtifactBuilder, WaveChecks, WaveConfidence};
use hc_graph::{ArtifactGraph, topological_waves};
use proptest::prelude::*;

// ── strategies ─────────────────────────────────────────────────────

/// A layered DAG description: `edges[i]` holds, for node `i`, dependency
/// indices strictly smaller than `i` (so the graph is acyclic by
/// construction).
fn layered_dag(max_nodes: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..3), 1..max_nodes)
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    if i == 0 {
                        Vec::new()
                    } else {
                        let mut resolved: Vec<usize> =
                            deps.into_iter().map(|index| index.index(i)).collect();
                        resolved.sort_unstable();
                        resolved.dedup();
                        resolved
                    }
                })
                .collect()
        })
}

fn build_graph(edges: &[Vec<usize>]) -> ArtifactGraph {
    let artifacts = edges.iter().enumerate().map(|(i, deps)| {
        ArtifactBuilder::new(format!("n{i}"))
            .file(format!("n{i}.py"))
            .requires(deps.iter().map(|d| format!("n{d}")))
            .build()
    });
    ArtifactGraph::from_artifacts(artifacts).expect("layered construction is acyclic")
}

// ── graph and wave properties ──────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Invariant: waves[0] is exactly the root, and every artifact in a
    /// later wave has its in-cascade dependencies satisfied by the union
    /// of the earlier waves.
    #[test]
    fn waves_respect_dependencies(edges in layered_dag(12)) {
        let graph = build_graph(&edges);
        let plan = topological_waves(&graph, "n0").unwrap();

        prop_assert_eq!(&plan.waves[0], &vec!["n0".to_string()]);
        prop_assert!(!plan.cycle_in_cascade, "layered DAGs never cycle");

        let cascade: HashSet<String> = plan.waves.iter().flatten().cloned().collect();
        let mut completed: HashSet<String> = HashSet::new();
        for wave in &plan.waves {
            for id in wave {
                let artifact = graph.get(id).unwrap();
                for dep in &artifact.requires {
                    if cascade.contains(dep) {
                        prop_assert!(
                            completed.contains(dep),
                            "{id} scheduled before in-cascade dependency {dep}"
                        );
                    }
                }
            }
            completed.extend(wave.iter().cloned());
        }
    }

    /// Every cascade member appears in exactly one wave, and the wave set
    /// equals {root} ∪ transitive_dependents(root).
    #[test]
    fn waves_partition_the_closure(edges in layered_dag(12)) {
        let graph = build_graph(&edges);
        let plan = topological_waves(&graph, "n0").unwrap();

        let mut seen = HashSet::new();
        for wave in &plan.waves {
            for id in wave {
                prop_assert!(seen.insert(id.clone()), "{id} appears twice");
            }
        }

        let mut expected: HashSet<String> = graph
            .transitive_dependents("n0")
            .unwrap()
            .into_iter()
            .collect();
        expected.insert("n0".to_string());
        prop_assert_eq!(seen, expected);
    }

    /// Fan-out equals the size of the transitive closure, and the closure
    /// is deterministic.
    #[test]
    fn fan_out_matches_closure(edges in layered_dag(12)) {
        let graph = build_graph(&edges);
        for id in graph.artifact_ids() {
            let closure = graph.transitive_dependents(&id).unwrap();
            prop_assert_eq!(graph.fan_out(&id).unwrap() as usize, closure.len());
            prop_assert_eq!(&closure, &graph.transitive_dependents(&id).unwrap());
        }
    }

    /// Adding a fresh leaf and removing it restores the serialized graph.
    #[test]
    fn add_remove_round_trips(edges in layered_dag(10)) {
        let mut graph = build_graph(&edges);
        let before = serde_json::to_string(&graph).unwrap();

        graph
            .add(
                ArtifactBuilder::new("fresh_leaf")
                    .file("fresh_leaf.py")
                    .requires(["n0"])
                    .build(),
            )
            .unwrap();
        graph.remove("fresh_leaf").unwrap();

        prop_assert_eq!(before, serde_json::to_string(&graph).unwrap());
    }
}

// ── confidence properties ──────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Confidence is always in [0, 1] and has one deduction per failed
    /// check.
    #[test]
    fn confidence_bounds_and_deductions(
        tests in any::<bool>(),
        types in any::<bool>(),
        lint in any::<bool>(),
        contracts in any::<bool>(),
    ) {
        let conf = WaveConfidence::compute(
            0,
            vec![],
            WaveChecks {
                tests_passed: tests,
                types_clean: types,
                lint_clean: lint,
                contracts_preserved: contracts,
            },
        );
        prop_assert!((0.0..=1.0).contains(&conf.confidence));
        let failed = [tests, types, lint, contracts].iter().filter(|b| !**b).count();
        prop_assert_eq!(conf.deductions.len(), failed);

        let expected: f64 = 1.0
            - if tests { 0.0 } else { 0.4 }
            - if types { 0.0 } else { 0.2 }
            - if lint { 0.0 } else { 0.1 }
            - if contracts { 0.0 } else { 0.3 };
        prop_assert!((conf.confidence - expected.max(0.0)).abs() < 1e-9);
    }
}

// ── audit chain properties ─────────────────────────────────────────

fn signing_key() -> SigningKey {
    SigningKey::new(b"property-key".to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A freshly built chain always verifies, and editing any single
    /// entry's details breaks it at exactly that offset.
    #[test]
    fn chain_verifies_until_tampered(
        actions in prop::collection::vec("[a-z]{1,12}", 1..8),
        victim in any::<prop::sample::Index>(),
    ) {
        let mut log = AuditLog::open(MemoryBackend::new(), signing_key()).unwrap();
        for action in &actions {
            log.append("prop", action.clone(), serde_json::json!({"a": action}), "", "")
                .unwrap();
        }
        prop_assert_eq!(
            log.verify_integrity().unwrap(),
            IntegrityReport::Valid { verified: actions.len() as u64 }
        );

        let mut entries = log.query(&hc_audit::AuditQuery::default()).unwrap();
        let index = victim.index(entries.len());
        entries[index].details = serde_json::json!({"a": "tampered"});
        match verify_entries(&entries, &signing_key()).unwrap() {
            IntegrityReport::Broken { first_broken, reason } => {
                prop_assert_eq!(first_broken, index as u64);
                prop_assert_eq!(reason, BreakReason::EntryHash);
            }
            IntegrityReport::Valid { .. } => prop_assert!(false, "tampering undetected"),
        }
    }
}

// ── contract hash purity ───────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The interface hash is a pure function of the public surface:
    /// declaration order and extra whitespace never change it, while any
    /// signature change does.
    #[test]
    fn interface_hash_is_pure(
        names in prop::collection::hash_set("[a-z][a-z0-9]{0,6}", 1..5),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let forward: String = names
            .iter()
            .map(|n| format!("def {n}(x: int) -> int:\n    return x\n\n"))
            .collect();
        let reversed: String = names
            .iter()
            .rev()
            .map(|n| format!("def  {n}( x : int ) -> int :\n    return x\n\n"))
            .collect();

        let a = hc_contract::extract_from_source("m", "m.py", &forward).unwrap();
        let b = hc_contract::extract_from_source("m", "m.py", &reversed).unwrap();
        prop_assert_eq!(&a.interface_hash, &b.interface_hash);

        // Changing one signature changes the hash.
        let changed = forward.replacen("x: int", "x: str", 1);
        let c = hc_contract::extract_from_source("m", "m.py", &changed).unwrap();
        prop_assert_ne!(&a.interface_hash, &c.interface_hash);
    }
}
