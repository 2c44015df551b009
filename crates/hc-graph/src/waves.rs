// SPDX-License-Identifier: MIT OR Apache-2.0
//! Topological wave computation over a cascade subgraph.
//!
//! A wave is a set of artifacts whose regenerations may proceed in parallel
//! because every in-cascade dependency is satisfied by earlier waves.

use std::collections::HashSet;

use crate::{ArtifactGraph, GraphError};

/// The waves computed for one cascade, plus the cycle fallback flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavePlan {
    /// Ordered waves; `waves[0]` is always the root alone.
    pub waves: Vec<Vec<String>>,
    /// Set when a non-empty remainder produced no eligible next wave and
    /// the leftover nodes were emitted as a final insertion-order wave.
    pub cycle_in_cascade: bool,
}

/// Compute topological waves for regenerating `root` and everything that
/// transitively depends on it.
///
/// Wave 0 is `[root]`. Each subsequent wave contains every not-yet-scheduled
/// dependent whose in-cascade `requires` are all satisfied by earlier waves.
/// If the remainder ever yields an empty wave, the leftover nodes go into a
/// single final wave in insertion order so execution can still make progress
/// (the contract checks catch regressions there).
///
/// # Errors
///
/// Returns [`GraphError::NotFound`] when `root` does not exist.
pub fn topological_waves(graph: &ArtifactGraph, root: &str) -> Result<WavePlan, GraphError> {
    let impacted = graph.transitive_dependents(root)?;

    let mut cascade: HashSet<&str> = impacted.iter().map(String::as_str).collect();
    cascade.insert(root);

    let mut waves = vec![vec![root.to_string()]];
    let mut completed: HashSet<&str> = HashSet::new();
    completed.insert(root);

    let mut remaining: Vec<&String> = impacted.iter().collect();
    let mut cycle_in_cascade = false;

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&String>, Vec<&String>) =
            remaining.into_iter().partition(|id| {
                let artifact = graph
                    .get(id)
                    .expect("cascade members come from the graph");
                artifact
                    .requires
                    .iter()
                    .filter(|dep| cascade.contains(dep.as_str()))
                    .all(|dep| completed.contains(dep.as_str()))
            });

        if ready.is_empty() {
            // Cycle inside the cascade subgraph. Emit what is left in
            // insertion order as one final wave.
            cycle_in_cascade = true;
            waves.push(blocked.iter().map(|id| (*id).clone()).collect());
            break;
        }

        for id in &ready {
            completed.insert(id.as_str());
        }
        waves.push(ready.iter().map(|id| (*id).clone()).collect());
        remaining = blocked;
    }

    Ok(WavePlan {
        waves,
        cycle_in_cascade,
    })
}
