// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-graph
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The typed artifact dependency graph.
//!
//! [`ArtifactGraph`] stores artifacts in insertion order, caches direct
//! dependents on insert, and answers the traversal questions cascade
//! planning needs: transitive dependents, fan-out, depth, invalidation
//! closures, and topological waves. Every mutation is atomic — a rejected
//! operation leaves the graph untouched — and the structural invariants
//! (acyclicity, no dangling `requires`, integration targets required) are
//! enforced at the mutation boundary.

mod waves;

pub use waves::{WavePlan, topological_waves};

use std::collections::{HashMap, HashSet, VecDeque};

use hc_core::{Artifact, CoreError, ErrorKind, Phase};
use serde::{Deserialize, Serialize};

/// Errors from graph mutations and lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An artifact with this id already exists.
    #[error("duplicate artifact id: {id}")]
    DuplicateId {
        /// The conflicting id.
        id: String,
    },

    /// A `requires` edge references an artifact that does not exist.
    #[error("artifact {id} requires missing artifact {missing}")]
    DanglingRequires {
        /// The artifact being added or updated.
        id: String,
        /// The missing dependency.
        missing: String,
    },

    /// An integration targets an artifact outside the `requires` set.
    #[error("artifact {id} declares an integration to {target} outside its requires set")]
    IntegrationOutsideRequires {
        /// The artifact being added or updated.
        id: String,
        /// The integration target.
        target: String,
    },

    /// The mutation would introduce a dependency cycle.
    #[error("operation would introduce a cycle through {id}")]
    CycleDetected {
        /// The artifact the cycle passes through.
        id: String,
    },

    /// The requested artifact does not exist.
    #[error("artifact not found: {id}")]
    NotFound {
        /// The missing id.
        id: String,
    },

    /// Removal refused because other artifacts still require this one.
    #[error("artifact {id} still has dependents: {dependents:?}")]
    HasDependents {
        /// The artifact that was to be removed.
        id: String,
        /// Direct dependents blocking the removal.
        dependents: Vec<String>,
    },
}

impl From<GraphError> for CoreError {
    fn from(err: GraphError) -> Self {
        let kind = match &err {
            GraphError::DuplicateId { .. } => ErrorKind::DuplicateId,
            GraphError::DanglingRequires { .. } | GraphError::IntegrationOutsideRequires { .. } => {
                ErrorKind::DanglingRequires
            }
            GraphError::CycleDetected { .. } => ErrorKind::CycleDetected,
            GraphError::NotFound { .. } => ErrorKind::ArtifactNotFound,
            GraphError::HasDependents { .. } => ErrorKind::DanglingRequires,
        };
        CoreError::new(kind, Phase::Plan, err.to_string())
    }
}

/// The artifact dependency graph.
///
/// Serialization round-trips through the plain artifact list; the dependent
/// cache and id index are rebuilt on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Artifact>", into = "Vec<Artifact>")]
pub struct ArtifactGraph {
    artifacts: Vec<Artifact>,
    index: HashMap<String, usize>,
    // Direct successors, in the insertion order of the depending artifacts.
    dependents: HashMap<String, Vec<String>>,
}

impl ArtifactGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from artifacts, validating each addition in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`GraphError`] encountered; the partial graph is
    /// discarded.
    pub fn from_artifacts(
        artifacts: impl IntoIterator<Item = Artifact>,
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for artifact in artifacts {
            graph.add(artifact)?;
        }
        Ok(graph)
    }

    /// Number of artifacts in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Returns `true` if the graph holds no artifacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// All artifact ids in insertion order.
    #[must_use]
    pub fn artifact_ids(&self) -> Vec<String> {
        self.artifacts.iter().map(|a| a.id.clone()).collect()
    }

    /// Iterate artifacts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    /// Look up an artifact by id.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotFound`] for unknown ids.
    pub fn get(&self, id: &str) -> Result<&Artifact, GraphError> {
        self.index
            .get(id)
            .map(|&i| &self.artifacts[i])
            .ok_or_else(|| GraphError::NotFound { id: id.to_string() })
    }

    /// Returns `true` if an artifact with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Add a new artifact, enforcing all structural invariants.
    ///
    /// The operation is atomic: on any error the graph is unchanged.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DuplicateId`] if the id exists.
    /// - [`GraphError::DanglingRequires`] if a dependency is missing.
    /// - [`GraphError::IntegrationOutsideRequires`] if an integration
    ///   targets an artifact not in `requires`.
    /// - [`GraphError::CycleDetected`] if the artifact requires itself.
    pub fn add(&mut self, artifact: Artifact) -> Result<(), GraphError> {
        if self.index.contains_key(&artifact.id) {
            return Err(GraphError::DuplicateId { id: artifact.id });
        }
        self.validate_edges(&artifact)?;

        // A fresh node has no inbound edges yet, so the only possible cycle
        // is a self-require, rejected by validate_edges.
        let id = artifact.id.clone();
        let requires = artifact.requires.clone();
        self.index.insert(id.clone(), self.artifacts.len());
        self.artifacts.push(artifact);
        for dep in &requires {
            self.dependents.entry(dep.clone()).or_default().push(id.clone());
        }
        Ok(())
    }

    /// Replace an existing artifact's definition.
    ///
    /// Unlike [`add`](Self::add), an update can create a cycle through
    /// existing inbound edges, so the full path check runs before anything
    /// is mutated.
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add), plus [`GraphError::NotFound`] when the
    /// id does not exist and [`GraphError::CycleDetected`] when a new
    /// dependency path leads back to the artifact.
    pub fn update(&mut self, artifact: Artifact) -> Result<(), GraphError> {
        let Some(&idx) = self.index.get(&artifact.id) else {
            return Err(GraphError::NotFound { id: artifact.id });
        };
        self.validate_edges(&artifact)?;

        // Would any new dependency reach back to this node?
        for dep in &artifact.requires {
            if self.reaches(dep, &artifact.id, &artifact.id) {
                return Err(GraphError::CycleDetected {
                    id: artifact.id.clone(),
                });
            }
        }

        let old = std::mem::replace(&mut self.artifacts[idx], artifact);
        for dep in &old.requires {
            if let Some(list) = self.dependents.get_mut(dep) {
                list.retain(|d| d != &old.id);
            }
        }
        let new = self.artifacts[idx].clone();
        for dep in &new.requires {
            self.dependents.entry(dep.clone()).or_default().push(new.id.clone());
        }
        Ok(())
    }

    /// Remove an artifact that nothing depends on.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NotFound`] for unknown ids.
    /// - [`GraphError::HasDependents`] when removal would leave dangling
    ///   `requires` edges.
    pub fn remove(&mut self, id: &str) -> Result<Artifact, GraphError> {
        let Some(&idx) = self.index.get(id) else {
            return Err(GraphError::NotFound { id: id.to_string() });
        };
        let dependents = self.dependents.get(id).cloned().unwrap_or_default();
        if !dependents.is_empty() {
            return Err(GraphError::HasDependents {
                id: id.to_string(),
                dependents,
            });
        }

        let removed = self.artifacts.remove(idx);
        self.index.remove(id);
        self.dependents.remove(id);
        for dep in &removed.requires {
            if let Some(list) = self.dependents.get_mut(dep) {
                list.retain(|d| d != id);
            }
        }
        // Reindex everything after the removed position.
        for (i, a) in self.artifacts.iter().enumerate().skip(idx) {
            self.index.insert(a.id.clone(), i);
        }
        Ok(removed)
    }

    /// Direct successors of `id`, in the insertion order of the dependents.
    ///
    /// Served from the cache maintained on insert; no traversal happens.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotFound`] for unknown ids.
    pub fn dependents(&self, id: &str) -> Result<Vec<String>, GraphError> {
        if !self.contains(id) {
            return Err(GraphError::NotFound { id: id.to_string() });
        }
        Ok(self.dependents.get(id).cloned().unwrap_or_default())
    }

    /// All artifacts that transitively depend on `id`, exclusive of `id`.
    ///
    /// BFS over the dependent cache. Ordering is deterministic: nodes are
    /// emitted in first-visit order, and each frontier expands in the
    /// insertion order of the graph (ties broken lexicographically by id).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotFound`] for unknown ids.
    pub fn transitive_dependents(&self, id: &str) -> Result<Vec<String>, GraphError> {
        if !self.contains(id) {
            return Err(GraphError::NotFound { id: id.to_string() });
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(id);
        seen.insert(id);

        while let Some(current) = queue.pop_front() {
            let mut next: Vec<&String> = self
                .dependents
                .get(current)
                .map(|v| v.iter().filter(|d| !seen.contains(d.as_str())).collect())
                .unwrap_or_default();
            // Insertion indices are unique, so the lexicographic tie-break
            // never has to fire; it is the documented fallback ordering.
            next.sort_by_key(|d| self.index[d.as_str()]);
            for dep in next {
                seen.insert(dep);
                order.push(dep.clone());
                queue.push_back(dep);
            }
        }
        Ok(order)
    }

    /// Number of artifacts that transitively depend on `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotFound`] for unknown ids.
    pub fn fan_out(&self, id: &str) -> Result<u32, GraphError> {
        Ok(self.transitive_dependents(id)?.len() as u32)
    }

    /// Longest inbound dependency chain ending at `id`.
    ///
    /// A node with no `requires` has depth 0.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotFound`] for unknown ids.
    pub fn depth(&self, id: &str) -> Result<u32, GraphError> {
        if !self.contains(id) {
            return Err(GraphError::NotFound { id: id.to_string() });
        }
        let mut memo: HashMap<&str, u32> = HashMap::new();
        Ok(self.depth_inner(id, &mut memo))
    }

    fn depth_inner<'a>(&'a self, id: &'a str, memo: &mut HashMap<&'a str, u32>) -> u32 {
        if let Some(&d) = memo.get(id) {
            return d;
        }
        let artifact = &self.artifacts[self.index[id]];
        let d = artifact
            .requires
            .iter()
            .filter(|r| self.contains(r))
            .map(|r| {
                let key: &str = &self.artifacts[self.index[r.as_str()]].id;
                1 + self.depth_inner(key, memo)
            })
            .max()
            .unwrap_or(0);
        memo.insert(&self.artifacts[self.index[id]].id, d);
        d
    }

    /// Longest chain of dependents rooted at `id` (the cascade depth the
    /// planner gates on).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotFound`] for unknown ids.
    pub fn dependent_depth(&self, id: &str) -> Result<u32, GraphError> {
        if !self.contains(id) {
            return Err(GraphError::NotFound { id: id.to_string() });
        }
        let mut memo: HashMap<&str, u32> = HashMap::new();
        Ok(self.dependent_depth_inner(id, &mut memo))
    }

    fn dependent_depth_inner<'a>(
        &'a self,
        id: &'a str,
        memo: &mut HashMap<&'a str, u32>,
    ) -> u32 {
        if let Some(&d) = memo.get(id) {
            return d;
        }
        let d = self
            .dependents
            .get(id)
            .into_iter()
            .flatten()
            .map(|dep| {
                let key: &str = &self.artifacts[self.index[dep.as_str()]].id;
                1 + self.dependent_depth_inner(key, memo)
            })
            .max()
            .unwrap_or(0);
        memo.insert(&self.artifacts[self.index[id]].id, d);
        d
    }

    /// Transitive-dependents union over `seeds`.
    ///
    /// With `include_seeds` the seed ids appear first (in seed order);
    /// otherwise only the downstream closure is returned. Unknown seeds are
    /// skipped.
    #[must_use]
    pub fn invalidation_closure(&self, seeds: &[String], include_seeds: bool) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut order = Vec::new();
        for seed in seeds {
            if !self.contains(seed) {
                continue;
            }
            if include_seeds && seen.insert(seed.clone()) {
                order.push(seed.clone());
            }
            if let Ok(closure) = self.transitive_dependents(seed) {
                for id in closure {
                    if !seeds.contains(&id) && seen.insert(id.clone()) {
                        order.push(id);
                    }
                }
            }
        }
        order
    }

    /// Validate `requires`, integration, and self-reference constraints.
    fn validate_edges(&self, artifact: &Artifact) -> Result<(), GraphError> {
        for dep in &artifact.requires {
            if dep == &artifact.id {
                return Err(GraphError::CycleDetected {
                    id: artifact.id.clone(),
                });
            }
            if !self.contains(dep) {
                return Err(GraphError::DanglingRequires {
                    id: artifact.id.clone(),
                    missing: dep.clone(),
                });
            }
        }
        for integration in &artifact.integrations {
            if !artifact.requires_artifact(&integration.target_artifact_id) {
                return Err(GraphError::IntegrationOutsideRequires {
                    id: artifact.id.clone(),
                    target: integration.target_artifact_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Does following `requires` edges from `from` reach `target`?
    ///
    /// `skip` is the artifact being re-defined; its *old* edges must not
    /// count while checking an update.
    fn reaches(&self, from: &str, target: &str, skip: &str) -> bool {
        if from == target {
            return true;
        }
        let mut stack = vec![from];
        let mut seen: HashSet<&str> = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) || current == skip {
                continue;
            }
            let Some(&idx) = self.index.get(current) else {
                continue;
            };
            for dep in &self.artifacts[idx].requires {
                if dep == target {
                    return true;
                }
                stack.push(dep);
            }
        }
        false
    }
}

impl TryFrom<Vec<Artifact>> for ArtifactGraph {
    type Error = GraphError;

    fn try_from(artifacts: Vec<Artifact>) -> Result<Self, Self::Error> {
        Self::from_artifacts(artifacts)
    }
}

impl From<ArtifactGraph> for Vec<Artifact> {
    fn from(graph: ArtifactGraph) -> Self {
        graph.artifacts
    }
}

#[cfg(test)]
mod tests;
