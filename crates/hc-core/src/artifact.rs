// SPDX-License-Identifier: MIT OR Apache-2.0
//! Artifact identity, ordering dependencies, and declared integrations.
//!
//! An [`Artifact`] is one schedulable unit of source. Its `requires` edges
//! express ordering (build-before), while [`RequiredIntegration`]s express
//! *wiring* — the consumer must actually import/call/route/register the
//! dependency, and the integration verifier checks that the wiring exists.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How an artifact wires to one of its dependencies.
///
/// Distinct from the ordering edge: `requires` says "build the target first",
/// the integration kind says *how* the consumer's source must reference it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationKind {
    /// The consumer imports a symbol from the target.
    Import,
    /// The consumer calls a function exported by the target.
    Call,
    /// The consumer registers a route handled by the target.
    Route,
    /// The consumer references the target through configuration.
    Config,
    /// The consumer defines a class inheriting from the target symbol.
    Inherit,
    /// The consumer registers the target in a registry/plugin table.
    Register,
}

impl IntegrationKind {
    /// Stable wire name for this kind (matches the serde representation).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Call => "call",
            Self::Route => "route",
            Self::Config => "config",
            Self::Inherit => "inherit",
            Self::Register => "register",
        }
    }
}

impl std::fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared wiring from an artifact to one of its dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequiredIntegration {
    /// Which dependency is being wired. Must appear in the owning
    /// artifact's `requires` set.
    pub target_artifact_id: String,

    /// How the wiring must manifest in source.
    pub kind: IntegrationKind,

    /// Where the wiring must appear (usually the consumer's own file).
    pub target_file: String,

    /// Optional regex used as the low-cost existence check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_pattern: Option<String>,

    /// Optional expected signature of the wired symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_expectation: Option<String>,
}

impl RequiredIntegration {
    /// Stable edge identifier used in integration check events.
    #[must_use]
    pub fn edge_id(&self, consumer_id: &str) -> String {
        format!("{consumer_id}->{}", self.target_artifact_id)
    }
}

/// One schedulable unit of source in the artifact graph.
///
/// An artifact without a `produces_file` is *virtual*: it can participate in
/// ordering but is skipped by scanning and contract extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    /// Stable identifier, unique within a graph.
    pub id: String,

    /// Filesystem path this artifact produces, relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produces_file: Option<String>,

    /// Ids of artifacts this node directly depends on (ordering edges).
    /// Insertion order is preserved for deterministic serialization.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Declared wiring to dependencies, checked by the integration verifier.
    #[serde(default)]
    pub integrations: Vec<RequiredIntegration>,

    /// Free-form declared contract description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_declared: Option<String>,

    /// Policy tier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,

    /// Policy tags (e.g. `"cascade"`, mode tags).
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Artifact {
    /// Returns `true` if this artifact has no backing file.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.produces_file.is_none()
    }

    /// Returns `true` if `dep_id` is a direct ordering dependency.
    #[must_use]
    pub fn requires_artifact(&self, dep_id: &str) -> bool {
        self.requires.iter().any(|d| d == dep_id)
    }
}

/// Builder for constructing [`Artifact`]s ergonomically.
///
/// # Examples
///
/// ```
/// use hc_core::{ArtifactBuilder, IntegrationKind};
///
/// let artifact = ArtifactBuilder::new("api.users")
///     .file("src/api/users.py")
///     .requires(["models.user"])
///     .integration("models.user", IntegrationKind::Import, "src/api/users.py")
///     .tag("cascade")
///     .build();
///
/// assert_eq!(artifact.id, "api.users");
/// assert_eq!(artifact.requires, vec!["models.user".to_string()]);
/// assert_eq!(artifact.integrations.len(), 1);
/// ```
#[derive(Debug)]
pub struct ArtifactBuilder {
    artifact: Artifact,
}

impl ArtifactBuilder {
    /// Create a new builder for the given artifact id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            artifact: Artifact {
                id: id.into(),
                produces_file: None,
                requires: Vec::new(),
                integrations: Vec::new(),
                contract_declared: None,
                tier: None,
                tags: Vec::new(),
            },
        }
    }

    /// Set the file this artifact produces.
    #[must_use]
    pub fn file(mut self, path: impl Into<String>) -> Self {
        self.artifact.produces_file = Some(path.into());
        self
    }

    /// Add ordering dependencies. Duplicates are ignored.
    #[must_use]
    pub fn requires<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            if !self.artifact.requires_artifact(&id) {
                self.artifact.requires.push(id);
            }
        }
        self
    }

    /// Declare a wiring to `target` of the given `kind`, checked in `file`.
    ///
    /// Also records `target` as an ordering dependency if not already present,
    /// preserving the invariant that every integration target is required.
    #[must_use]
    pub fn integration(
        mut self,
        target: impl Into<String>,
        kind: IntegrationKind,
        file: impl Into<String>,
    ) -> Self {
        let target = target.into();
        if !self.artifact.requires_artifact(&target) {
            self.artifact.requires.push(target.clone());
        }
        self.artifact.integrations.push(RequiredIntegration {
            target_artifact_id: target,
            kind,
            target_file: file.into(),
            verification_pattern: None,
            contract_expectation: None,
        });
        self
    }

    /// Set the verification pattern on the most recently added integration.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        if let Some(last) = self.artifact.integrations.last_mut() {
            last.verification_pattern = Some(pattern.into());
        }
        self
    }

    /// Set the contract expectation on the most recently added integration.
    #[must_use]
    pub fn expectation(mut self, expectation: impl Into<String>) -> Self {
        if let Some(last) = self.artifact.integrations.last_mut() {
            last.contract_expectation = Some(expectation.into());
        }
        self
    }

    /// Set the declared contract description.
    #[must_use]
    pub fn contract(mut self, description: impl Into<String>) -> Self {
        self.artifact.contract_declared = Some(description.into());
        self
    }

    /// Set the policy tier.
    #[must_use]
    pub fn tier(mut self, tier: impl Into<String>) -> Self {
        self.artifact.tier = Some(tier.into());
        self
    }

    /// Add a policy tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.artifact.tags.push(tag.into());
        self
    }

    /// Finish building the artifact.
    #[must_use]
    pub fn build(self) -> Artifact {
        self.artifact
    }
}
