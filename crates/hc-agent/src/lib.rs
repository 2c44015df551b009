// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-agent
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The narrow interface the engine calls when a file must be rewritten.
//!
//! The engine derives a [`RegenerationSpec`] from the artifact, the wave
//! mode, and the frozen contract; the regenerator returns new file content
//! or raises. The engine writes the content and does not interpret it
//! further. Code generation itself is an external collaborator — this crate
//! carries the contract plus a deterministic [`MockRegenerator`] for tests
//! and dry runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use hc_core::ExtractedContract;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Whether the artifact is the cascade root or a downstream dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegenerationMode {
    /// Wave 0: rewrite the weak node itself.
    Regenerate,
    /// Later waves: update a dependent for compatibility.
    Update,
}

/// Everything a regenerator gets for one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegenerationSpec {
    /// The artifact being rewritten.
    pub artifact_id: String,
    /// The file to produce, relative to the project root.
    pub target_file: String,
    /// Root rewrite or compatibility update.
    pub mode: RegenerationMode,
    /// Human intent for the rewrite.
    pub description: String,
    /// The contract frozen at preview time; the regenerator must
    /// preserve it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_contract: Option<ExtractedContract>,
    /// Free-form context (wave number, weakness kinds, prior failures).
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

/// The regenerator's output: complete new file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegenerationResult {
    /// The full content to write to the target file.
    pub content: String,
}

/// Identity metadata for a regenerator implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegeneratorIdentity {
    /// Stable identifier (e.g. `"mock"`).
    pub id: String,
    /// Implementation version, if known.
    pub version: Option<String>,
}

/// A regenerator that can rewrite artifacts on the engine's behalf.
#[async_trait]
pub trait Regenerator: Send + Sync {
    /// Identity metadata for audit entries.
    fn identity(&self) -> RegeneratorIdentity;

    /// Produce new content for one artifact.
    ///
    /// An error marks the artifact as failed for its wave; the wave
    /// continues with its remaining members.
    async fn regenerate(&self, spec: RegenerationSpec) -> anyhow::Result<RegenerationResult>;
}

/// A typed registry of named [`Regenerator`] implementations.
#[derive(Default)]
pub struct RegeneratorRegistry {
    regenerators: HashMap<String, Arc<dyn Regenerator>>,
}

impl RegeneratorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a regenerator under the given name, replacing any previous
    /// entry.
    pub fn register(&mut self, name: impl Into<String>, regenerator: impl Regenerator + 'static) {
        self.regenerators.insert(name.into(), Arc::new(regenerator));
    }

    /// Return an `Arc` handle to the named regenerator.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Regenerator>> {
        self.regenerators.get(name).cloned()
    }

    /// Sorted list of registered names.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.regenerators.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

/// A deterministic regenerator for tests and dry runs.
///
/// Emits a stub module that *preserves the frozen contract*: every frozen
/// function, class, export, and type annotation reappears in the output, so
/// a cascade driven by the mock passes its contract checks end to end.
#[derive(Debug, Clone, Default)]
pub struct MockRegenerator;

#[async_trait]
impl Regenerator for MockRegenerator {
    fn identity(&self) -> RegeneratorIdentity {
        RegeneratorIdentity {
            id: "mock".to_string(),
            version: Some("0.1".to_string()),
        }
    }

    async fn regenerate(&self, spec: RegenerationSpec) -> anyhow::Result<RegenerationResult> {
        Ok(RegenerationResult {
            content: render_stub(&spec),
        })
    }
}

/// Render a contract-preserving stub module for `spec`.
#[must_use]
pub fn render_stub(spec: &RegenerationSpec) -> String {
    let mut out = String::new();
    out.push_str(&format!("\"\"\"{}\"\"\"\n", spec.description));

    let Some(contract) = &spec.frozen_contract else {
        out.push('\n');
        return out;
    };

    if !contract.exports.is_empty() {
        let quoted: Vec<String> = contract
            .exports
            .iter()
            .map(|e| format!("\"{e}\""))
            .collect();
        out.push_str(&format!("\n__all__ = [{}]\n", quoted.join(", ")));
    }

    for annotation in &contract.type_signatures {
        out.push_str(&format!("\n{annotation} = None\n"));
    }

    for function in &contract.functions {
        out.push_str(&format!("\ndef {function}:\n    ...\n"));
    }

    for class_entry in &contract.classes {
        let (name, methods) = match class_entry.split_once(':') {
            Some((name, methods)) => (
                name.trim(),
                methods
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>(),
            ),
            None => (class_entry.trim(), Vec::new()),
        };
        out.push_str(&format!("\nclass {name}:\n"));
        if methods.is_empty() {
            out.push_str("    ...\n");
        } else {
            for method in methods {
                out.push_str(&format!("    def {method}(self):\n        ...\n"));
            }
        }
    }

    out
}
