// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The stable contract for the health-cascade engine.
//!
//! If you only take one dependency, take this one. Every other crate in the
//! workspace speaks the types defined here: artifacts and their declared
//! integrations, weakness signals and scores, extracted interface contracts,
//! cascade previews, wave confidence, the cascade execution state machine,
//! and the closed event enumeration.

/// Artifact identity, dependencies, and declared integrations.
pub mod artifact;
/// Wave confidence scoring from verification signals.
pub mod confidence;
/// Extracted public-interface contracts and compatibility rules.
pub mod contract;
/// Error taxonomy for the public operation surface.
pub mod error;
/// The closed cascade event enumeration.
pub mod event;
/// The cascade execution state machine.
pub mod execution;
/// Cascade previews: invalidation closure, waves, effort, risk.
pub mod preview;
/// Weakness signals, scores, and scan reports.
pub mod weakness;

pub use artifact::{Artifact, ArtifactBuilder, IntegrationKind, RequiredIntegration};
pub use confidence::{WaveChecks, WaveConfidence};
pub use contract::ExtractedContract;
pub use error::{CoreError, ErrorKind, Phase};
pub use event::{CascadeEvent, CascadeEventKind, PauseReason};
pub use execution::{CascadeExecution, ExecutionPolicy};
pub use preview::{CascadePreview, EstimatedEffort};
pub use weakness::{CascadeRisk, WeaknessKind, WeaknessReport, WeaknessScore, WeaknessSignal};

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Current event-stream schema version embedded in stream headers.
///
/// Additive event changes keep this version; breaking payload changes bump it.
pub const EVENT_SCHEMA_VERSION: &str = "hc/v0.1";

/// Number of hex characters kept from a full SHA-256 digest for interface
/// hashes and other short identifiers.
pub const SHORT_HASH_LEN: usize = 16;

/// Errors from contract-level operations (serialization, hashing).
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// JSON serialization or deserialization failed.
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Produce a deterministic JSON string for hashing.
///
/// This is not a full JCS implementation, but it is stable for our types:
/// - keys are sorted (serde_json Map is a BTreeMap by default)
/// - numbers are serialized consistently by serde_json
///
/// # Errors
///
/// Returns [`ContractError::Json`] if the value cannot be serialized.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, ContractError> {
    let v = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&v)?)
}

/// Compute the hex-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compute the [`SHORT_HASH_LEN`]-character prefix of the SHA-256 of `bytes`.
///
/// # Examples
///
/// ```
/// let h = hc_core::short_hash(b"def foo(x: int) -> int");
/// assert_eq!(h.len(), hc_core::SHORT_HASH_LEN);
/// assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn short_hash(bytes: &[u8]) -> String {
    let mut h = sha256_hex(bytes);
    h.truncate(SHORT_HASH_LEN);
    h
}
