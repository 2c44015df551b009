// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error taxonomy for the public operation surface.
//!
//! Every failure that crosses the public API carries a stable,
//! machine-readable [`ErrorKind`], a human message, the [`Phase`] it arose
//! in, and arbitrary key-value context (artifact id, wave number, tool
//! name). Internal layers may use richer crate-local error enums; they are
//! converted to [`CoreError`] at component boundaries.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The engine phase an error arose in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Weakness scanning.
    Scan,
    /// Cascade planning / preview.
    Plan,
    /// Wave execution.
    Execute,
    /// Wave or integration verification.
    Verify,
    /// Audit log operations.
    Audit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scan => "scan",
            Self::Plan => "plan",
            Self::Execute => "execute",
            Self::Verify => "verify",
            Self::Audit => "audit",
        };
        f.write_str(s)
    }
}

/// Stable machine-readable failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The referenced artifact does not exist in the graph.
    ArtifactNotFound,
    /// The supplied execution policy is malformed.
    InvalidPolicy,
    /// The cascade exceeds configured size/depth limits.
    CascadeTooLarge,

    /// An artifact with this id already exists.
    DuplicateId,
    /// A `requires` edge references a missing artifact.
    DanglingRequires,
    /// The mutation would introduce a dependency cycle.
    CycleDetected,
    /// Wave computation found a cycle inside the cascade subgraph.
    CycleInCascade,

    /// A source file could not be parsed for contract extraction.
    ContractExtractionFailed,

    /// A verification tool is not installed.
    ToolMissing,
    /// A verification tool exceeded its timeout.
    ToolTimeout,
    /// A verification tool crashed.
    ToolCrash,

    /// Repeated low confidence forced human review.
    Escalated,
    /// The cascade was terminally aborted.
    Aborted,

    /// The audit log could not be durably written.
    AuditAppendFailed,
    /// Audit chain verification found a broken entry.
    AuditIntegrityBroken,

    /// Catch-all for unexpected internal failures.
    Internal,
}

impl ErrorKind {
    /// The stable string code for this kind (matches serde).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::ArtifactNotFound => "artifact_not_found",
            Self::InvalidPolicy => "invalid_policy",
            Self::CascadeTooLarge => "cascade_too_large",
            Self::DuplicateId => "duplicate_id",
            Self::DanglingRequires => "dangling_requires",
            Self::CycleDetected => "cycle_detected",
            Self::CycleInCascade => "cycle_in_cascade",
            Self::ContractExtractionFailed => "contract_extraction_failed",
            Self::ToolMissing => "tool_missing",
            Self::ToolTimeout => "tool_timeout",
            Self::ToolCrash => "tool_crash",
            Self::Escalated => "escalated",
            Self::Aborted => "aborted",
            Self::AuditAppendFailed => "audit_append_failed",
            Self::AuditIntegrityBroken => "audit_integrity_broken",
            Self::Internal => "internal",
        }
    }
}

/// A failure crossing the public operation surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CoreError {
    /// Stable machine-readable kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// The phase the failure arose in.
    pub phase: Phase,
    /// Optional context: artifact id, wave number, tool name, paths.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl CoreError {
    /// Start building an error of the given kind in the given phase.
    #[must_use]
    pub fn new(kind: ErrorKind, phase: Phase, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            phase,
            context: BTreeMap::new(),
        }
    }

    /// Attach one key-value context pair.
    ///
    /// # Examples
    ///
    /// ```
    /// use hc_core::{CoreError, ErrorKind, Phase};
    ///
    /// let err = CoreError::new(ErrorKind::ArtifactNotFound, Phase::Plan, "no such artifact")
    ///     .with_context("artifact_id", "api.users");
    /// assert_eq!(err.kind.code(), "artifact_not_found");
    /// assert_eq!(err.context["artifact_id"], "api.users");
    /// ```
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.phase, self.kind.code(), self.message)?;
        if !self.context.is_empty() {
            write!(f, " (")?;
            for (i, (k, v)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{k}={v}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for CoreError {}
