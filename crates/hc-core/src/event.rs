// SPDX-License-Identifier: MIT OR Apache-2.0
//! The closed cascade event enumeration.
//!
//! Every observable engine decision is one [`CascadeEvent`]: a monotonic
//! sequence number, a timestamp, and a typed payload. Within one cascade,
//! events are linearly ordered by `seq`. Additive variants are permitted;
//! breaking payload changes bump [`crate::EVENT_SCHEMA_VERSION`].

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::artifact::IntegrationKind;

/// Why a cascade paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// Auto-approve is off; the wave completed cleanly and awaits approval.
    Manual,
    /// The wave scored below the confidence threshold.
    LowConfidence,
    /// Repeated low confidence forced human review.
    Escalation,
}

/// A timestamped, sequence-numbered event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CascadeEvent {
    /// Monotonic sequence number within the producing stream.
    pub seq: u64,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    #[serde(flatten)]
    pub kind: CascadeEventKind,
}

impl CascadeEvent {
    /// Stamp `kind` with a sequence number and the current time.
    #[must_use]
    pub fn now(seq: u64, kind: CascadeEventKind) -> Self {
        Self {
            seq,
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// The payload discriminator for [`CascadeEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CascadeEventKind {
    /// A scan pass started.
    ScanStart {
        /// Root of the project being scanned.
        project_root: String,
    },
    /// A scan pass finished.
    ScanComplete {
        /// Number of analyzable files visited.
        files_scanned: u32,
        /// Count of critical-risk scores.
        critical_count: u32,
        /// Count of high-risk scores.
        high_count: u32,
        /// Count of medium-risk scores.
        medium_count: u32,
        /// Count of low-risk scores.
        low_count: u32,
    },

    /// A cascade preview was computed.
    CascadePreview {
        /// The selected weak node.
        weak_node: String,
        /// Total artifacts in the blast radius, including the weak node.
        total_impacted: u32,
        /// Number of waves.
        wave_count: u32,
        /// The preview's risk assessment string.
        risk: String,
    },

    /// A contract was captured (or found unavailable) at preview time.
    ContractCaptured {
        /// The artifact the capture was for.
        artifact_id: String,
        /// The interface hash, when extraction succeeded.
        interface_hash: Option<String>,
        /// `"extracted"`, or `"unavailable"` when the file did not parse.
        contract_source: String,
    },

    /// A wave began executing.
    WaveStart {
        /// Zero-based wave index.
        wave_num: u32,
        /// Members of the wave.
        artifacts: Vec<String>,
    },
    /// Every artifact in a wave has been attempted.
    WaveGenerated {
        /// Zero-based wave index.
        wave_num: u32,
        /// Artifacts whose regeneration succeeded.
        succeeded: Vec<String>,
        /// Artifacts whose regeneration failed.
        failed: Vec<String>,
    },
    /// The verifier scored a wave.
    WaveScored {
        /// Zero-based wave index.
        wave_num: u32,
        /// The computed confidence.
        confidence: f64,
        /// Test check outcome.
        tests_passed: bool,
        /// Type check outcome.
        types_clean: bool,
        /// Lint check outcome.
        lint_clean: bool,
        /// Contract preservation outcome.
        contracts_preserved: bool,
        /// Deduction reasons, in check order.
        deductions: Vec<String>,
    },

    /// The cascade paused and awaits approval.
    CascadePaused {
        /// The wave after which the pause occurred.
        wave_num: u32,
        /// Why the pause happened.
        reason: PauseReason,
    },
    /// The cascade ran every wave.
    CascadeComplete {
        /// Number of waves executed.
        waves: u32,
        /// Mean confidence across waves.
        overall_confidence: f64,
    },
    /// The cascade was aborted and files were rolled back.
    CascadeAborted {
        /// The abort reason.
        reason: String,
        /// Number of files restored from the pre-cascade snapshot.
        rolled_back_files: u32,
    },

    /// A declared integration was verified present.
    IntegrationCheckPass {
        /// `consumer->target` edge identifier.
        edge_id: String,
        /// The integration kind that was checked.
        kind: IntegrationKind,
    },
    /// A declared integration is missing from source.
    IntegrationCheckFail {
        /// `consumer->target` edge identifier.
        edge_id: String,
        /// The integration kind that was checked.
        kind: IntegrationKind,
        /// What the check expected to find.
        expected: String,
        /// What was actually found.
        actual: String,
    },
    /// A stub (empty body, TODO marker, placeholder) was detected.
    StubDetected {
        /// The artifact owning the file.
        artifact_id: String,
        /// The file containing the stub.
        file: String,
        /// One-based line number.
        line: u32,
        /// What kind of stub was matched.
        stub_kind: String,
    },

    /// An entry was committed to the audit log.
    AuditLogEntry {
        /// The audited action.
        action: String,
        /// The committed entry's chain hash.
        entry_hash: String,
    },

    /// The bus dropped events for a slow consumer (bounded-buffer policy).
    EventsDropped {
        /// How many events were lost for that consumer.
        count: u64,
    },
}

impl CascadeEventKind {
    /// Stable wire name of this event type (the serde tag).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ScanStart { .. } => "scan_start",
            Self::ScanComplete { .. } => "scan_complete",
            Self::CascadePreview { .. } => "cascade_preview",
            Self::ContractCaptured { .. } => "contract_captured",
            Self::WaveStart { .. } => "wave_start",
            Self::WaveGenerated { .. } => "wave_generated",
            Self::WaveScored { .. } => "wave_scored",
            Self::CascadePaused { .. } => "cascade_paused",
            Self::CascadeComplete { .. } => "cascade_complete",
            Self::CascadeAborted { .. } => "cascade_aborted",
            Self::IntegrationCheckPass { .. } => "integration_check_pass",
            Self::IntegrationCheckFail { .. } => "integration_check_fail",
            Self::StubDetected { .. } => "stub_detected",
            Self::AuditLogEntry { .. } => "audit_log_entry",
            Self::EventsDropped { .. } => "events_dropped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let ev = CascadeEvent::now(
            3,
            CascadeEventKind::WaveStart {
                wave_num: 1,
                artifacts: vec!["a".into()],
            },
        );
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "wave_start");
        assert_eq!(json["seq"], 3);
        assert_eq!(json["wave_num"], 1);
    }

    #[test]
    fn type_name_matches_serde_tag() {
        let kinds = [
            CascadeEventKind::ScanStart {
                project_root: "/p".into(),
            },
            CascadeEventKind::CascadeAborted {
                reason: "user".into(),
                rolled_back_files: 1,
            },
            CascadeEventKind::IntegrationCheckPass {
                edge_id: "a->b".into(),
                kind: IntegrationKind::Import,
            },
        ];
        for kind in kinds {
            let json = serde_json::to_value(&kind).unwrap();
            assert_eq!(json["type"], kind.type_name());
        }
    }

    #[test]
    fn pause_reason_round_trips() {
        for reason in [
            PauseReason::Manual,
            PauseReason::LowConfidence,
            PauseReason::Escalation,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            let back: PauseReason = serde_json::from_str(&json).unwrap();
            assert_eq!(back, reason);
        }
    }
}
