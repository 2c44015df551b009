// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-audit
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Tamper-evident audit log.
//!
//! Every mutation decision, approval, violation, and wave outcome becomes
//! one [`AuditEntry`]: hash-chained to its predecessor and HMAC-signed with
//! the key configured at log open. The chain makes silent truncation or
//! reordering detectable; the signature makes a full re-chain by an
//! attacker without the key detectable too.
//!
//! Appends are durable before the next event is accepted. Backends are a
//! capability set (`append` / `query`) selected by configuration; the
//! default is an append-only file written with temp-file + atomic-rename
//! discipline.

mod backend;

pub use backend::{AuditBackend, FileBackend, MemoryBackend};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use hc_core::{CoreError, ErrorKind, Phase};

type HmacSha256 = Hmac<Sha256>;

/// Errors from audit log operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The entry could not be durably written. Fatal for the engine: work
    /// must not proceed without its audit trail.
    #[error("audit append failed: {reason}")]
    AppendFailed {
        /// What went wrong.
        reason: String,
    },

    /// The backing store could not be read.
    #[error("audit read failed: {reason}")]
    ReadFailed {
        /// What went wrong.
        reason: String,
    },

    /// An entry could not be serialized canonically.
    #[error("audit entry serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<AuditError> for CoreError {
    fn from(err: AuditError) -> Self {
        let kind = match &err {
            AuditError::AppendFailed { .. } => ErrorKind::AuditAppendFailed,
            AuditError::ReadFailed { .. } | AuditError::Serialize(_) => {
                ErrorKind::AuditAppendFailed
            }
        };
        CoreError::new(kind, Phase::Audit, err.to_string())
    }
}

/// One hash-chained, signed record of a mutation or decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the entry was sealed.
    pub timestamp: DateTime<Utc>,
    /// Who acted (engine component, user, regenerator id).
    pub actor_id: String,
    /// The audited action (e.g. `"wave_scored"`, `"cascade_aborted"`).
    pub action: String,
    /// Action-specific payload.
    pub details: serde_json::Value,
    /// SHA-256 over the action's inputs.
    pub inputs_hash: String,
    /// SHA-256 over the action's outputs.
    pub outputs_hash: String,
    /// The previous entry's `entry_hash`; empty for the first entry.
    pub previous_hash: String,
    /// SHA-256 over the canonical serialization including `previous_hash`.
    pub entry_hash: String,
    /// HMAC-SHA256 over `entry_hash`, keyed at log open.
    pub signature: String,
}

impl AuditEntry {
    /// Canonical JSON with `entry_hash` and `signature` nulled, so the
    /// stored hash never feeds its own input.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Serialize`] when the payload cannot serialize.
    pub fn canonical_form(&self) -> Result<String, AuditError> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("entry_hash".to_string(), serde_json::Value::Null);
            map.insert("signature".to_string(), serde_json::Value::Null);
        }
        Ok(serde_json::to_string(&value)?)
    }

    /// Recompute this entry's hash from its canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Serialize`] when the payload cannot serialize.
    pub fn compute_hash(&self) -> Result<String, AuditError> {
        Ok(hc_core::sha256_hex(self.canonical_form()?.as_bytes()))
    }
}

/// The HMAC signing key configured at log open.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Wrap raw key bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Sign an entry hash, returning lowercase hex.
    #[must_use]
    pub fn sign(&self, entry_hash: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.0).expect("HMAC accepts any key length");
        mac.update(entry_hash.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-shape verification of a stored signature.
    #[must_use]
    pub fn verify(&self, entry_hash: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let mut mac =
            HmacSha256::new_from_slice(&self.0).expect("HMAC accepts any key length");
        mac.update(entry_hash.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("SigningKey").finish_non_exhaustive()
    }
}

/// Filter for [`AuditLog::query`].
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Only entries with this action.
    pub action: Option<String>,
    /// Zero-based start offset (inclusive).
    pub from: Option<usize>,
    /// Zero-based end offset (exclusive).
    pub to: Option<usize>,
}

/// Result of walking the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityReport {
    /// Every link and signature checked out.
    Valid {
        /// Number of entries verified.
        verified: u64,
    },
    /// The chain is broken.
    Broken {
        /// Index of the first bad entry.
        first_broken: u64,
        /// What failed at that index.
        reason: BreakReason,
    },
}

/// Why an entry failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakReason {
    /// `previous_hash` does not match the prior entry's `entry_hash`.
    ChainLink,
    /// The stored `entry_hash` does not match the recomputed hash.
    EntryHash,
    /// The HMAC signature does not verify under the configured key.
    Signature,
}

/// The audit log: a signing key plus a pluggable backend.
///
/// The log is the single writer for its backend; concurrent cascades must
/// serialize their appends through one log value.
pub struct AuditLog<B: AuditBackend> {
    backend: B,
    key: SigningKey,
    last_hash: String,
    entry_count: usize,
}

impl<B: AuditBackend + std::fmt::Debug> std::fmt::Debug for AuditLog<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("backend", &self.backend)
            .field("key", &"<redacted>")
            .field("last_hash", &self.last_hash)
            .field("entry_count", &self.entry_count)
            .finish()
    }
}

impl<B: AuditBackend> AuditLog<B> {
    /// Open a log over `backend`, resuming the chain from the last stored
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ReadFailed`] when existing entries cannot be
    /// loaded.
    pub fn open(backend: B, key: SigningKey) -> Result<Self, AuditError> {
        let existing = backend.query(&AuditQuery::default())?;
        let last_hash = existing.last().map(|e| e.entry_hash.clone()).unwrap_or_default();
        Ok(Self {
            backend,
            key,
            last_hash,
            entry_count: existing.len(),
        })
    }

    /// Seal and durably append one entry.
    ///
    /// The entry is chained to its predecessor, hashed, and signed before
    /// the backend write; the write must complete before the engine accepts
    /// the next event.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::AppendFailed`] when the backend write fails —
    /// a fatal condition for the caller.
    pub fn append(
        &mut self,
        actor_id: impl Into<String>,
        action: impl Into<String>,
        details: serde_json::Value,
        inputs_hash: impl Into<String>,
        outputs_hash: impl Into<String>,
    ) -> Result<AuditEntry, AuditError> {
        let mut entry = AuditEntry {
            timestamp: Utc::now(),
            actor_id: actor_id.into(),
            action: action.into(),
            details,
            inputs_hash: inputs_hash.into(),
            outputs_hash: outputs_hash.into(),
            previous_hash: self.last_hash.clone(),
            entry_hash: String::new(),
            signature: String::new(),
        };
        entry.entry_hash = entry.compute_hash()?;
        entry.signature = self.key.sign(&entry.entry_hash);

        self.backend.append(&entry)?;
        self.last_hash = entry.entry_hash.clone();
        self.entry_count += 1;
        Ok(entry)
    }

    /// Entries matching `query`, in chain order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ReadFailed`] when the backend cannot be read.
    pub fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        self.backend.query(query)
    }

    /// Number of entries appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entry_count
    }

    /// `true` when no entries exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Re-walk the whole chain, rechecking every link, hash, and
    /// signature.
    ///
    /// Returns the first broken offset, or the count of verified entries.
    /// The signature check is what catches an attacker who re-hashed the
    /// chain to cover an edit.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ReadFailed`] when the backend cannot be read.
    pub fn verify_integrity(&self) -> Result<IntegrityReport, AuditError> {
        let entries = self.backend.query(&AuditQuery::default())?;
        verify_entries(&entries, &self.key)
    }

    /// Export entries in `query` range as JSONL bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ReadFailed`] or [`AuditError::Serialize`].
    pub fn export(&self, query: &AuditQuery) -> Result<Vec<u8>, AuditError> {
        let mut out = Vec::new();
        for entry in self.backend.query(query)? {
            out.extend_from_slice(serde_json::to_string(&entry)?.as_bytes());
            out.push(b'\n');
        }
        Ok(out)
    }
}

/// Chain verification over a loaded entry slice.
///
/// # Errors
///
/// Returns [`AuditError::Serialize`] only when an entry cannot be
/// re-serialized for hashing (treated as broken at that offset instead).
pub fn verify_entries(
    entries: &[AuditEntry],
    key: &SigningKey,
) -> Result<IntegrityReport, AuditError> {
    let mut previous_hash = String::new();
    for (index, entry) in entries.iter().enumerate() {
        if entry.previous_hash != previous_hash {
            return Ok(IntegrityReport::Broken {
                first_broken: index as u64,
                reason: BreakReason::ChainLink,
            });
        }
        let recomputed = match entry.compute_hash() {
            Ok(hash) => hash,
            Err(_) => {
                return Ok(IntegrityReport::Broken {
                    first_broken: index as u64,
                    reason: BreakReason::EntryHash,
                });
            }
        };
        if recomputed != entry.entry_hash {
            return Ok(IntegrityReport::Broken {
                first_broken: index as u64,
                reason: BreakReason::EntryHash,
            });
        }
        if !key.verify(&entry.entry_hash, &entry.signature) {
            return Ok(IntegrityReport::Broken {
                first_broken: index as u64,
                reason: BreakReason::Signature,
            });
        }
        previous_hash = entry.entry_hash.clone();
    }
    Ok(IntegrityReport::Valid {
        verified: entries.len() as u64,
    })
}

#[cfg(test)]
mod tests;
