// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pluggable audit storage backends.
//!
//! A backend is the capability set `{append, query}`; verification and
//! signing live in [`crate::AuditLog`]. The file backend is the default;
//! higher-assurance stores (object-lock, WORM) implement the same trait.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{AuditEntry, AuditError, AuditQuery};

/// Storage capability set for audit entries.
pub trait AuditBackend: Send {
    /// Durably append one sealed entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::AppendFailed`] when the write cannot be made
    /// durable.
    fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Entries matching `query`, in chain order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ReadFailed`] when the store cannot be read.
    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError>;
}

/// Apply an [`AuditQuery`] to a full entry list.
fn apply_query(entries: Vec<AuditEntry>, query: &AuditQuery) -> Vec<AuditEntry> {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(entries.len()).min(entries.len());
    if from >= to {
        return Vec::new();
    }
    entries[from..to]
        .iter()
        .filter(|e| query.action.as_deref().is_none_or(|a| e.action == a))
        .cloned()
        .collect()
}

/// Append-only JSONL file backend with temp-file + atomic-rename appends.
///
/// Each append rewrites the log through a temp file in the same directory
/// and renames it into place, so a crash never leaves a half-written line
/// behind.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Create a backend writing to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::AppendFailed`] when the parent directory
    /// cannot be created.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| AuditError::AppendFailed {
                reason: format!("create {}: {e}", parent.display()),
            })?;
        }
        Ok(Self { path })
    }

    /// The log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<AuditEntry>, AuditError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| AuditError::ReadFailed {
            reason: format!("read {}: {e}", self.path.display()),
        })?;
        let mut entries = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry =
                serde_json::from_str(line).map_err(|e| AuditError::ReadFailed {
                    reason: format!("parse {} line {}: {e}", self.path.display(), number + 1),
                })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl AuditBackend for FileBackend {
    fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError> {
        let line = serde_json::to_string(entry)?;
        let existing = if self.path.exists() {
            fs::read(&self.path).map_err(|e| AuditError::AppendFailed {
                reason: format!("read {}: {e}", self.path.display()),
            })?
        } else {
            Vec::new()
        };

        let tmp_path = self.path.with_extension("log.tmp");
        let write_result = (|| -> std::io::Result<()> {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(&existing)?;
            tmp.write_all(line.as_bytes())?;
            tmp.write_all(b"\n")?;
            tmp.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        })();

        write_result.map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            AuditError::AppendFailed {
                reason: format!("write {}: {e}", self.path.display()),
            }
        })
    }

    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(apply_query(self.read_all()?, query))
    }
}

/// In-memory backend for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Vec<AuditEntry>,
}

impl MemoryBackend {
    /// An empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct mutable access, for tamper tests.
    pub fn entries_mut(&mut self) -> &mut Vec<AuditEntry> {
        &mut self.entries
    }
}

impl AuditBackend for MemoryBackend {
    fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries.push(entry.clone());
        Ok(())
    }

    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(apply_query(self.entries.clone(), query))
    }
}
