// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-workspace
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Byte-for-byte snapshots of the files a cascade may touch.
//!
//! Before wave 0 the executor captures every file in the blast radius; an
//! abort restores them exactly. Snapshots also persist under
//! `.health/snapshots/<cascade-id>/` so an operator can recover manually if
//! the process dies mid-cascade, and successful completion removes the
//! staging directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Captured state of one file at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// The full file bytes.
    pub content: Vec<u8>,
    /// Hex SHA-256 of the content.
    pub sha256: String,
}

/// Point-in-time capture of the files a cascade may touch.
///
/// A file that did not exist at capture time is recorded as `None`, so a
/// rollback deletes anything the cascade created.
#[derive(Debug, Clone)]
pub struct CascadeSnapshot {
    /// Project root the relative paths resolve against.
    pub root: PathBuf,
    /// Captured files keyed by project-relative path.
    pub files: BTreeMap<String, Option<FileSnapshot>>,
    /// When the capture happened.
    pub created_at: DateTime<Utc>,
}

impl CascadeSnapshot {
    /// Capture the listed files under `root`.
    ///
    /// # Errors
    ///
    /// Fails when an existing file cannot be read.
    pub fn capture<I, S>(root: &Path, paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut files = BTreeMap::new();
        for path in paths {
            let rel = path.into();
            let abs = root.join(&rel);
            let entry = if abs.exists() {
                let content =
                    fs::read(&abs).with_context(|| format!("read {}", abs.display()))?;
                Some(FileSnapshot {
                    sha256: sha256_hex(&content),
                    content,
                })
            } else {
                None
            };
            files.insert(rel, entry);
        }
        Ok(Self {
            root: root.to_path_buf(),
            files,
            created_at: Utc::now(),
        })
    }

    /// Restore every captured file to its snapshot state.
    ///
    /// Files whose current bytes already match are left alone; files the
    /// cascade created are deleted. Returns the number of paths that
    /// actually changed.
    ///
    /// # Errors
    ///
    /// Fails when a file cannot be written or removed.
    pub fn restore(&self) -> Result<u32> {
        let mut rolled_back = 0;
        for (rel, entry) in &self.files {
            let abs = self.root.join(rel);
            match entry {
                Some(snapshot) => {
                    let current = fs::read(&abs).ok();
                    if current.as_deref() != Some(snapshot.content.as_slice()) {
                        if let Some(parent) = abs.parent() {
                            fs::create_dir_all(parent)
                                .with_context(|| format!("create {}", parent.display()))?;
                        }
                        fs::write(&abs, &snapshot.content)
                            .with_context(|| format!("restore {}", abs.display()))?;
                        rolled_back += 1;
                    }
                }
                None => {
                    if abs.exists() {
                        fs::remove_file(&abs)
                            .with_context(|| format!("remove {}", abs.display()))?;
                        rolled_back += 1;
                    }
                }
            }
        }
        Ok(rolled_back)
    }

    /// Compare the snapshot against the current tree.
    #[must_use]
    pub fn diff_against_tree(&self) -> SnapshotDiff {
        let mut diff = SnapshotDiff::default();
        for (rel, entry) in &self.files {
            let abs = self.root.join(rel);
            let current = fs::read(&abs).ok();
            match (entry, current) {
                (Some(snapshot), Some(bytes)) => {
                    if sha256_hex(&bytes) == snapshot.sha256 {
                        diff.unchanged.push(rel.clone());
                    } else {
                        diff.modified.push(rel.clone());
                    }
                }
                (Some(_), None) => diff.removed.push(rel.clone()),
                (None, Some(_)) => diff.added.push(rel.clone()),
                (None, None) => diff.unchanged.push(rel.clone()),
            }
        }
        diff
    }

    /// Persist the snapshot under `staging_dir` (one file per captured
    /// path, original bytes).
    ///
    /// # Errors
    ///
    /// Fails when the staging tree cannot be written.
    pub fn persist(&self, staging_dir: &Path) -> Result<()> {
        for (rel, entry) in &self.files {
            let Some(snapshot) = entry else { continue };
            let dest = staging_dir.join(rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            fs::write(&dest, &snapshot.content)
                .with_context(|| format!("stage {}", dest.display()))?;
        }
        Ok(())
    }

    /// Remove a persisted staging directory, tolerating its absence.
    ///
    /// # Errors
    ///
    /// Fails only when the directory exists but cannot be removed.
    pub fn discard_staging(staging_dir: &Path) -> Result<()> {
        if staging_dir.exists() {
            fs::remove_dir_all(staging_dir)
                .with_context(|| format!("discard {}", staging_dir.display()))?;
        }
        Ok(())
    }

    /// Number of captured paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// `true` when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The captured hash for `path`, when the file existed.
    #[must_use]
    pub fn sha256_of(&self, path: &str) -> Option<&str> {
        self.files
            .get(path)
            .and_then(|e| e.as_ref())
            .map(|s| s.sha256.as_str())
    }
}

/// Paths grouped by how the current tree differs from a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Files created since the snapshot.
    pub added: Vec<String>,
    /// Files deleted since the snapshot.
    pub removed: Vec<String>,
    /// Files whose bytes changed.
    pub modified: Vec<String>,
    /// Files untouched since the snapshot.
    pub unchanged: Vec<String>,
}

impl SnapshotDiff {
    /// Total number of changed paths.
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
