// SPDX-License-Identifier: MIT OR Apache-2.0
//! Weakness-history persistence for trend reporting.
//!
//! One summary line per scan, append-only, under
//! `.health/weakness-history.jsonl`.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hc_core::WeaknessReport;
use serde::{Deserialize, Serialize};

/// History file path under the project root.
pub const HISTORY_PATH: &str = ".health/weakness-history.jsonl";

/// One scan's summary in the history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the scan ran.
    pub scan_time: DateTime<Utc>,
    /// Number of analyzable files visited.
    pub files_scanned: u32,
    /// Number of scored weaknesses.
    pub weaknesses: u32,
    /// Critical-risk count.
    pub critical: u32,
    /// High-risk count.
    pub high: u32,
    /// Medium-risk count.
    pub medium: u32,
    /// Low-risk count.
    pub low: u32,
}

impl From<&WeaknessReport> for HistoryEntry {
    fn from(report: &WeaknessReport) -> Self {
        Self {
            scan_time: report.scan_time,
            files_scanned: report.files_scanned,
            weaknesses: report.scores.len() as u32,
            critical: report.critical_count,
            high: report.high_count,
            medium: report.medium_count,
            low: report.low_count,
        }
    }
}

/// Append one scan summary to the history file.
///
/// # Errors
///
/// Fails when the state directory or file cannot be written.
pub fn append_history(project_root: &Path, report: &WeaknessReport) -> Result<()> {
    let path = project_root.join(HISTORY_PATH);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    let line = serde_json::to_string(&HistoryEntry::from(report))?;
    writeln!(file, "{line}").with_context(|| format!("append {}", path.display()))?;
    Ok(())
}

/// Read the full scan history, oldest first.
///
/// A missing file is an empty history; malformed lines are skipped.
///
/// # Errors
///
/// Fails when an existing file cannot be read.
pub fn read_history(project_root: &Path) -> Result<Vec<HistoryEntry>> {
    let path = project_root.join(HISTORY_PATH);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
