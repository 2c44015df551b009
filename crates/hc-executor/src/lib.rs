// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-executor
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The engine's public operations and the wave executor.
//!
//! [`CoreContext`] is the explicit context every operation runs through —
//! graph, configuration, event bus, and audit log — so there is no
//! process-wide state beyond the audit file handle and its signing key.
//! Scans collect analyzer signals, previews plan cascades, and
//! [`CascadeHandle`]s drive wave-by-wave execution with snapshot-backed
//! rollback.

mod executor;
mod history;

pub use executor::CascadeHandle;
pub use history::{HistoryEntry, append_history, read_history};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use hc_agent::Regenerator;
use hc_analyzers::{AnalyzerContext, AnalyzerRegistry, ScanTarget, rank_weaknesses};
use hc_audit::{AuditBackend, AuditLog, AuditQuery, FileBackend, IntegrityReport, SigningKey};
use hc_bus::EventBus;
use hc_config::EngineConfig;
use hc_core::{
    CascadeEventKind, CascadePreview, CoreError, ErrorKind, ExecutionPolicy, ExtractedContract,
    Phase, WeaknessReport,
};
use hc_glob::IgnoreRules;
use hc_graph::ArtifactGraph;
use hc_planner::plan_cascade;
use hc_verify::{IntegrationResult, Toolchain, verify_integration};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Engine state directory under the project root.
pub const STATE_DIR: &str = ".health";
/// Audit log path under the project root.
pub const AUDIT_LOG_PATH: &str = ".health/audit.log";
/// Signing key path under the project root.
pub const AUDIT_KEY_PATH: &str = ".health/audit.key";

/// Report of a whole-graph (or single-artifact) integration check.
#[derive(Debug, Clone)]
pub struct IntegrationReport {
    /// Per-integration outcomes in graph order.
    pub results: Vec<IntegrationResult>,
    /// Whether every declared integration passed.
    pub all_passed: bool,
}

/// The explicit context all public operations run through.
pub struct CoreContext<B: AuditBackend = FileBackend> {
    /// Root of the project under management.
    pub project_root: PathBuf,
    /// The artifact graph.
    pub graph: ArtifactGraph,
    /// Engine configuration.
    pub config: EngineConfig,
    /// The cascade event bus.
    pub bus: EventBus,
    analyzers: AnalyzerRegistry,
    audit: AuditLog<B>,
}

impl CoreContext<FileBackend> {
    /// Open a context with the default file-backed audit log.
    ///
    /// The signing key is read from `.health/audit.key`, created on first
    /// open.
    ///
    /// # Errors
    ///
    /// Returns an audit-phase error when the key or log cannot be set up.
    pub fn open(
        project_root: impl Into<PathBuf>,
        graph: ArtifactGraph,
        config: EngineConfig,
    ) -> Result<Self, CoreError> {
        let project_root = project_root.into();
        let key = load_or_create_key(&project_root)?;
        let backend = FileBackend::new(project_root.join(AUDIT_LOG_PATH))
            .map_err(CoreError::from)?;
        Self::open_with(project_root, graph, config, backend, key)
    }
}

impl<B: AuditBackend> CoreContext<B> {
    /// Open a context over an explicit audit backend and signing key.
    ///
    /// # Errors
    ///
    /// Returns an audit-phase error when existing entries cannot be loaded.
    pub fn open_with(
        project_root: impl Into<PathBuf>,
        graph: ArtifactGraph,
        config: EngineConfig,
        backend: B,
        key: SigningKey,
    ) -> Result<Self, CoreError> {
        let audit = AuditLog::open(backend, key).map_err(CoreError::from)?;
        Ok(Self {
            project_root: project_root.into(),
            graph,
            config,
            bus: EventBus::new(),
            analyzers: AnalyzerRegistry::with_defaults(),
            audit,
        })
    }

    /// Replace the analyzer set (tests and embedders).
    pub fn set_analyzers(&mut self, analyzers: AnalyzerRegistry) {
        self.analyzers = analyzers;
    }

    /// Scan the project for weaknesses.
    ///
    /// Runs every analyzer (concurrently), ranks the signals, appends a
    /// summary line to the weakness history, and audits the pass. Scanning
    /// an empty graph returns an empty report.
    ///
    /// # Errors
    ///
    /// Returns an audit-phase error when the audit append fails; analyzer
    /// trouble degrades to missing signals instead of failing the scan.
    pub async fn scan(&mut self) -> Result<WeaknessReport, CoreError> {
        let root_display = self.project_root.display().to_string();
        self.bus.publish(CascadeEventKind::ScanStart {
            project_root: root_display.clone(),
        });

        let ignore = IgnoreRules::load(&self.project_root, &self.config.ignore_patterns)
            .map_err(|e| {
                CoreError::new(ErrorKind::Internal, Phase::Scan, e.to_string())
            })?;

        let targets: Vec<ScanTarget> = self
            .graph
            .iter()
            .filter_map(|artifact| {
                let file = artifact.produces_file.clone()?;
                if !self.config.is_source_file(&file) {
                    return None;
                }
                if !ignore.decide_str(&file).is_scanned() {
                    return None;
                }
                Some(ScanTarget {
                    artifact_id: artifact.id.clone(),
                    file,
                })
            })
            .collect();

        let mut fan_out = BTreeMap::new();
        let mut depth = BTreeMap::new();
        let mut files = BTreeMap::new();
        for target in &targets {
            let id = &target.artifact_id;
            fan_out.insert(id.clone(), self.graph.fan_out(id).unwrap_or(0));
            depth.insert(id.clone(), self.graph.depth(id).unwrap_or(0));
            files.insert(id.clone(), target.file.clone());
        }

        let ctx = AnalyzerContext {
            project_root: &self.project_root,
            targets: &targets,
            thresholds: &self.config.thresholds,
            fan_out: &fan_out,
            ignore: &ignore,
        };
        let signals = self.analyzers.run_all(&ctx).await;
        let scores = rank_weaknesses(signals, &files, &fan_out, &depth, &self.config);

        let files_scanned = count_source_files(&self.project_root, &self.config, &ignore);
        let report = WeaknessReport::new(root_display, Utc::now(), files_scanned, scores);

        self.bus.publish(CascadeEventKind::ScanComplete {
            files_scanned: report.files_scanned,
            critical_count: report.critical_count,
            high_count: report.high_count,
            medium_count: report.medium_count,
            low_count: report.low_count,
        });

        if let Err(err) = append_history(&self.project_root, &report) {
            warn!(error = %err, "could not append weakness history");
        }

        let outputs = hc_core::canonical_json(&report)
            .map(|j| hc_core::sha256_hex(j.as_bytes()))
            .unwrap_or_default();
        self.audit_append(
            "scanner",
            "scan_complete",
            serde_json::json!({
                "files_scanned": report.files_scanned,
                "critical": report.critical_count,
                "high": report.high_count,
                "medium": report.medium_count,
                "low": report.low_count,
            }),
            String::new(),
            outputs,
        )?;

        info!(
            files = report.files_scanned,
            weaknesses = report.scores.len(),
            "scan complete"
        );
        Ok(report)
    }

    /// Compute a cascade preview for `artifact_id`.
    ///
    /// Contracts are frozen here; the preview is also cached under
    /// `.health/preview-<id>.json`.
    ///
    /// # Errors
    ///
    /// Returns `artifact_not_found` for unknown ids and audit-phase errors
    /// when the audit append fails.
    pub fn preview(&mut self, artifact_id: &str) -> Result<CascadePreview, CoreError> {
        let outcome = plan_cascade(
            &self.graph,
            artifact_id,
            None,
            &self.config.limits,
            &self.project_root,
        )
        .map_err(CoreError::from)?;

        for (id, source) in &outcome.contract_sources {
            self.bus.publish(CascadeEventKind::ContractCaptured {
                artifact_id: id.clone(),
                interface_hash: outcome
                    .preview
                    .contracts
                    .get(id)
                    .map(|c| c.interface_hash.clone()),
                contract_source: source.as_str().to_string(),
            });
        }

        let preview = outcome.preview;
        self.bus.publish(CascadeEventKind::CascadePreview {
            weak_node: preview.weak_node.clone(),
            total_impacted: preview.total_impacted,
            wave_count: preview.wave_count(),
            risk: preview.risk_assessment.clone(),
        });

        if let Err(err) = cache_preview(&self.project_root, &preview) {
            warn!(error = %err, "could not cache preview");
        }

        let inputs = hc_core::sha256_hex(artifact_id.as_bytes());
        let outputs = hc_core::canonical_json(&preview)
            .map(|j| hc_core::sha256_hex(j.as_bytes()))
            .unwrap_or_default();
        self.audit_append(
            "planner",
            "cascade_preview",
            serde_json::json!({
                "weak_node": preview.weak_node,
                "total_impacted": preview.total_impacted,
                "wave_count": preview.wave_count(),
                "risk": preview.risk_assessment,
            }),
            inputs,
            outputs,
        )?;

        Ok(preview)
    }

    /// Begin a cascade over `preview`.
    ///
    /// Validates the policy, refuses oversized cascades, snapshots every
    /// file in the blast radius, and persists the snapshot under
    /// `.health/snapshots/<cascade-id>/`.
    ///
    /// # Errors
    ///
    /// - `invalid_policy` for a malformed policy.
    /// - `cascade_too_large` when the preview carries the size flag.
    /// - execute-phase errors when the snapshot cannot be captured.
    pub fn start_cascade(
        &mut self,
        preview: CascadePreview,
        policy: ExecutionPolicy,
        regenerator: Arc<dyn Regenerator>,
        toolchain: Toolchain,
    ) -> Result<CascadeHandle, CoreError> {
        validate_policy(&policy)?;
        if preview.cascade_too_large {
            return Err(CoreError::new(
                ErrorKind::CascadeTooLarge,
                Phase::Plan,
                format!(
                    "cascade of {} artifacts exceeds the configured limit",
                    preview.total_impacted
                ),
            )
            .with_context("artifact_id", preview.weak_node.clone()));
        }
        executor::start(self, preview, policy, regenerator, toolchain)
    }

    /// Extract the current contract of one artifact.
    ///
    /// # Errors
    ///
    /// - `artifact_not_found` for unknown ids.
    /// - `contract_extraction_failed` for virtual or unparseable files.
    pub fn extract_contract(&self, artifact_id: &str) -> Result<ExtractedContract, CoreError> {
        let artifact = self.graph.get(artifact_id).map_err(CoreError::from)?;
        let Some(file) = &artifact.produces_file else {
            return Err(CoreError::new(
                ErrorKind::ContractExtractionFailed,
                Phase::Plan,
                format!("artifact {artifact_id} is virtual"),
            )
            .with_context("artifact_id", artifact_id.to_string()));
        };
        hc_contract::extract_contract(artifact_id, &self.project_root.join(file))
            .map_err(CoreError::from)
    }

    /// Verify declared integrations for one artifact, or the whole graph.
    ///
    /// Emits `integration_check_pass` / `integration_check_fail` and
    /// `stub_detected` events, and audits the run.
    ///
    /// # Errors
    ///
    /// Returns `artifact_not_found` for an unknown explicit id, or an
    /// audit-phase error when the append fails.
    pub fn verify_integrations(
        &mut self,
        artifact_id: Option<&str>,
    ) -> Result<IntegrationReport, CoreError> {
        let ids: Vec<String> = match artifact_id {
            Some(id) => {
                self.graph.get(id).map_err(CoreError::from)?;
                vec![id.to_string()]
            }
            None => self.graph.artifact_ids(),
        };

        let mut results = Vec::new();
        for id in &ids {
            let artifact = self.graph.get(id).map_err(CoreError::from)?.clone();
            for integration in &artifact.integrations {
                let result = verify_integration(&self.project_root, &artifact, integration);
                if result.passed {
                    self.bus.publish(CascadeEventKind::IntegrationCheckPass {
                        edge_id: result.edge_id.clone(),
                        kind: result.kind,
                    });
                } else {
                    self.bus.publish(CascadeEventKind::IntegrationCheckFail {
                        edge_id: result.edge_id.clone(),
                        kind: result.kind,
                        expected: result.expected.clone(),
                        actual: result.actual.clone(),
                    });
                }
                results.push(result);
            }

            if let Some(file) = &artifact.produces_file
                && let Ok(source) = std::fs::read_to_string(self.project_root.join(file))
            {
                for stub in hc_verify::detect_stubs(&source) {
                    self.bus.publish(CascadeEventKind::StubDetected {
                        artifact_id: id.clone(),
                        file: file.clone(),
                        line: stub.line,
                        stub_kind: stub.kind.as_str().to_string(),
                    });
                }
            }
        }

        let all_passed = results.iter().all(|r| r.passed);
        self.audit_append(
            "verifier",
            "integrations_verified",
            serde_json::json!({
                "artifacts": ids,
                "checks": results.len(),
                "all_passed": all_passed,
            }),
            String::new(),
            String::new(),
        )?;

        Ok(IntegrationReport {
            results,
            all_passed,
        })
    }

    /// Export audit entries as JSONL bytes.
    ///
    /// # Errors
    ///
    /// Returns an audit-phase error when the log cannot be read.
    pub fn export_audit(&self, query: &AuditQuery) -> Result<Vec<u8>, CoreError> {
        self.audit.export(query).map_err(CoreError::from)
    }

    /// Re-walk the audit chain, checking every hash and signature.
    ///
    /// # Errors
    ///
    /// Returns an audit-phase error when the log cannot be read; a broken
    /// chain is a report, not an error.
    pub fn verify_audit(&self) -> Result<IntegrityReport, CoreError> {
        self.audit.verify_integrity().map_err(CoreError::from)
    }

    /// Append an audit entry, mirroring it onto the event bus.
    pub(crate) fn audit_append(
        &mut self,
        actor: &str,
        action: &str,
        details: serde_json::Value,
        inputs_hash: String,
        outputs_hash: String,
    ) -> Result<(), CoreError> {
        let entry = self
            .audit
            .append(actor, action, details, inputs_hash, outputs_hash)
            .map_err(CoreError::from)?;
        self.bus.publish(CascadeEventKind::AuditLogEntry {
            action: entry.action.clone(),
            entry_hash: entry.entry_hash.clone(),
        });
        Ok(())
    }
}

/// Policy validation for [`CoreContext::start_cascade`].
fn validate_policy(policy: &ExecutionPolicy) -> Result<(), CoreError> {
    if !(0.0..=1.0).contains(&policy.confidence_threshold) {
        return Err(CoreError::new(
            ErrorKind::InvalidPolicy,
            Phase::Plan,
            format!(
                "confidence_threshold must be in [0, 1], got {}",
                policy.confidence_threshold
            ),
        ));
    }
    if policy.max_consecutive_low_confidence == 0 {
        return Err(CoreError::new(
            ErrorKind::InvalidPolicy,
            Phase::Plan,
            "max_consecutive_low_confidence must be at least 1",
        ));
    }
    Ok(())
}

/// Count analyzable source files under the project root.
fn count_source_files(root: &Path, config: &EngineConfig, ignore: &IgnoreRules) -> u32 {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.file_name() != std::ffi::OsStr::new(".git")
                && e.file_name() != std::ffi::OsStr::new(STATE_DIR)
        })
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap_or(e.path())
                .to_string_lossy()
                .into_owned();
            config.is_source_file(&rel) && ignore.decide_str(&rel).is_scanned()
        })
        .count() as u32
}

/// Load the signing key, creating a fresh one on first use.
fn load_or_create_key(project_root: &Path) -> Result<SigningKey, CoreError> {
    let key_path = project_root.join(AUDIT_KEY_PATH);
    if key_path.exists() {
        let bytes = std::fs::read(&key_path).map_err(|e| {
            CoreError::new(
                ErrorKind::AuditAppendFailed,
                Phase::Audit,
                format!("read signing key: {e}"),
            )
        })?;
        return Ok(SigningKey::new(bytes));
    }

    let fresh: Vec<u8> = uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .chain(uuid::Uuid::new_v4().as_bytes())
        .copied()
        .collect();
    if let Some(parent) = key_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CoreError::new(
                ErrorKind::AuditAppendFailed,
                Phase::Audit,
                format!("create state dir: {e}"),
            )
        })?;
    }
    std::fs::write(&key_path, &fresh).map_err(|e| {
        CoreError::new(
            ErrorKind::AuditAppendFailed,
            Phase::Audit,
            format!("write signing key: {e}"),
        )
    })?;
    Ok(SigningKey::new(fresh))
}

/// Cache a preview under `.health/preview-<id>.json`.
fn cache_preview(project_root: &Path, preview: &CascadePreview) -> anyhow::Result<()> {
    let sanitized: String = preview
        .weak_node
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let dir = project_root.join(STATE_DIR);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("preview-{sanitized}.json"));
    std::fs::write(path, serde_json::to_string_pretty(preview)?)?;
    Ok(())
}
