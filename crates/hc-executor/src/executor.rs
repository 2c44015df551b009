// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wave-by-wave cascade execution.
//!
//! One driver owns a [`CascadeHandle`] for the cascade's lifetime. Within a
//! wave, artifact regenerations dispatch concurrently and rejoin before the
//! verifier runs; the only externally observable orderings are wave
//! boundaries. Agent failures are per-artifact results, never exceptions —
//! the wave loop does not throw.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hc_agent::{RegenerationMode, RegenerationSpec, Regenerator};
use hc_audit::AuditBackend;
use hc_core::{
    CascadeEventKind, CascadeExecution, CascadePreview, CoreError, ErrorKind, ExecutionPolicy,
    Phase,
};
use hc_verify::{Toolchain, TouchedArtifact, verify_wave};
use hc_workspace::CascadeSnapshot;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::CoreContext;

/// A live cascade: execution state plus the scoped resources backing it.
///
/// The handle owns the rollback snapshot and its staging directory; both
/// are released on every exit path — completion, abort, or the handle
/// simply being dropped after reaching a terminal state.
pub struct CascadeHandle {
    /// Unique cascade identifier (names the staging directory).
    pub cascade_id: String,
    /// The value-level execution state machine.
    pub execution: CascadeExecution,
    pub(crate) snapshot: CascadeSnapshot,
    pub(crate) staging_dir: PathBuf,
    pub(crate) regenerator: Arc<dyn Regenerator>,
    pub(crate) toolchain: Toolchain,
    pub(crate) wave_timeout: Option<Duration>,
    pub(crate) staging_released: bool,
}

impl std::fmt::Debug for CascadeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeHandle")
            .field("cascade_id", &self.cascade_id)
            .field("execution", &self.execution)
            .field("snapshot", &self.snapshot)
            .field("staging_dir", &self.staging_dir)
            .field("toolchain", &self.toolchain)
            .field("wave_timeout", &self.wave_timeout)
            .field("staging_released", &self.staging_released)
            .finish()
    }
}

impl CascadeHandle {
    /// Set a whole-wave timeout; exceeding it aborts the cascade with
    /// reason `"timeout"`.
    pub fn set_wave_timeout(&mut self, timeout: Duration) {
        self.wave_timeout = Some(timeout);
    }

    /// Replace the verifier toolchain for subsequent waves.
    pub fn set_toolchain(&mut self, toolchain: Toolchain) {
        self.toolchain = toolchain;
    }

    fn release_staging(&mut self) {
        if !self.staging_released {
            if let Err(err) = CascadeSnapshot::discard_staging(&self.staging_dir) {
                warn!(error = %err, "could not remove snapshot staging directory");
            }
            self.staging_released = true;
        }
    }
}

impl Drop for CascadeHandle {
    fn drop(&mut self) {
        // Terminal cascades never need their staging again; a live handle
        // being dropped mid-flight keeps it for manual recovery.
        if self.execution.is_terminal() {
            self.release_staging();
        }
    }
}

/// Capture the snapshot and build a handle (called by
/// [`CoreContext::start_cascade`] after policy validation).
pub(crate) fn start<B: AuditBackend>(
    ctx: &mut CoreContext<B>,
    preview: CascadePreview,
    policy: ExecutionPolicy,
    regenerator: Arc<dyn Regenerator>,
    toolchain: Toolchain,
) -> Result<CascadeHandle, CoreError> {
    let cascade_id = Uuid::new_v4().to_string();

    let files: Vec<String> = preview
        .impacted_ids()
        .iter()
        .filter_map(|id| ctx.graph.get(id).ok().and_then(|a| a.produces_file.clone()))
        .collect();

    let snapshot = CascadeSnapshot::capture(&ctx.project_root, files).map_err(|e| {
        CoreError::new(ErrorKind::Internal, Phase::Execute, format!("snapshot failed: {e}"))
            .with_context("artifact_id", preview.weak_node.clone())
    })?;

    let staging_dir = ctx
        .project_root
        .join(crate::STATE_DIR)
        .join("snapshots")
        .join(&cascade_id);
    if let Err(err) = snapshot.persist(&staging_dir) {
        warn!(error = %err, "could not persist snapshot staging");
    }

    ctx.audit_append(
        "executor",
        "cascade_started",
        serde_json::json!({
            "cascade_id": cascade_id,
            "weak_node": preview.weak_node,
            "total_impacted": preview.total_impacted,
            "snapshot_files": snapshot.len(),
        }),
        hc_core::sha256_hex(preview.weak_node.as_bytes()),
        String::new(),
    )?;

    info!(cascade_id = %cascade_id, weak_node = %preview.weak_node, "cascade started");
    Ok(CascadeHandle {
        cascade_id,
        execution: CascadeExecution::new(preview, policy),
        snapshot,
        staging_dir,
        regenerator,
        toolchain,
        wave_timeout: None,
        staging_released: false,
    })
}

impl<B: AuditBackend> CoreContext<B> {
    /// Run waves until the next pause, completion, or abort.
    ///
    /// Safe to call again on a paused execution once
    /// [`approve_wave`](Self::approve_wave) clears the pause: execution
    /// resumes with the next wave.
    ///
    /// # Errors
    ///
    /// Returns audit-phase errors when an append fails (fatal); agent and
    /// tool failures are absorbed into wave results instead.
    pub async fn advance_cascade(
        &mut self,
        handle: &mut CascadeHandle,
    ) -> Result<CascadeExecution, CoreError> {
        while !handle.execution.is_terminal() && !handle.execution.paused_for_approval {
            let wave_num = handle.execution.current_wave;
            match handle.wave_timeout {
                Some(timeout) => {
                    let ran =
                        tokio::time::timeout(timeout, self.run_wave(handle, wave_num)).await;
                    match ran {
                        Ok(result) => result?,
                        Err(_) => {
                            warn!(wave_num, "wave timed out, aborting cascade");
                            self.abort_cascade(handle, "timeout")?;
                            break;
                        }
                    }
                }
                None => self.run_wave(handle, wave_num).await?,
            }
        }

        if handle.execution.completed && !handle.staging_released {
            self.finish_cascade(handle)?;
        }
        Ok(handle.execution.clone())
    }

    /// Clear a pause so the next [`advance_cascade`](Self::advance_cascade)
    /// continues.
    ///
    /// # Errors
    ///
    /// Returns an audit-phase error when the approval cannot be recorded.
    pub fn approve_wave(&mut self, handle: &mut CascadeHandle) -> Result<(), CoreError> {
        if handle.execution.aborted {
            return Err(CoreError::new(
                ErrorKind::Aborted,
                Phase::Execute,
                "cascade already aborted",
            ));
        }
        handle.execution.approve_wave();
        self.audit_append(
            "user",
            "wave_approved",
            serde_json::json!({
                "cascade_id": handle.cascade_id,
                "next_wave": handle.execution.current_wave,
            }),
            String::new(),
            String::new(),
        )
    }

    /// Abort the cascade and roll every touched file back to its
    /// pre-cascade snapshot.
    ///
    /// Idempotent: a second abort changes nothing and returns zero.
    ///
    /// # Errors
    ///
    /// Returns an execute-phase error when the rollback itself fails, or an
    /// audit-phase error when the abort cannot be recorded.
    pub fn abort_cascade(
        &mut self,
        handle: &mut CascadeHandle,
        reason: &str,
    ) -> Result<u32, CoreError> {
        if handle.execution.aborted {
            return Ok(0);
        }
        handle.execution.abort(reason);

        let rolled_back = handle.snapshot.restore().map_err(|e| {
            CoreError::new(
                ErrorKind::Internal,
                Phase::Execute,
                format!("rollback failed: {e}"),
            )
            .with_context("cascade_id", handle.cascade_id.clone())
        })?;

        self.bus.publish(CascadeEventKind::CascadeAborted {
            reason: reason.to_string(),
            rolled_back_files: rolled_back,
        });
        self.audit_append(
            "executor",
            "cascade_aborted",
            serde_json::json!({
                "cascade_id": handle.cascade_id,
                "reason": reason,
                "rolled_back_files": rolled_back,
            }),
            String::new(),
            String::new(),
        )?;

        handle.release_staging();
        info!(cascade_id = %handle.cascade_id, reason, rolled_back, "cascade aborted");
        Ok(rolled_back)
    }

    /// Seal a completed cascade: events, audit, staging cleanup.
    fn finish_cascade(&mut self, handle: &mut CascadeHandle) -> Result<(), CoreError> {
        let diff = handle.snapshot.diff_against_tree();
        let overall = handle.execution.overall_confidence();

        self.bus.publish(CascadeEventKind::CascadeComplete {
            waves: handle.execution.preview.wave_count(),
            overall_confidence: overall,
        });
        self.audit_append(
            "executor",
            "cascade_complete",
            serde_json::json!({
                "cascade_id": handle.cascade_id,
                "waves": handle.execution.preview.wave_count(),
                "overall_confidence": overall,
                "files_modified": diff.modified,
                "files_added": diff.added,
            }),
            String::new(),
            String::new(),
        )?;

        handle.release_staging();
        info!(cascade_id = %handle.cascade_id, overall, "cascade complete");
        Ok(())
    }

    /// Execute one wave: regenerate members concurrently, verify, record.
    #[instrument(skip(self, handle), fields(cascade_id = %handle.cascade_id))]
    async fn run_wave(
        &mut self,
        handle: &mut CascadeHandle,
        wave_num: u32,
    ) -> Result<(), CoreError> {
        let members = handle
            .execution
            .preview
            .waves
            .get(wave_num as usize)
            .cloned()
            .unwrap_or_default();

        self.bus.publish(CascadeEventKind::WaveStart {
            wave_num,
            artifacts: members.clone(),
        });

        let mode = if wave_num == 0 {
            RegenerationMode::Regenerate
        } else {
            RegenerationMode::Update
        };

        // Pull everything we need out of the graph before going async.
        let jobs: Vec<(String, Option<String>, Option<String>)> = members
            .iter()
            .map(|id| {
                let artifact = self.graph.get(id).ok();
                (
                    id.clone(),
                    artifact.and_then(|a| a.produces_file.clone()),
                    artifact.and_then(|a| a.contract_declared.clone()),
                )
            })
            .collect();

        let project_root = self.project_root.clone();
        let regenerator = Arc::clone(&handle.regenerator);
        let contracts = handle.execution.preview.contracts.clone();
        let weak_node = handle.execution.preview.weak_node.clone();

        let attempts = jobs.into_iter().map(|(id, file, declared)| {
            let regenerator = Arc::clone(&regenerator);
            let project_root = project_root.clone();
            let frozen_contract = contracts.get(&id).cloned();
            let description = declared.unwrap_or_else(|| match mode {
                RegenerationMode::Regenerate => format!("Regenerate weak artifact {id}"),
                RegenerationMode::Update => {
                    format!("Update {id} for compatibility with regenerated {weak_node}")
                }
            });
            async move {
                // Virtual artifacts have nothing to write; they succeed
                // vacuously so wave accounting stays consistent.
                let Some(file) = file else {
                    return (id, true);
                };
                let spec = RegenerationSpec {
                    artifact_id: id.clone(),
                    target_file: file.clone(),
                    mode,
                    description,
                    frozen_contract,
                    context: BTreeMap::from([(
                        "wave_num".to_string(),
                        serde_json::json!(wave_num),
                    )]),
                };
                match regenerator.regenerate(spec).await {
                    Ok(result) => {
                        let target = project_root.join(&file);
                        if let Some(parent) = target.parent()
                            && let Err(err) = tokio::fs::create_dir_all(parent).await
                        {
                            warn!(artifact_id = %id, error = %err, "could not create target dir");
                            return (id, false);
                        }
                        match tokio::fs::write(&target, result.content).await {
                            Ok(()) => (id, true),
                            Err(err) => {
                                warn!(artifact_id = %id, error = %err, "write failed");
                                (id, false)
                            }
                        }
                    }
                    Err(err) => {
                        warn!(artifact_id = %id, error = %err, "regeneration failed");
                        (id, false)
                    }
                }
            }
        });

        let outcomes = futures::future::join_all(attempts).await;
        let succeeded: Vec<String> = outcomes
            .iter()
            .filter(|(_, ok)| *ok)
            .map(|(id, _)| id.clone())
            .collect();
        let failed: Vec<String> = outcomes
            .iter()
            .filter(|(_, ok)| !*ok)
            .map(|(id, _)| id.clone())
            .collect();

        self.bus.publish(CascadeEventKind::WaveGenerated {
            wave_num,
            succeeded: succeeded.clone(),
            failed: failed.clone(),
        });
        self.audit_append(
            "executor",
            "wave_generated",
            serde_json::json!({
                "cascade_id": handle.cascade_id,
                "wave_num": wave_num,
                "succeeded": succeeded,
                "failed": failed,
            }),
            String::new(),
            String::new(),
        )?;

        let touched: Vec<TouchedArtifact> = members
            .iter()
            .filter_map(|id| {
                let file = self.graph.get(id).ok()?.produces_file.clone()?;
                Some(TouchedArtifact {
                    artifact_id: id.clone(),
                    file,
                })
            })
            .collect();

        let verification = verify_wave(
            wave_num,
            &touched,
            &handle.execution.preview.contracts,
            &self.project_root,
            &handle.toolchain,
        )
        .await;
        let confidence = verification.confidence.clone();

        self.bus.publish(CascadeEventKind::WaveScored {
            wave_num,
            confidence: confidence.confidence,
            tests_passed: confidence.tests_passed,
            types_clean: confidence.types_clean,
            lint_clean: confidence.lint_clean,
            contracts_preserved: confidence.contracts_preserved,
            deductions: confidence.deductions.clone(),
        });
        self.audit_append(
            "verifier",
            "wave_scored",
            serde_json::json!({
                "cascade_id": handle.cascade_id,
                "wave_num": wave_num,
                "confidence": confidence.confidence,
                "deductions": confidence.deductions,
                "skipped_checks": verification.skipped_checks,
                "contract_sources": verification
                    .contract_sources
                    .iter()
                    .map(|(id, source)| serde_json::json!({"artifact_id": id, "contract_source": source}))
                    .collect::<Vec<_>>(),
            }),
            String::new(),
            String::new(),
        )?;

        handle.execution.record_wave_completion(confidence);

        if handle.execution.paused_for_approval
            && let Some(reason) = handle.execution.pause_reason()
        {
            self.bus.publish(CascadeEventKind::CascadePaused {
                wave_num,
                reason,
            });
            self.audit_append(
                "executor",
                "cascade_paused",
                serde_json::json!({
                    "cascade_id": handle.cascade_id,
                    "wave_num": wave_num,
                    "reason": match reason {
                        hc_core::PauseReason::Manual => "manual",
                        hc_core::PauseReason::LowConfidence => "low_confidence",
                        hc_core::PauseReason::Escalation => "escalation",
                    },
                }),
                String::new(),
                String::new(),
            )?;
        }

        Ok(())
    }
}
