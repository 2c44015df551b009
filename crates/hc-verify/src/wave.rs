// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wave verification: four independent checks folded into a confidence.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use hc_core::{ExtractedContract, WaveChecks, WaveConfidence};
use tokio::process::Command;
use tracing::{debug, warn};

/// One artifact touched by a wave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchedArtifact {
    /// The artifact id.
    pub artifact_id: String,
    /// Its file, relative to the project root.
    pub file: String,
}

/// Commands for the three subprocess checks.
///
/// `None` means "autodetect": probe PATH for the conventional tool and skip
/// the check when it is absent. An explicitly empty command disables the
/// check (it is recorded as skipped and counted as passing).
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    /// Test runner invocation (default: `pytest -q` when available).
    pub test_command: Option<Vec<String>>,
    /// Type checker invocation (default: `mypy .` when available).
    pub type_command: Option<Vec<String>>,
    /// Linter invocation; touched files are appended (default:
    /// `ruff check` when available).
    pub lint_command: Option<Vec<String>>,
    /// Per-subprocess timeout in seconds (default 300).
    pub timeout_secs: Option<u64>,
}

impl Toolchain {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(300))
    }

    fn resolve(explicit: &Option<Vec<String>>, tool: &str, default_args: &[&str]) -> Option<Vec<String>> {
        if let Some(command) = explicit {
            return Some(command.clone());
        }
        which::which(tool).ok().map(|_| {
            let mut command = vec![tool.to_string()];
            command.extend(default_args.iter().map(|s| s.to_string()));
            command
        })
    }
}

/// A check that did not run, and why.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkippedCheck {
    /// Which check was skipped (`tests`, `types`, `lint`, `contracts`).
    pub check: &'static str,
    /// Why it did not run.
    pub reason: String,
}

/// The verifier's full output for one wave.
#[derive(Debug, Clone)]
pub struct WaveVerification {
    /// The scored confidence.
    pub confidence: WaveConfidence,
    /// Checks that were counted as passing without running.
    pub skipped_checks: Vec<SkippedCheck>,
    /// Per-artifact contract provenance for the audit log
    /// (`"extracted"` / `"unavailable"`).
    pub contract_sources: Vec<(String, String)>,
}

/// How one subprocess check came out.
enum CheckOutcome {
    Passed,
    Failed,
    Skipped(String),
}

/// Run the four checks for one wave and fold them into a confidence.
///
/// Check order is fixed (tests, types, lint, contracts) so deduction
/// messages render stably downstream.
pub async fn verify_wave(
    wave_num: u32,
    touched: &[TouchedArtifact],
    frozen_contracts: &BTreeMap<String, ExtractedContract>,
    project_root: &Path,
    toolchain: &Toolchain,
) -> WaveVerification {
    let mut skipped = Vec::new();

    let tests = run_check(
        "tests",
        Toolchain::resolve(&toolchain.test_command, "pytest", &["-q"]),
        &[],
        project_root,
        toolchain.timeout(),
    )
    .await;
    let tests_passed = settle(tests, "tests", &mut skipped);

    let types = run_check(
        "types",
        Toolchain::resolve(&toolchain.type_command, "mypy", &["."]),
        &[],
        project_root,
        toolchain.timeout(),
    )
    .await;
    let types_clean = settle(types, "types", &mut skipped);

    let touched_files: Vec<String> = touched.iter().map(|t| t.file.clone()).collect();
    let lint = run_check(
        "lint",
        Toolchain::resolve(&toolchain.lint_command, "ruff", &["check"]),
        &touched_files,
        project_root,
        toolchain.timeout(),
    )
    .await;
    let lint_clean = settle(lint, "lint", &mut skipped);

    let (contracts_preserved, contract_sources) =
        check_contracts(touched, frozen_contracts, project_root, &mut skipped);

    WaveVerification {
        confidence: WaveConfidence::compute(
            wave_num,
            touched.iter().map(|t| t.artifact_id.clone()).collect(),
            WaveChecks {
                tests_passed,
                types_clean,
                lint_clean,
                contracts_preserved,
            },
        ),
        skipped_checks: skipped,
        contract_sources,
    }
}

/// Fold a check outcome into its boolean, recording skips.
fn settle(outcome: CheckOutcome, check: &'static str, skipped: &mut Vec<SkippedCheck>) -> bool {
    match outcome {
        CheckOutcome::Passed => true,
        CheckOutcome::Failed => false,
        CheckOutcome::Skipped(reason) => {
            debug!(check, reason = %reason, "check skipped, counted as pass");
            skipped.push(SkippedCheck { check, reason });
            true
        }
    }
}

/// Run one subprocess check. Missing tool, timeout, and crash all settle
/// as skips — tool trouble never fails a wave on its own.
async fn run_check(
    check: &'static str,
    command: Option<Vec<String>>,
    extra_args: &[String],
    project_root: &Path,
    timeout: Duration,
) -> CheckOutcome {
    let Some(command) = command else {
        return CheckOutcome::Skipped("tool not found on PATH".to_string());
    };
    let Some((program, args)) = command.split_first() else {
        return CheckOutcome::Skipped("empty command".to_string());
    };

    let mut invocation = Command::new(program);
    invocation
        .args(args)
        .args(extra_args)
        .current_dir(project_root)
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    match tokio::time::timeout(timeout, invocation.status()).await {
        Ok(Ok(status)) if status.success() => CheckOutcome::Passed,
        Ok(Ok(_)) => CheckOutcome::Failed,
        Ok(Err(err)) => {
            warn!(check, error = %err, "tool crashed, counting check as not run");
            CheckOutcome::Skipped(format!("tool crashed: {err}"))
        }
        Err(_) => {
            warn!(check, "tool timed out, counting check as not run");
            CheckOutcome::Skipped("tool timed out".to_string())
        }
    }
}

/// Contract preservation: every touched artifact with a frozen contract
/// must still be backward-compatible after regeneration.
fn check_contracts(
    touched: &[TouchedArtifact],
    frozen_contracts: &BTreeMap<String, ExtractedContract>,
    project_root: &Path,
    skipped: &mut Vec<SkippedCheck>,
) -> (bool, Vec<(String, String)>) {
    let mut preserved = true;
    let mut sources = Vec::new();
    let mut any_checked = false;

    for artifact in touched {
        let Some(frozen) = frozen_contracts.get(&artifact.artifact_id) else {
            sources.push((artifact.artifact_id.clone(), "unavailable".to_string()));
            continue;
        };
        match hc_contract::extract_contract(
            &artifact.artifact_id,
            &project_root.join(&artifact.file),
        ) {
            Ok(current) => {
                any_checked = true;
                sources.push((artifact.artifact_id.clone(), "extracted".to_string()));
                if !frozen.is_compatible_with(&current) {
                    debug!(
                        artifact_id = %artifact.artifact_id,
                        frozen = %frozen.interface_hash,
                        current = %current.interface_hash,
                        "contract compatibility broken"
                    );
                    preserved = false;
                }
            }
            Err(err) => {
                // Re-extraction failing is a gap, not a failure.
                sources.push((artifact.artifact_id.clone(), "unavailable".to_string()));
                skipped.push(SkippedCheck {
                    check: "contracts",
                    reason: format!("{}: {err}", artifact.artifact_id),
                });
            }
        }
    }

    if !any_checked && preserved && touched.iter().all(|t| !frozen_contracts.contains_key(&t.artifact_id)) {
        skipped.push(SkippedCheck {
            check: "contracts",
            reason: "no frozen contracts for this wave".to_string(),
        });
    }

    (preserved, sources)
}
