// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command implementations for the `health` binary.
//!
//! Every command loads (or discovers) the artifact graph, opens a
//! [`CoreContext`], runs one engine operation, and renders either JSON or
//! human output. The core emits no terminal decisions; everything printed
//! here is the caller's rendering.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use hc_agent::{MockRegenerator, RegeneratorRegistry};
use hc_audit::{AuditQuery, IntegrityReport};
use hc_config::EngineConfig;
use hc_core::{ExecutionPolicy, PauseReason};
use hc_executor::CoreContext;
use hc_graph::ArtifactGraph;
use hc_verify::Toolchain;
use tracing::debug;
use walkdir::WalkDir;

use crate::format;
use crate::{EXIT_AUDIT_FAILURE, EXIT_CASCADE_ABORTED, EXIT_OK, EXIT_RUNTIME_ERROR};

/// Graph definition path under the project root.
pub const GRAPH_PATH: &str = ".health/graph.json";

/// Load the graph from `.health/graph.json`, or discover a flat one from
/// the source tree when no definition exists.
///
/// Discovery creates one artifact per source file (id = relative path) with
/// no dependency edges; it keeps `health scan` useful on a fresh project
/// before anyone has declared the graph.
pub fn load_or_discover_graph(root: &Path, config: &EngineConfig) -> Result<ArtifactGraph> {
    let graph_path = root.join(GRAPH_PATH);
    if graph_path.exists() {
        let content = std::fs::read_to_string(&graph_path)
            .with_context(|| format!("read {}", graph_path.display()))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("parse {}", graph_path.display()));
    }

    debug!("no graph definition, discovering artifacts from the source tree");
    let mut artifacts = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.file_name() != std::ffi::OsStr::new(".git")
                && e.file_name() != std::ffi::OsStr::new(".health")
        })
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        if config.is_source_file(&rel) {
            artifacts.push(
                hc_core::ArtifactBuilder::new(rel.clone())
                    .file(rel)
                    .build(),
            );
        }
    }
    ArtifactGraph::from_artifacts(artifacts).context("discovered graph is invalid")
}

fn open_context(root: &Path) -> Result<CoreContext> {
    let config = hc_config::load_config(root)?;
    let graph = load_or_discover_graph(root, &config)?;
    CoreContext::open(root, graph, config).map_err(|e| anyhow::anyhow!(e))
}

/// `health scan`.
pub async fn scan(root: PathBuf, ignore: Vec<String>, json: bool) -> Result<i32> {
    let mut ctx = open_context(&root)?;
    ctx.config.ignore_patterns.extend(ignore);
    let report = ctx.scan().await.map_err(|e| anyhow::anyhow!(e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        format::render_report(&report);
    }
    Ok(EXIT_OK)
}

/// `health preview ARTIFACT_ID`.
pub async fn preview(
    root: PathBuf,
    artifact_id: String,
    include_contracts: bool,
    json: bool,
) -> Result<i32> {
    let mut ctx = open_context(&root)?;
    let preview = match ctx.preview(&artifact_id) {
        Ok(preview) => preview,
        Err(err) => {
            eprintln!("{err}");
            return Ok(EXIT_RUNTIME_ERROR);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        format::render_preview(&preview, include_contracts);
    }
    Ok(EXIT_OK)
}

/// `health fix ARTIFACT_ID`.
#[allow(clippy::too_many_arguments)]
pub async fn fix(
    root: PathBuf,
    artifact_id: String,
    yes: bool,
    dry_run: bool,
    wave_by_wave: bool,
    confidence_threshold: Option<f64>,
    regenerator_name: String,
    json: bool,
) -> Result<i32> {
    let mut ctx = open_context(&root)?;
    let preview = match ctx.preview(&artifact_id) {
        Ok(preview) => preview,
        Err(err) => {
            eprintln!("{err}");
            return Ok(EXIT_RUNTIME_ERROR);
        }
    };

    if dry_run {
        if json {
            println!("{}", serde_json::to_string_pretty(&preview)?);
        } else {
            format::render_preview(&preview, false);
            println!("dry run: no files were changed");
        }
        return Ok(EXIT_OK);
    }

    let mut registry = RegeneratorRegistry::new();
    registry.register("mock", MockRegenerator);
    let Some(regenerator) = registry.get(&regenerator_name) else {
        eprintln!(
            "unknown regenerator '{regenerator_name}' (available: {})",
            registry.list().join(", ")
        );
        return Ok(EXIT_RUNTIME_ERROR);
    };

    let mut policy = ExecutionPolicy {
        auto_approve: yes && !wave_by_wave,
        ..ctx.config.policy
    };
    if let Some(threshold) = confidence_threshold {
        policy.confidence_threshold = threshold;
    }

    let toolchain = Toolchain {
        test_command: ctx.config.verify.test_command.clone(),
        type_command: ctx.config.verify.type_command.clone(),
        lint_command: ctx.config.verify.lint_command.clone(),
        timeout_secs: ctx.config.verify.timeout_secs,
    };
    let mut handle = match ctx.start_cascade(preview, policy, Arc::clone(&regenerator), toolchain) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("{err}");
            return Ok(EXIT_RUNTIME_ERROR);
        }
    };

    let metrics = hc_telemetry::MetricsCollector::new();
    let started = std::time::Instant::now();

    loop {
        let state = ctx
            .advance_cascade(&mut handle)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        if state.aborted {
            record_cascade_metrics(&metrics, &artifact_id, started, &state);
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                format::render_aborted(&state);
            }
            return Ok(EXIT_CASCADE_ABORTED);
        }
        if state.completed {
            record_cascade_metrics(&metrics, &artifact_id, started, &state);
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                format::render_completed(&state);
            }
            return Ok(EXIT_OK);
        }

        // Paused. Escalations always need a human; otherwise --yes keeps
        // going and interactive mode asks.
        let reason = state.pause_reason().unwrap_or(PauseReason::Manual);
        if !json {
            format::render_pause(&state, reason);
        }
        let approve = match reason {
            PauseReason::Escalation => confirm("Escalated to human review. Continue anyway?")?,
            _ if yes => true,
            _ => confirm("Continue with the next wave?")?,
        };
        if approve {
            ctx.approve_wave(&mut handle).map_err(|e| anyhow::anyhow!(e))?;
        } else {
            ctx.abort_cascade(&mut handle, "user")
                .map_err(|e| anyhow::anyhow!(e))?;
            record_cascade_metrics(&metrics, &artifact_id, started, &handle.execution);
            if json {
                println!("{}", serde_json::to_string_pretty(&handle.execution)?);
            } else {
                format::render_aborted(&handle.execution);
            }
            return Ok(EXIT_CASCADE_ABORTED);
        }
    }
}

/// Record one cascade's metrics and log the running summary.
fn record_cascade_metrics(
    collector: &hc_telemetry::MetricsCollector,
    weak_node: &str,
    started: std::time::Instant,
    state: &hc_core::CascadeExecution,
) {
    let regenerated: u32 = state
        .wave_confidences
        .iter()
        .map(|c| c.artifacts.len() as u32)
        .sum();
    collector.record(hc_telemetry::CascadeMetrics {
        weak_node: weak_node.to_string(),
        duration_ms: started.elapsed().as_millis() as u64,
        waves: state.wave_confidences.len() as u32,
        artifacts_regenerated: regenerated,
        artifacts_failed: 0,
        overall_confidence: state.overall_confidence(),
        completed: state.completed,
        escalated: state.escalated_to_human,
    });
    debug!(summary = ?collector.summary(), "cascade metrics");
}

/// `health extract-contract ARTIFACT_ID`.
pub fn extract_contract(root: PathBuf, artifact_id: String, json: bool) -> Result<i32> {
    let ctx = open_context(&root)?;
    match ctx.extract_contract(&artifact_id) {
        Ok(contract) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&contract)?);
            } else {
                format::render_contract(&contract);
            }
            Ok(EXIT_OK)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(EXIT_RUNTIME_ERROR)
        }
    }
}

/// `health audit verify`.
pub fn audit_verify(root: PathBuf, json: bool) -> Result<i32> {
    let ctx = open_context(&root)?;
    let report = ctx.verify_audit().map_err(|e| anyhow::anyhow!(e))?;
    match report {
        IntegrityReport::Valid { verified } => {
            if json {
                println!("{}", serde_json::json!({"ok": true, "verified": verified}));
            } else {
                println!("audit chain intact: {verified} entries verified");
            }
            Ok(EXIT_OK)
        }
        IntegrityReport::Broken {
            first_broken,
            reason,
        } => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({"ok": false, "first_broken": first_broken, "reason": format!("{reason:?}")})
                );
            } else {
                println!("audit chain BROKEN at entry {first_broken} ({reason:?})");
            }
            Ok(EXIT_AUDIT_FAILURE)
        }
    }
}

/// `health audit export`.
pub fn audit_export(root: PathBuf, from: Option<usize>, to: Option<usize>) -> Result<i32> {
    let ctx = open_context(&root)?;
    let bytes = ctx
        .export_audit(&AuditQuery {
            action: None,
            from,
            to,
        })
        .map_err(|e| anyhow::anyhow!(e))?;
    print!("{}", String::from_utf8_lossy(&bytes));
    Ok(EXIT_OK)
}

/// `health integrations verify [ARTIFACT_ID]`.
pub fn integrations_verify(
    root: PathBuf,
    artifact_id: Option<String>,
    json: bool,
) -> Result<i32> {
    let mut ctx = open_context(&root)?;
    let report = match ctx.verify_integrations(artifact_id.as_deref()) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{err}");
            return Ok(EXIT_RUNTIME_ERROR);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report.results)?);
    } else {
        format::render_integrations(&report);
    }
    Ok(if report.all_passed {
        EXIT_OK
    } else {
        EXIT_RUNTIME_ERROR
    })
}

/// Ask a yes/no question on stdin.
fn confirm(question: &str) -> Result<bool> {
    println!("{question} [y/N]");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
