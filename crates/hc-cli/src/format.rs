// SPDX-License-Identifier: MIT OR Apache-2.0
//! Human-readable rendering for the `health` binary.

use hc_core::{CascadeExecution, CascadePreview, ExtractedContract, PauseReason, WeaknessReport};
use hc_executor::IntegrationReport;

/// Render a weakness report as a ranked table.
pub fn render_report(report: &WeaknessReport) {
    println!(
        "scanned {} files: {} critical, {} high, {} medium, {} low",
        report.files_scanned,
        report.critical_count,
        report.high_count,
        report.medium_count,
        report.low_count
    );
    for score in &report.scores {
        let kinds: Vec<String> = score.kinds().iter().map(ToString::to_string).collect();
        println!(
            "  {:<8} {:.2}  fan-out {:>3}  {}  [{}]",
            score.cascade_risk,
            score.total_severity,
            score.fan_out,
            score.artifact_id,
            kinds.join(", ")
        );
    }
    if report.scores.is_empty() {
        println!("  no weaknesses detected");
    }
}

/// Render a cascade preview.
pub fn render_preview(preview: &CascadePreview, include_contracts: bool) {
    println!(
        "cascade from {}: {} impacted, {} waves, effort {}",
        preview.weak_node,
        preview.total_impacted,
        preview.wave_count(),
        preview.estimated_effort
    );
    println!("risk: {}", preview.risk_assessment);
    for (num, wave) in preview.waves.iter().enumerate() {
        println!("  wave {num}: {}", wave.join(", "));
    }
    if preview.cascade_too_large {
        println!("blocked: cascade exceeds configured limits (raise them to execute)");
    }
    if include_contracts {
        for (id, contract) in &preview.contracts {
            println!("  contract {id}: {}", contract.interface_hash);
        }
    }
}

/// Render a completed execution.
pub fn render_completed(execution: &CascadeExecution) {
    println!(
        "cascade complete: {} waves, overall confidence {:.2}",
        execution.preview.wave_count(),
        execution.overall_confidence()
    );
    for conf in &execution.wave_confidences {
        let mark = if conf.deductions.is_empty() { "ok" } else { "!" };
        println!(
            "  wave {} [{}] confidence {:.2} {}",
            conf.wave_num,
            mark,
            conf.confidence,
            conf.deductions.join("; ")
        );
    }
}

/// Render an aborted execution.
pub fn render_aborted(execution: &CascadeExecution) {
    println!(
        "cascade aborted: {}",
        execution.abort_reason.as_deref().unwrap_or("unknown")
    );
}

/// Render a pause prompt header.
pub fn render_pause(execution: &CascadeExecution, reason: PauseReason) {
    let reason = match reason {
        PauseReason::Manual => "awaiting approval",
        PauseReason::LowConfidence => "low confidence",
        PauseReason::Escalation => "escalated to human",
    };
    println!(
        "paused after wave {} ({reason})",
        execution.current_wave.saturating_sub(1)
    );
    if let Some(conf) = execution.wave_confidences.last() {
        println!(
            "  confidence {:.2}{}",
            conf.confidence,
            if conf.deductions.is_empty() {
                String::new()
            } else {
                format!(" — {}", conf.deductions.join("; "))
            }
        );
    }
}

/// Render an extracted contract.
pub fn render_contract(contract: &ExtractedContract) {
    println!(
        "{} ({}) hash {}",
        contract.artifact_id, contract.file_path, contract.interface_hash
    );
    for function in &contract.functions {
        println!("  fn    {function}");
    }
    for class in &contract.classes {
        println!("  class {class}");
    }
    for export in &contract.exports {
        println!("  pub   {export}");
    }
    for ty in &contract.type_signatures {
        println!("  type  {ty}");
    }
}

/// Render integration check results.
pub fn render_integrations(report: &IntegrationReport) {
    for result in &report.results {
        let mark = if result.passed { "ok " } else { "FAIL" };
        println!(
            "  [{mark}] {} ({}) — expected {}, {}",
            result.edge_id, result.kind, result.expected, result.actual
        );
    }
    if report.results.is_empty() {
        println!("  no declared integrations");
    }
    println!(
        "{}",
        if report.all_passed {
            "all integrations wired"
        } else {
            "integration verification failed"
        }
    );
}
