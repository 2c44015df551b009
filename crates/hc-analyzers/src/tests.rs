// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::path::Path;

use hc_config::{AnalyzerThresholds, EngineConfig};
use hc_core::{WeaknessKind, WeaknessSignal};
use hc_glob::IgnoreRules;

use crate::staleness::staleness_signal;
use crate::{Analyzer, AnalyzerContext, AnalyzerRegistry, ScanTarget, rank_weaknesses};

struct Fixture {
    targets: Vec<ScanTarget>,
    thresholds: AnalyzerThresholds,
    fan_out: BTreeMap<String, u32>,
    ignore: IgnoreRules,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            targets: files
                .iter()
                .map(|(id, file)| ScanTarget {
                    artifact_id: id.to_string(),
                    file: file.to_string(),
                })
                .collect(),
            thresholds: AnalyzerThresholds::default(),
            fan_out: BTreeMap::new(),
            ignore: IgnoreRules::new(&[]).expect("empty rules compile"),
        }
    }

    fn ctx<'a>(&'a self, root: &'a Path) -> AnalyzerContext<'a> {
        AnalyzerContext {
            project_root: root,
            targets: &self.targets,
            thresholds: &self.thresholds,
            fan_out: &self.fan_out,
            ignore: &self.ignore,
        }
    }
}

// ── path normalization ─────────────────────────────────────────────

#[test]
fn absolute_report_paths_resolve_to_targets() {
    let fixture = Fixture::new(&[("app", "src/app.py")]);
    let ctx = fixture.ctx(Path::new("/project"));
    assert_eq!(
        ctx.target_for("/project/src/app.py").map(|t| t.artifact_id.as_str()),
        Some("app")
    );
    assert_eq!(
        ctx.target_for("./src/app.py").map(|t| t.artifact_id.as_str()),
        Some("app")
    );
    assert!(ctx.target_for("src/other.py").is_none());
}

#[test]
fn ignored_paths_never_map_to_targets() {
    let mut fixture = Fixture::new(&[("gen", "generated/schema.py")]);
    fixture.ignore = IgnoreRules::new(&["generated/**".to_string()]).unwrap();
    let ctx = fixture.ctx(Path::new("/project"));
    assert!(ctx.target_for("generated/schema.py").is_none());
}

// ── coverage ───────────────────────────────────────────────────────

#[test]
fn low_coverage_emits_scaled_severity() {
    let fixture = Fixture::new(&[("app", "src/app.py")]);
    let ctx = fixture.ctx(Path::new("/project"));
    let report = serde_json::json!({
        "files": {
            "src/app.py": {"summary": {"percent_covered": 20.0}}
        }
    });
    let signals = crate::coverage::signals_from_report(&ctx, &report);
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].kind, WeaknessKind::LowCoverage);
    // (0.5 − 0.2) / 0.5 = 0.6
    assert!((signals[0].severity - 0.6).abs() < 1e-9);
    assert_eq!(signals[0].evidence["coverage"], serde_json::json!(0.2));
}

#[test]
fn covered_files_emit_nothing() {
    let fixture = Fixture::new(&[("app", "src/app.py")]);
    let ctx = fixture.ctx(Path::new("/project"));
    let report = serde_json::json!({
        "files": {"src/app.py": {"summary": {"percent_covered": 90.0}}}
    });
    assert!(crate::coverage::signals_from_report(&ctx, &report).is_empty());
}

#[test]
fn zero_threshold_disables_coverage_signals() {
    let mut fixture = Fixture::new(&[("app", "src/app.py")]);
    fixture.thresholds.coverage = 0.0;
    let ctx = fixture.ctx(Path::new("/project"));
    let report = serde_json::json!({
        "files": {"src/app.py": {"summary": {"percent_covered": 0.0}}}
    });
    assert!(crate::coverage::signals_from_report(&ctx, &report).is_empty());
}

// ── complexity ─────────────────────────────────────────────────────

#[test]
fn worst_function_drives_complexity_severity() {
    let fixture = Fixture::new(&[("app", "src/app.py")]);
    let ctx = fixture.ctx(Path::new("/project"));
    let report = serde_json::json!({
        "src/app.py": [
            {"name": "simple", "complexity": 3},
            {"name": "gnarly", "complexity": 17}
        ]
    });
    let signals = crate::complexity::signals_from_report(&ctx, &report);
    assert_eq!(signals.len(), 1);
    // (17 − 10) / 10 = 0.7
    assert!((signals[0].severity - 0.7).abs() < 1e-9);
    assert_eq!(signals[0].evidence["function"], serde_json::json!("gnarly"));
}

#[test]
fn complexity_at_threshold_is_clean() {
    let fixture = Fixture::new(&[("app", "src/app.py")]);
    let ctx = fixture.ctx(Path::new("/project"));
    let report = serde_json::json!({"src/app.py": [{"name": "f", "complexity": 10}]});
    assert!(crate::complexity::signals_from_report(&ctx, &report).is_empty());
}

// ── lint ───────────────────────────────────────────────────────────

#[test]
fn lint_counts_cap_at_one() {
    let fixture = Fixture::new(&[("app", "src/app.py")]);
    let ctx = fixture.ctx(Path::new("/project"));
    let findings: Vec<_> = (0..25)
        .map(|i| serde_json::json!({"filename": "src/app.py", "code": format!("E{i}")}))
        .collect();
    let signals = crate::lint::signals_from_report(&ctx, &serde_json::json!(findings));
    assert_eq!(signals.len(), 1);
    assert!((signals[0].severity - 1.0).abs() < 1e-9);
    assert_eq!(signals[0].evidence["error_count"], serde_json::json!(25));
}

#[test]
fn lint_severity_scales_with_count() {
    let fixture = Fixture::new(&[("app", "src/app.py")]);
    let ctx = fixture.ctx(Path::new("/project"));
    let findings = serde_json::json!([
        {"filename": "src/app.py", "code": "F401"},
        {"filename": "src/app.py", "code": "E501"},
        {"filename": "src/app.py", "code": "E711"}
    ]);
    let signals = crate::lint::signals_from_report(&ctx, &findings);
    assert!((signals[0].severity - 0.3).abs() < 1e-9);
}

// ── types ──────────────────────────────────────────────────────────

#[test]
fn type_errors_are_counted_per_file() {
    let fixture = Fixture::new(&[("app", "src/app.py"), ("lib", "src/lib.py")]);
    let ctx = fixture.ctx(Path::new("/project"));
    let output = "\
src/app.py:10: error: Incompatible return value type
src/app.py:22: error: Missing type annotation
src/lib.py:5: note: See documentation
Found 2 errors in 1 file
";
    let signals = crate::types::signals_from_output(&ctx, output);
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].artifact_id, "app");
    // 2 / 5 = 0.4
    assert!((signals[0].severity - 0.4).abs() < 1e-9);
}

// ── staleness gates ────────────────────────────────────────────────

#[test]
fn staleness_requires_all_three_gates() {
    let gate = |months, coverage, fan_out| {
        staleness_signal("a", months, coverage, fan_out, 6, 3, 0.5).is_some()
    };
    assert!(gate(8.0, Some(0.2), 5));
    assert!(!gate(5.0, Some(0.2), 5), "too recent");
    assert!(!gate(8.0, Some(0.9), 5), "well covered");
    assert!(!gate(8.0, Some(0.2), 2), "low fan-out");
    assert!(
        !staleness_signal("a", 8.0, None, 5, 6, 3, 0.5).is_some(),
        "unknown coverage never qualifies"
    );
}

#[test]
fn staleness_severity_scales_with_age_and_fan_out() {
    let signal = staleness_signal("a", 12.0, Some(0.1), 5, 6, 3, 0.5).unwrap();
    // 12/12 × 5/10 = 0.5
    assert!((signal.severity - 0.5).abs() < 1e-9);

    let capped = staleness_signal("a", 60.0, Some(0.1), 30, 6, 3, 0.5).unwrap();
    assert!((capped.severity - 1.0).abs() < 1e-9);
}

// ── ranking ────────────────────────────────────────────────────────

fn files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn ranking_sorts_by_severity_then_fan_out_then_id() {
    let signals = vec![
        WeaknessSignal::new("low", WeaknessKind::LintErrors, 0.2),
        WeaknessSignal::new("high", WeaknessKind::LowCoverage, 0.9),
        WeaknessSignal::new("mid_a", WeaknessKind::LowCoverage, 0.5),
        WeaknessSignal::new("mid_b", WeaknessKind::LowCoverage, 0.5),
    ];
    let files = files(&[
        ("low", "low.py"),
        ("high", "high.py"),
        ("mid_a", "mid_a.py"),
        ("mid_b", "mid_b.py"),
    ]);
    let fan_out = BTreeMap::from([("mid_b".to_string(), 4u32)]);
    let scores = rank_weaknesses(
        signals,
        &files,
        &fan_out,
        &BTreeMap::new(),
        &EngineConfig::default(),
    );
    let order: Vec<&str> = scores.iter().map(|s| s.artifact_id.as_str()).collect();
    // mid_b's fan-out boost (0.5 × 1.2 = 0.6) ranks it above mid_a.
    assert_eq!(order, vec!["high", "mid_b", "mid_a", "low"]);
}

#[test]
fn virtual_and_foreign_files_are_skipped() {
    let signals = vec![
        WeaknessSignal::new("virtual", WeaknessKind::LintErrors, 0.9),
        WeaknessSignal::new("js", WeaknessKind::LintErrors, 0.9),
        WeaknessSignal::new("py", WeaknessKind::LintErrors, 0.9),
    ];
    let files = files(&[("js", "app.js"), ("py", "app.py")]);
    let scores = rank_weaknesses(
        signals,
        &files,
        &BTreeMap::new(),
        &BTreeMap::new(),
        &EngineConfig::default(),
    );
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].artifact_id, "py");
}

#[test]
fn ranking_is_deterministic() {
    let make = || {
        rank_weaknesses(
            vec![
                WeaknessSignal::new("a", WeaknessKind::LowCoverage, 0.5),
                WeaknessSignal::new("b", WeaknessKind::LintErrors, 0.5),
            ],
            &files(&[("a", "a.py"), ("b", "b.py")]),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &EngineConfig::default(),
        )
    };
    assert_eq!(make(), make());
}

// ── registry ───────────────────────────────────────────────────────

struct FixedAnalyzer(Vec<WeaknessSignal>);

#[async_trait::async_trait]
impl Analyzer for FixedAnalyzer {
    fn name(&self) -> &'static str {
        "fixed"
    }
    async fn run(&self, _ctx: &AnalyzerContext<'_>) -> anyhow::Result<Vec<WeaknessSignal>> {
        Ok(self.0.clone())
    }
}

struct FailingAnalyzer;

#[async_trait::async_trait]
impl Analyzer for FailingAnalyzer {
    fn name(&self) -> &'static str {
        "failing"
    }
    async fn run(&self, _ctx: &AnalyzerContext<'_>) -> anyhow::Result<Vec<WeaknessSignal>> {
        anyhow::bail!("tool crashed")
    }
}

#[tokio::test]
async fn registry_collects_signals_and_tolerates_failures() {
    let fixture = Fixture::new(&[("app", "src/app.py")]);
    let dir = tempfile::tempdir().unwrap();

    let mut registry = AnalyzerRegistry::new();
    registry.register(FailingAnalyzer);
    registry.register(FixedAnalyzer(vec![WeaknessSignal::new(
        "app",
        WeaknessKind::LintErrors,
        0.3,
    )]));

    let ctx = fixture.ctx(dir.path());
    let signals = registry.run_all(&ctx).await;
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].artifact_id, "app");
}

#[tokio::test]
async fn default_registry_runs_clean_on_empty_project() {
    let fixture = Fixture::new(&[("app", "src/app.py")]);
    let dir = tempfile::tempdir().unwrap();
    let registry = AnalyzerRegistry::with_defaults();
    assert_eq!(
        registry.names(),
        vec!["coverage", "complexity", "lint", "types", "staleness"]
    );
    let ctx = fixture.ctx(dir.path());
    // No reports, no git repo: every analyzer degrades to no signals.
    assert!(registry.run_all(&ctx).await.is_empty());
}
