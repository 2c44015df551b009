// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wave confidence: a scalar in `[0, 1]` derived from four verification
//! signals with fixed weights.
//!
//! The formula is frozen for the lifetime of an execution: confidence
//! starts at 1.0 and loses a fixed deduction per failed check. Deductions are appended in check order so downstream
//! consumers can render them stably.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Deduction applied when the wave's tests fail.
pub const DEDUCTION_TESTS: f64 = 0.4;
/// Deduction applied when the type checker reports errors.
pub const DEDUCTION_TYPES: f64 = 0.2;
/// Deduction applied when the linter reports errors.
pub const DEDUCTION_LINT: f64 = 0.1;
/// Deduction applied when a frozen contract is no longer preserved.
pub const DEDUCTION_CONTRACTS: f64 = 0.3;

/// The four boolean verification outcomes for one wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WaveChecks {
    /// Test runner exited zero (or was unavailable).
    pub tests_passed: bool,
    /// Type checker reported zero errors (or was unavailable).
    pub types_clean: bool,
    /// Linter reported zero errors on touched files (or was unavailable).
    pub lint_clean: bool,
    /// Every frozen contract is still compatible with the regenerated file.
    pub contracts_preserved: bool,
}

impl WaveChecks {
    /// All four checks passing.
    #[must_use]
    pub fn all_clean() -> Self {
        Self {
            tests_passed: true,
            types_clean: true,
            lint_clean: true,
            contracts_preserved: true,
        }
    }
}

impl Default for WaveChecks {
    fn default() -> Self {
        Self::all_clean()
    }
}

/// Output of verifying one wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WaveConfidence {
    /// Which wave was verified.
    pub wave_num: u32,
    /// The artifacts that were touched in the wave.
    pub artifacts: Vec<String>,
    /// Test check outcome.
    pub tests_passed: bool,
    /// Type check outcome.
    pub types_clean: bool,
    /// Lint check outcome.
    pub lint_clean: bool,
    /// Contract preservation outcome.
    pub contracts_preserved: bool,
    /// `1.0 − Σ deductions`, clamped to `[0, 1]`.
    pub confidence: f64,
    /// Human-readable reasons, in check order.
    pub deductions: Vec<String>,
}

impl WaveConfidence {
    /// Score a wave from its four check outcomes.
    ///
    /// # Examples
    ///
    /// ```
    /// use hc_core::{WaveChecks, WaveConfidence};
    ///
    /// let clean = WaveConfidence::compute(0, vec!["a".into()], WaveChecks::all_clean());
    /// assert_eq!(clean.confidence, 1.0);
    /// assert!(clean.deductions.is_empty());
    ///
    /// let broken = WaveConfidence::compute(
    ///     0,
    ///     vec!["a".into()],
    ///     WaveChecks { contracts_preserved: false, ..WaveChecks::all_clean() },
    /// );
    /// assert!((broken.confidence - 0.7).abs() < 1e-9);
    /// assert_eq!(broken.deductions, vec!["Contract compatibility broken"]);
    /// ```
    #[must_use]
    pub fn compute(wave_num: u32, artifacts: Vec<String>, checks: WaveChecks) -> Self {
        let mut confidence = 1.0;
        let mut deductions = Vec::new();

        if !checks.tests_passed {
            confidence -= DEDUCTION_TESTS;
            deductions.push("Tests failed".to_string());
        }
        if !checks.types_clean {
            confidence -= DEDUCTION_TYPES;
            deductions.push("Type errors introduced".to_string());
        }
        if !checks.lint_clean {
            confidence -= DEDUCTION_LINT;
            deductions.push("Lint errors present".to_string());
        }
        if !checks.contracts_preserved {
            confidence -= DEDUCTION_CONTRACTS;
            deductions.push("Contract compatibility broken".to_string());
        }

        Self {
            wave_num,
            artifacts,
            tests_passed: checks.tests_passed,
            types_clean: checks.types_clean,
            lint_clean: checks.lint_clean,
            contracts_preserved: checks.contracts_preserved,
            confidence: confidence.clamp(0.0, 1.0),
            deductions,
        }
    }

    /// The check outcomes as a [`WaveChecks`] value.
    #[must_use]
    pub fn checks(&self) -> WaveChecks {
        WaveChecks {
            tests_passed: self.tests_passed,
            types_clean: self.types_clean,
            lint_clean: self.lint_clean,
            contracts_preserved: self.contracts_preserved,
        }
    }
}
