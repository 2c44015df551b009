// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-config
//!
//! Configuration loading, validation, and merging for the cascade engine.
//!
//! [`EngineConfig`] bundles the analyzer thresholds and the cascade
//! progression policy. It loads from `.health/config.toml`, applies
//! environment overrides, and validates into typed errors plus advisory
//! warnings. All defaults live here so the rest of the workspace never
//! hard-codes a threshold.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use hc_core::ExecutionPolicy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found or unreadable.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

/// Advisory-level issues that do not prevent operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// A threshold is set to a value that disables its analyzer.
    AnalyzerDisabled {
        /// The analyzer affected.
        analyzer: String,
        /// Why it is effectively off.
        hint: String,
    },
    /// The cascade size limit is unusually large.
    LargeCascadeLimit {
        /// Configured limit.
        limit: u32,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::AnalyzerDisabled { analyzer, hint } => {
                write!(f, "analyzer '{analyzer}' is effectively disabled: {hint}")
            }
            ConfigWarning::LargeCascadeLimit { limit } => {
                write!(f, "max_cascade_size {limit} is unusually large")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Per-analyzer thresholds used when turning tool output into signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalyzerThresholds {
    /// Coverage below this emits `low_coverage` (default 0.5).
    pub coverage: f64,
    /// Max function complexity above this emits `high_complexity`
    /// (default 10).
    pub complexity: u32,
    /// Cap used to normalize lint-error counts into severity (default 10).
    pub lint_error_cap: u32,
    /// Cap used to normalize type-error counts into severity (default 5).
    pub type_error_cap: u32,
    /// Months without a commit before a file counts as stale (default 6).
    pub staleness_months: u32,
    /// Minimum fan-out for the staleness gate (default 3).
    pub staleness_fan_out: u32,
}

impl Default for AnalyzerThresholds {
    fn default() -> Self {
        Self {
            coverage: 0.5,
            complexity: 10,
            lint_error_cap: 10,
            type_error_cap: 5,
            staleness_months: 6,
            staleness_fan_out: 3,
        }
    }
}

/// Limits applied when planning a cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CascadeLimits {
    /// Previews impacting more artifacts than this are flagged
    /// `cascade_too_large` and blocked from execution (default 50).
    pub max_cascade_size: u32,
    /// Maximum dependent chain length before the same flag applies
    /// (default 5).
    pub max_cascade_depth: u32,
}

impl Default for CascadeLimits {
    fn default() -> Self {
        Self {
            max_cascade_size: 50,
            max_cascade_depth: 5,
        }
    }
}

/// Verifier tool commands.
///
/// `None` means autodetect the conventional tool on PATH; an explicitly
/// empty list disables the check (counted as skipped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(default)]
pub struct VerifyTools {
    /// Test runner invocation.
    pub test_command: Option<Vec<String>>,
    /// Type checker invocation.
    pub type_command: Option<Vec<String>>,
    /// Linter invocation (touched files are appended).
    pub lint_command: Option<Vec<String>>,
    /// Per-subprocess timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Analyzer thresholds.
    pub thresholds: AnalyzerThresholds,
    /// Cascade size/depth limits.
    pub limits: CascadeLimits,
    /// Progression policy defaults (overridable per invocation).
    pub policy: ExecutionPolicy,
    /// Verifier tool commands.
    pub verify: VerifyTools,
    /// File extensions considered analyzable source (default `["py"]`).
    pub source_extensions: Vec<String>,
    /// Extra ignore patterns merged with `.healthignore`.
    pub ignore_patterns: Vec<String>,
}

impl EngineConfig {
    /// Returns `true` if `path` has one of the configured source extensions.
    #[must_use]
    pub fn is_source_file(&self, path: &str) -> bool {
        let exts = self.effective_extensions();
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| exts.iter().any(|x| x == e))
    }

    /// Configured extensions, falling back to the default set when empty.
    #[must_use]
    pub fn effective_extensions(&self) -> Vec<String> {
        if self.source_extensions.is_empty() {
            vec!["py".to_string()]
        } else {
            self.source_extensions.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Relative path of the config file under the project root.
pub const CONFIG_PATH: &str = ".health/config.toml";

/// Load an [`EngineConfig`] for `project_root`.
///
/// Reads `.health/config.toml` when present, otherwise returns defaults.
/// Environment overrides are applied on top in both cases.
///
/// # Errors
///
/// Returns [`ConfigError::ParseError`] if the file exists but is invalid.
pub fn load_config(project_root: &Path) -> Result<EngineConfig, ConfigError> {
    let path = project_root.join(CONFIG_PATH);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        parse_toml(&content)?
    } else {
        EngineConfig::default()
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into an [`EngineConfig`].
///
/// # Errors
///
/// Returns [`ConfigError::ParseError`] on invalid TOML.
pub fn parse_toml(content: &str) -> Result<EngineConfig, ConfigError> {
    toml::from_str::<EngineConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `HC_CONFIDENCE_THRESHOLD`
/// - `HC_MAX_CASCADE_SIZE`
pub fn apply_env_overrides(config: &mut EngineConfig) {
    if let Ok(val) = std::env::var("HC_CONFIDENCE_THRESHOLD")
        && let Ok(parsed) = val.parse::<f64>()
    {
        config.policy.confidence_threshold = parsed;
    }
    if let Ok(val) = std::env::var("HC_MAX_CASCADE_SIZE")
        && let Ok(parsed) = val.parse::<u32>()
    {
        config.limits.max_cascade_size = parsed;
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate semantic constraints, returning advisory warnings on success.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] listing every violated
/// constraint.
pub fn validate_config(config: &EngineConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut reasons = Vec::new();
    let mut warnings = Vec::new();

    if !(0.0..=1.0).contains(&config.thresholds.coverage) {
        reasons.push(format!(
            "thresholds.coverage must be in [0, 1], got {}",
            config.thresholds.coverage
        ));
    }
    if !(0.0..=1.0).contains(&config.policy.confidence_threshold) {
        reasons.push(format!(
            "policy.confidence_threshold must be in [0, 1], got {}",
            config.policy.confidence_threshold
        ));
    }
    if config.policy.max_consecutive_low_confidence == 0 {
        reasons.push("policy.max_consecutive_low_confidence must be at least 1".to_string());
    }
    if config.limits.max_cascade_size == 0 {
        reasons.push("limits.max_cascade_size must be at least 1".to_string());
    }

    if !reasons.is_empty() {
        return Err(ConfigError::ValidationError { reasons });
    }

    if config.thresholds.coverage == 0.0 {
        warnings.push(ConfigWarning::AnalyzerDisabled {
            analyzer: "coverage".into(),
            hint: "a zero threshold never emits low_coverage".into(),
        });
    }
    if config.limits.max_cascade_size > 500 {
        warnings.push(ConfigWarning::LargeCascadeLimit {
            limit: config.limits.max_cascade_size,
        });
    }

    Ok(warnings)
}

/// Overlay non-default fields of `overlay` on top of `base`.
///
/// Used by the CLI to apply flag values over the file-based config.
#[must_use]
pub fn merge_configs(base: EngineConfig, overlay: EngineConfig) -> EngineConfig {
    let defaults = EngineConfig::default();
    EngineConfig {
        thresholds: if overlay.thresholds == defaults.thresholds {
            base.thresholds
        } else {
            overlay.thresholds
        },
        limits: if overlay.limits == defaults.limits {
            base.limits
        } else {
            overlay.limits
        },
        policy: if overlay.policy == defaults.policy {
            base.policy
        } else {
            overlay.policy
        },
        verify: if overlay.verify == defaults.verify {
            base.verify
        } else {
            overlay.verify
        },
        source_extensions: if overlay.source_extensions.is_empty() {
            base.source_extensions
        } else {
            overlay.source_extensions
        },
        ignore_patterns: if overlay.ignore_patterns.is_empty() {
            base.ignore_patterns
        } else {
            overlay.ignore_patterns
        },
    }
}
