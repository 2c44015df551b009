// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-verify
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Verification: wave checks and integration wiring.
//!
//! The wave verifier runs four independent checks (tests, types, lint,
//! contracts) and folds them into a [`hc_core::WaveConfidence`]. A missing
//! or failing *tool* is never a failing *check* — absence of a verification
//! signal is not a negative one — but every skipped check is recorded so
//! the audit log captures the gap.
//!
//! The integration verifier is independent of the cascade: it checks that
//! every declared wiring (import/call/route/config/inherit/register)
//! actually exists in source, and detects stubbed-out implementations.

/// Integration wiring checks.
pub mod integration;
/// Stub detection.
pub mod stubs;
/// Wave verification.
pub mod wave;

pub use integration::{IntegrationResult, TaskVerificationResult, verify_integration, verify_task_complete};
pub use stubs::{StubKind, StubLocation, detect_stubs};
pub use wave::{SkippedCheck, Toolchain, TouchedArtifact, WaveVerification, verify_wave};
