// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-cli
#![deny(unsafe_code)]
//!
//! Implementation of the `health` command-line driver.
//!
//! The binary in `main.rs` parses arguments and dispatches into
//! [`commands`]; rendering is split into [`format`] so `--json` output and
//! human output never mix.

/// Command implementations.
pub mod commands;
/// Output rendering.
pub mod format;

/// Exit code for success.
pub const EXIT_OK: i32 = 0;
/// Exit code for runtime errors.
pub const EXIT_RUNTIME_ERROR: i32 = 1;
/// Exit code for usage errors (clap exits with 2 on its own).
pub const EXIT_USAGE_ERROR: i32 = 2;
/// Exit code when a cascade was aborted.
pub const EXIT_CASCADE_ABORTED: i32 = 3;
/// Exit code when audit integrity verification failed.
pub const EXIT_AUDIT_FAILURE: i32 = 4;
