// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-contract
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Public-interface contract extraction.
//!
//! Parses a source file (the Python-style target-language subset), collects
//! its public surface — top-level functions, classes with public methods,
//! explicit exports, structural type annotations — canonicalizes each
//! category, and hashes the result into the 16-hex `interface_hash`.
//! Canonicalization sorts every category and normalizes whitespace, so two
//! files with textually different but semantically identical public
//! interfaces hash identically.

mod diff;
mod parse;

pub use diff::{ContractDiff, diff_contracts};

use std::path::Path;

use hc_core::{CoreError, ErrorKind, ExtractedContract, Phase};

/// Errors from contract extraction.
#[derive(Debug, thiserror::Error)]
pub enum ContractExtractError {
    /// The file could not be read.
    #[error("failed to read {path}: {reason}")]
    Io {
        /// The file that failed to read.
        path: String,
        /// The underlying I/O error text.
        reason: String,
    },

    /// The file is not in the extractor's language subset.
    #[error("unsupported source file: {path}")]
    Unsupported {
        /// The rejected file.
        path: String,
    },

    /// The file could not be parsed.
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// The unparseable file.
        path: String,
        /// What went wrong.
        reason: String,
    },
}

impl ContractExtractError {
    /// The file the error is about.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Io { path, .. } | Self::Unsupported { path } | Self::Parse { path, .. } => path,
        }
    }
}

impl From<ContractExtractError> for CoreError {
    fn from(err: ContractExtractError) -> Self {
        CoreError::new(
            ErrorKind::ContractExtractionFailed,
            Phase::Plan,
            err.to_string(),
        )
        .with_context("file", err.path().to_string())
    }
}

/// File extensions the extractor understands.
const SUPPORTED_EXTENSIONS: &[&str] = &["py", "pyi"];

/// Extract the public-interface contract of the file at `path`.
///
/// # Errors
///
/// - [`ContractExtractError::Unsupported`] for files outside the language
///   subset.
/// - [`ContractExtractError::Io`] when the file cannot be read.
/// - [`ContractExtractError::Parse`] when the source does not scan.
pub fn extract_contract(
    artifact_id: &str,
    path: &Path,
) -> Result<ExtractedContract, ContractExtractError> {
    let display = path.display().to_string();
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e));
    if !supported {
        return Err(ContractExtractError::Unsupported { path: display });
    }
    let source = std::fs::read_to_string(path).map_err(|e| ContractExtractError::Io {
        path: display.clone(),
        reason: e.to_string(),
    })?;
    extract_from_source(artifact_id, &display, &source)
}

/// Extract a contract from in-memory source.
///
/// # Errors
///
/// Returns [`ContractExtractError::Parse`] when the source does not scan
/// (unbalanced signature brackets, embedded NUL bytes).
///
/// # Examples
///
/// ```
/// let source = "def foo(x: int) -> int:\n    return x\n";
/// let contract = hc_contract::extract_from_source("lib", "lib.py", source).unwrap();
/// assert_eq!(contract.functions, vec!["foo(x: int) -> int"]);
/// assert_eq!(contract.interface_hash.len(), 16);
/// ```
pub fn extract_from_source(
    artifact_id: &str,
    path: &str,
    source: &str,
) -> Result<ExtractedContract, ContractExtractError> {
    let surface = parse::scan_source(source).map_err(|reason| ContractExtractError::Parse {
        path: path.to_string(),
        reason,
    })?;

    let mut functions = surface.functions;
    let mut classes = surface.classes;
    let mut exports = surface.exports;
    let mut type_signatures = surface.type_signatures;
    functions.sort();
    functions.dedup();
    classes.sort();
    classes.dedup();
    exports.sort();
    exports.dedup();
    type_signatures.sort();
    type_signatures.dedup();

    let interface_hash = interface_hash(&functions, &classes, &exports, &type_signatures);

    Ok(ExtractedContract {
        artifact_id: artifact_id.to_string(),
        file_path: path.to_string(),
        functions,
        classes,
        exports,
        type_signatures,
        interface_hash,
    })
}

/// Hash the canonical concatenation of the four sorted categories.
///
/// Categories are joined with a fixed separator so moving an entry between
/// categories always changes the hash.
#[must_use]
pub fn interface_hash(
    functions: &[String],
    classes: &[String],
    exports: &[String],
    type_signatures: &[String],
) -> String {
    let canonical = [functions, classes, exports, type_signatures]
        .map(|category| category.join("\n"))
        .join("\n--\n");
    hc_core::short_hash(canonical.as_bytes())
}
