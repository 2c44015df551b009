// SPDX-License-Identifier: MIT OR Apache-2.0
//! Extracted public-interface contracts.
//!
//! A contract is an immutable, canonicalized snapshot of a file's public
//! surface. Contracts captured at preview time are frozen for the lifetime
//! of a cascade; the wave verifier compares regenerated files against them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a file's public interface.
///
/// All category vectors are sorted lexicographically and rendered with
/// normalized whitespace, so two files with textually different but
/// semantically identical public interfaces produce equal hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedContract {
    /// The artifact the contract was extracted for.
    pub artifact_id: String,
    /// The file that was parsed.
    pub file_path: String,
    /// Canonical public function signatures, sorted.
    pub functions: Vec<String>,
    /// Public classes as `"Name: method1, method2, ..."`, sorted.
    pub classes: Vec<String>,
    /// Explicitly exported names, sorted.
    pub exports: Vec<String>,
    /// Key public type annotations, sorted.
    pub type_signatures: Vec<String>,
    /// 16-hex prefix of the SHA-256 over the canonical concatenation.
    pub interface_hash: String,
}

impl ExtractedContract {
    /// Backward-compatibility check: is `self` (the frozen contract)
    /// preserved by `current` (the re-extracted contract)?
    ///
    /// `self` is compatible with `current` iff every frozen function and
    /// export still exists in `current`, and every frozen class still exists
    /// with at least the frozen public methods. `current` may add new
    /// surface freely; dropping or renaming breaks compatibility.
    ///
    /// # Examples
    ///
    /// ```
    /// use hc_core::ExtractedContract;
    ///
    /// let frozen = ExtractedContract {
    ///     artifact_id: "lib".into(),
    ///     file_path: "lib.py".into(),
    ///     functions: vec!["foo(x: int) -> int".into()],
    ///     classes: vec![],
    ///     exports: vec!["foo".into()],
    ///     type_signatures: vec![],
    ///     interface_hash: "0000000000000000".into(),
    /// };
    /// let mut current = frozen.clone();
    /// current.functions.push("bar() -> None".into());
    /// assert!(frozen.is_compatible_with(&current)); // additions are fine
    ///
    /// current.functions.clear();
    /// assert!(!frozen.is_compatible_with(&current)); // drops are not
    /// ```
    #[must_use]
    pub fn is_compatible_with(&self, current: &Self) -> bool {
        let subset =
            |a: &[String], b: &[String]| a.iter().all(|item| b.iter().any(|other| other == item));

        if !subset(&self.functions, &current.functions) {
            return false;
        }
        if !subset(&self.exports, &current.exports) {
            return false;
        }

        for frozen_class in &self.classes {
            let (name, frozen_methods) = parse_class_entry(frozen_class);
            let Some(current_class) = current
                .classes
                .iter()
                .find(|c| parse_class_entry(c).0 == name)
            else {
                return false;
            };
            let (_, current_methods) = parse_class_entry(current_class);
            if !frozen_methods
                .iter()
                .all(|m| current_methods.contains(m))
            {
                return false;
            }
        }
        true
    }

    /// Total number of public surface elements across all categories.
    #[must_use]
    pub fn surface_len(&self) -> usize {
        self.functions.len() + self.classes.len() + self.exports.len() + self.type_signatures.len()
    }
}

/// Split a canonical class entry `"Name: m1, m2"` into name and methods.
///
/// An entry without methods (`"Name"` or `"Name:"`) yields an empty list.
fn parse_class_entry(entry: &str) -> (&str, Vec<&str>) {
    match entry.split_once(':') {
        Some((name, methods)) => (
            name.trim(),
            methods
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .collect(),
        ),
        None => (entry.trim(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(functions: &[&str], classes: &[&str], exports: &[&str]) -> ExtractedContract {
        ExtractedContract {
            artifact_id: "a".into(),
            file_path: "a.py".into(),
            functions: functions.iter().map(|s| s.to_string()).collect(),
            classes: classes.iter().map(|s| s.to_string()).collect(),
            exports: exports.iter().map(|s| s.to_string()).collect(),
            type_signatures: vec![],
            interface_hash: "0123456789abcdef".into(),
        }
    }

    #[test]
    fn identical_contracts_are_compatible() {
        let c = contract(&["foo(x: int) -> int"], &["User: save, load"], &["foo"]);
        assert!(c.is_compatible_with(&c.clone()));
    }

    #[test]
    fn superset_is_compatible() {
        let frozen = contract(&["foo(x: int) -> int"], &[], &["foo"]);
        let current = contract(&["bar() -> None", "foo(x: int) -> int"], &[], &["bar", "foo"]);
        assert!(frozen.is_compatible_with(&current));
    }

    #[test]
    fn dropped_function_is_incompatible() {
        let frozen = contract(&["foo(x: int) -> int"], &[], &["foo"]);
        let current = contract(&[], &[], &["foo"]);
        assert!(!frozen.is_compatible_with(&current));
    }

    #[test]
    fn dropped_export_is_incompatible() {
        let frozen = contract(&["foo(x: int) -> int"], &[], &["foo"]);
        let current = contract(&["foo(x: int) -> int"], &[], &[]);
        assert!(!frozen.is_compatible_with(&current));
    }

    #[test]
    fn dropped_class_method_is_incompatible() {
        let frozen = contract(&[], &["User: load, save"], &[]);
        let renamed = contract(&[], &["User: load"], &[]);
        assert!(!frozen.is_compatible_with(&renamed));

        let grown = contract(&[], &["User: delete, load, save"], &[]);
        assert!(frozen.is_compatible_with(&grown));
    }

    #[test]
    fn missing_class_is_incompatible() {
        let frozen = contract(&[], &["User: load"], &[]);
        let current = contract(&[], &["Account: load"], &[]);
        assert!(!frozen.is_compatible_with(&current));
    }

    #[test]
    fn class_entry_parsing_handles_bare_names() {
        assert_eq!(parse_class_entry("User"), ("User", vec![]));
        assert_eq!(parse_class_entry("User:"), ("User", vec![]));
        assert_eq!(
            parse_class_entry("User: load, save"),
            ("User", vec!["load", "save"])
        );
    }
}
