// SPDX-License-Identifier: MIT OR Apache-2.0
//! Category-level diffing between two contracts.
//!
//! Used for audit details and human-readable CLI output; the compatibility
//! *decision* lives on [`ExtractedContract::is_compatible_with`].

use hc_core::ExtractedContract;
use serde::{Deserialize, Serialize};

/// Entries added and removed per category between two contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDiff {
    /// Functions present only in the newer contract.
    pub added_functions: Vec<String>,
    /// Functions present only in the older contract.
    pub removed_functions: Vec<String>,
    /// Classes present only in the newer contract.
    pub added_classes: Vec<String>,
    /// Classes present only in the older contract.
    pub removed_classes: Vec<String>,
    /// Exports present only in the newer contract.
    pub added_exports: Vec<String>,
    /// Exports present only in the older contract.
    pub removed_exports: Vec<String>,
    /// Type signatures present only in the newer contract.
    pub added_types: Vec<String>,
    /// Type signatures present only in the older contract.
    pub removed_types: Vec<String>,
}

impl ContractDiff {
    /// `true` when the two contracts have identical surfaces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_functions.is_empty()
            && self.removed_functions.is_empty()
            && self.added_classes.is_empty()
            && self.removed_classes.is_empty()
            && self.added_exports.is_empty()
            && self.removed_exports.is_empty()
            && self.added_types.is_empty()
            && self.removed_types.is_empty()
    }

    /// Total number of changed entries across every category.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.added_functions.len()
            + self.removed_functions.len()
            + self.added_classes.len()
            + self.removed_classes.len()
            + self.added_exports.len()
            + self.removed_exports.len()
            + self.added_types.len()
            + self.removed_types.len()
    }
}

/// Diff `older` against `newer`, category by category.
///
/// Both inputs hold sorted categories, so the outputs are sorted too.
#[must_use]
pub fn diff_contracts(older: &ExtractedContract, newer: &ExtractedContract) -> ContractDiff {
    let only_in = |a: &[String], b: &[String]| -> Vec<String> {
        a.iter().filter(|x| !b.contains(x)).cloned().collect()
    };

    ContractDiff {
        added_functions: only_in(&newer.functions, &older.functions),
        removed_functions: only_in(&older.functions, &newer.functions),
        added_classes: only_in(&newer.classes, &older.classes),
        removed_classes: only_in(&older.classes, &newer.classes),
        added_exports: only_in(&newer.exports, &older.exports),
        removed_exports: only_in(&older.exports, &newer.exports),
        added_types: only_in(&newer.type_signatures, &older.type_signatures),
        removed_types: only_in(&older.type_signatures, &newer.type_signatures),
    }
}
