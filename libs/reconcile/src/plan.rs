//! Diff between desired and actual pool membership.

use crate::AddressSet;

/// Addresses to attach and detach in one reconciliation pass.
///
/// Recomputed every run; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Desired but not attached.
    pub to_add: AddressSet,

    /// Attached but no longer desired.
    pub to_remove: AddressSet,
}

impl ReconciliationPlan {
    /// Compute `desired - actual` and `actual - desired`.
    pub fn diff(desired: &AddressSet, actual: &AddressSet) -> Self {
        Self {
            to_add: desired.difference(actual),
            to_remove: actual.difference(desired),
        }
    }

    /// True when actual already matches desired.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Number of mutating calls the plan will issue.
    pub fn mutation_count(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}
