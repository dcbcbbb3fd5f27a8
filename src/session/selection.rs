//! Per-feature selection flags.

use std::collections::BTreeSet;

/// Set of selected feature indices, bounded by the current feature count.
///
/// Indices outside `0..len` are never stored, so the set always refers into
/// the feature list it was created for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: BTreeSet<usize>,
    len: usize,
}

impl Selection {
    /// Creates an empty selection over `len` features.
    #[must_use]
    pub const fn new(len: usize) -> Self {
        Self {
            selected: BTreeSet::new(),
            len,
        }
    }

    /// Clears every flag and rebinds to a feature list of `len` entries.
    pub fn reset(&mut self, len: usize) {
        self.selected.clear();
        self.len = len;
    }

    /// Flips the flag at `index`.
    ///
    /// Returns the new state, or `None` when `index` is out of range (in which
    /// case nothing changes).
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        if self.selected.remove(&index) {
            Some(false)
        } else {
            self.selected.insert(index);
            Some(true)
        }
    }

    /// Whether the feature at `index` is selected.
    #[must_use]
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Selected indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    /// Number of selected features.
    #[must_use]
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    /// True when nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Number of features the selection ranges over.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }
}
