// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The authoritative set of selected features.
//!
//! [`SelectionIndex`] owns an [`IndexSelection`] bitset and mirrors every
//! membership change into the selected flag of the [`FeatureStateStore`], so
//! the two records never disagree. All bulk operations validate their input
//! before touching anything: an invalid index fails the whole call.

use core::ops::Range;

use drawstate_selection::{IndexSelection, Iter, ModifySelectionMode};

use crate::error::StateError;
use crate::store::FeatureStateStore;

/// Set of selected feature indices, kept in sync with the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionIndex {
    bits: IndexSelection,
}

impl SelectionIndex {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty selection sized for `len` features.
    #[must_use]
    pub fn with_capacity(len: usize) -> Self {
        Self {
            bits: IndexSelection::with_capacity(len),
        }
    }

    /// Number of selected features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns `true` if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns `true` if `index` is selected.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.bits.contains(index)
    }

    /// Revision counter, bumped once per call that changes the selection.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.bits.revision()
    }

    /// Selected indices in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        self.bits.iter()
    }

    /// Selected indices inside `range` in ascending order.
    pub fn iter_range(&self, range: Range<usize>) -> Iter<'_> {
        self.bits.iter_range(range)
    }

    /// Number of selected indices inside `range`.
    #[must_use]
    pub fn count_range(&self, range: Range<usize>) -> usize {
        self.bits.count_range(range)
    }

    /// The underlying bitset.
    #[must_use]
    pub fn as_bits(&self) -> &IndexSelection {
        &self.bits
    }

    /// Collects `indices` into a candidate set, rejecting removed or unknown indices.
    pub(crate) fn candidates<I>(
        store: &FeatureStateStore,
        indices: I,
    ) -> Result<IndexSelection, StateError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut set = IndexSelection::new();
        for index in indices {
            if !store.is_live(index) {
                return Err(StateError::InvalidIndex { index });
            }
            set.insert(index);
        }
        Ok(set)
    }

    /// Selects `index`. Returns `true` if it was previously unselected.
    pub(crate) fn add(
        &mut self,
        store: &mut FeatureStateStore,
        index: usize,
    ) -> Result<bool, StateError> {
        if !store.is_live(index) {
            return Err(StateError::InvalidIndex { index });
        }
        Ok(self.bits.insert_with(index, &mut mirror(store)))
    }

    /// Selects every index in `indices`. Returns the number newly selected.
    ///
    /// Duplicates are ignored. Nothing changes if any index is invalid.
    pub(crate) fn add_range<I>(
        &mut self,
        store: &mut FeatureStateStore,
        indices: I,
    ) -> Result<usize, StateError>
    where
        I: IntoIterator<Item = usize>,
    {
        let candidates = Self::candidates(store, indices)?;
        Ok(self.apply(store, &candidates, ModifySelectionMode::Append))
    }

    /// Unselects `index`. Returns `true` if it was previously selected.
    pub(crate) fn remove(
        &mut self,
        store: &mut FeatureStateStore,
        index: usize,
    ) -> Result<bool, StateError> {
        if !store.is_live(index) {
            return Err(StateError::InvalidIndex { index });
        }
        Ok(self.bits.remove_with(index, &mut mirror(store)))
    }

    /// Unselects every index in `indices`. Returns `true` if anything changed.
    ///
    /// Nothing changes if any index is invalid.
    pub(crate) fn remove_range<I>(
        &mut self,
        store: &mut FeatureStateStore,
        indices: I,
    ) -> Result<bool, StateError>
    where
        I: IntoIterator<Item = usize>,
    {
        let candidates = Self::candidates(store, indices)?;
        Ok(self.apply(store, &candidates, ModifySelectionMode::Subtract) > 0)
    }

    /// Unselects everything. Returns the number unselected.
    pub(crate) fn clear(&mut self, store: &mut FeatureStateStore) -> usize {
        self.bits.clear_with(&mut mirror(store))
    }

    /// Flips the selection of every index in `indices`. Returns the number flipped.
    ///
    /// Nothing changes if any index is invalid.
    pub(crate) fn invert<I>(
        &mut self,
        store: &mut FeatureStateStore,
        indices: I,
    ) -> Result<usize, StateError>
    where
        I: IntoIterator<Item = usize>,
    {
        let candidates = Self::candidates(store, indices)?;
        Ok(self.bits.invert_with(&candidates, &mut mirror(store)))
    }

    /// Combines a candidate set built by [`candidates`](Self::candidates) with
    /// the selection.
    ///
    /// Returns the number of features whose selection changed.
    fn apply(
        &mut self,
        store: &mut FeatureStateStore,
        candidates: &IndexSelection,
        mode: ModifySelectionMode,
    ) -> usize {
        self.bits.combine_with(candidates, mode, &mut mirror(store))
    }

    /// Like [`apply`](Self::apply) restricted to `range`, reporting each changed index.
    pub(crate) fn apply_range_with(
        &mut self,
        store: &mut FeatureStateStore,
        candidates: &IndexSelection,
        mode: ModifySelectionMode,
        range: Range<usize>,
        on_change: &mut impl FnMut(usize),
    ) -> usize {
        self.bits.combine_range_with(
            candidates,
            mode,
            range,
            &mut |index: usize, selected: bool| {
                sync(store, index, selected);
                on_change(index);
            },
        )
    }

    /// Flips `candidates` inside `range`, reporting each changed index.
    pub(crate) fn invert_range_with(
        &mut self,
        store: &mut FeatureStateStore,
        candidates: &IndexSelection,
        range: Range<usize>,
        on_change: &mut impl FnMut(usize),
    ) -> usize {
        self.bits.invert_range_with(
            candidates,
            range,
            &mut |index: usize, selected: bool| {
                sync(store, index, selected);
                on_change(index);
            },
        )
    }

    /// Indices a combine or invert with `candidates` can change.
    pub(crate) fn affected_span(
        &self,
        candidates: &IndexSelection,
        op: Option<ModifySelectionMode>,
    ) -> Range<usize> {
        match op {
            Some(mode) => self.bits.affected_span(candidates, mode),
            None => candidates.bounds(),
        }
    }

    /// Drops `index` from the bitset without touching the store.
    pub(crate) fn forget(&mut self, index: usize) -> bool {
        self.bits.remove(index)
    }
}

fn mirror(store: &mut FeatureStateStore) -> impl FnMut(usize, bool) + '_ {
    move |index, selected| sync(store, index, selected)
}

fn sync(store: &mut FeatureStateStore, index: usize, selected: bool) {
    if !store.set_selected(index, selected) {
        let err = StateError::InconsistentState {
            index,
            selected_in_index: !selected,
        };
        debug_assert!(store.slot(index).is_none(), "{err}");
        log::warn!("{err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn store_with(n: usize) -> FeatureStateStore {
        let mut store = FeatureStateStore::new();
        for _ in 0..n {
            store.register();
        }
        store
    }

    #[test]
    fn add_and_remove_mirror_into_store() {
        let mut store = store_with(5);
        let mut sel = SelectionIndex::new();
        assert_eq!(sel.add(&mut store, 3), Ok(true));
        assert_eq!(sel.add(&mut store, 3), Ok(false));
        assert!(store.get(3).unwrap().selected);
        assert_eq!(store.selected_count(), 1);

        assert_eq!(sel.remove(&mut store, 3), Ok(true));
        assert!(!store.get(3).unwrap().selected);
        assert_eq!(sel.add(&mut store, 5), Err(StateError::InvalidIndex { index: 5 }));
    }

    #[test]
    fn invalid_bulk_input_changes_nothing() {
        let mut store = store_with(4);
        let mut sel = SelectionIndex::new();
        let rev = sel.revision();
        assert_eq!(
            sel.add_range(&mut store, [0, 1, 9]),
            Err(StateError::InvalidIndex { index: 9 })
        );
        assert!(sel.is_empty());
        assert_eq!(store.selected_count(), 0);
        assert_eq!(sel.revision(), rev);
    }

    #[test]
    fn invert_flips_membership() {
        let mut store = store_with(6);
        let mut sel = SelectionIndex::new();
        sel.add_range(&mut store, [0, 1]).unwrap();
        assert_eq!(sel.invert(&mut store, [1, 2]), Ok(2));
        assert_eq!(sel.iter().collect::<Vec<_>>(), [0, 2]);
        assert_eq!(store.selected_count(), 2);
        assert!(!store.get(1).unwrap().selected);
    }

    #[test]
    fn remove_range_reports_change() {
        let mut store = store_with(8);
        let mut sel = SelectionIndex::new();
        sel.add_range(&mut store, [2, 4, 6]).unwrap();
        assert_eq!(sel.remove_range(&mut store, [4, 5]), Ok(true));
        assert_eq!(sel.remove_range(&mut store, [4, 5]), Ok(false));
        assert_eq!(sel.iter().collect::<Vec<_>>(), [2, 6]);
        assert_eq!(store.selected_count(), 2);
    }

    #[test]
    fn clear_reports_count() {
        let mut store = store_with(100);
        let mut sel = SelectionIndex::new();
        sel.add_range(&mut store, (0..100).step_by(3)).unwrap();
        assert_eq!(sel.clear(&mut store), 34);
        assert_eq!(store.selected_count(), 0);
    }
}
