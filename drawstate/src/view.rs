// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! User-facing selection operations.
//!
//! [`FeatureSelection`] is the view the UI talks to. Every call is one logical
//! operation: changes are coalesced and flushed to listeners once, at the end.
//!
//! Region selection proceeds in four steps:
//!
//! 1. ask the [`FeatureGeometry`] collaborator for candidates,
//! 2. validate them against the store, so a bad index changes nothing,
//! 3. combine them with the selection per [`ModifySelectionMode`], a chunk at a
//!    time,
//! 4. report the union of the envelopes of the features that actually changed.

use drawstate_selection::{IndexSelection, Iter, ModifySelectionMode};
use kurbo::Rect;

use crate::error::{RegionError, StateError};
use crate::geometry::FeatureGeometry;
use crate::selection::SelectionIndex;
use crate::state::DrawingState;
use crate::types::{ClearStates, FeatureHandle, FeatureState, SelectionMode};

#[derive(Copy, Clone, Debug)]
enum Op {
    Combine(ModifySelectionMode),
    Invert,
}

impl Op {
    fn mode(self) -> Option<ModifySelectionMode> {
        match self {
            Self::Combine(mode) => Some(mode),
            Self::Invert => None,
        }
    }
}

/// Outcome of an uncancelled batched apply: features changed and their envelope.
type Applied = (usize, Option<Rect>);

fn no_envelope(_: usize) -> Option<Rect> {
    None
}

fn never() -> bool {
    false
}

/// Selection operations over a [`DrawingState`].
#[derive(Debug)]
pub struct FeatureSelection<'a> {
    state: &'a mut DrawingState,
}

impl<'a> FeatureSelection<'a> {
    pub(crate) fn new(state: &'a mut DrawingState) -> Self {
        Self { state }
    }

    /// Number of selected features.
    #[must_use]
    pub fn count(&self) -> usize {
        self.state.selection.len()
    }

    /// Returns `true` if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.selection.is_empty()
    }

    /// Selected indices in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        self.state.selection.iter()
    }

    /// Returns `true` if `feature` is selected.
    pub fn contains<H: FeatureHandle>(&self, feature: H) -> Result<bool, StateError> {
        let index = feature.feature_index();
        if !self.state.store.is_live(index) {
            return Err(StateError::InvalidIndex { index });
        }
        Ok(self.state.selection.contains(index))
    }

    /// Selects `feature`. Returns `true` if it was previously unselected.
    pub fn add<H: FeatureHandle>(&mut self, feature: H) -> Result<bool, StateError> {
        let index = feature.feature_index();
        self.state
            .batched(|state| state.selection.add(&mut state.store, index))
    }

    /// Unselects `feature`. Returns `true` if it was previously selected.
    pub fn remove<H: FeatureHandle>(&mut self, feature: H) -> Result<bool, StateError> {
        let index = feature.feature_index();
        self.state
            .batched(|state| state.selection.remove(&mut state.store, index))
    }

    /// Selects every index in `indices`. Returns the number newly selected.
    ///
    /// Nothing changes if any index is invalid.
    pub fn add_range<I>(&mut self, indices: I) -> Result<usize, StateError>
    where
        I: IntoIterator<Item = usize>,
    {
        self.state
            .batched(|state| state.selection.add_range(&mut state.store, indices))
    }

    /// Unselects every index in `indices`. Returns `true` if anything changed.
    ///
    /// Nothing changes if any index is invalid.
    pub fn remove_range<I>(&mut self, indices: I) -> Result<bool, StateError>
    where
        I: IntoIterator<Item = usize>,
    {
        self.state
            .batched(|state| state.selection.remove_range(&mut state.store, indices))
    }

    /// Flips the selection of every index in `candidates`.
    ///
    /// Returns the number of features flipped. Nothing changes if any candidate
    /// is invalid.
    pub fn invert_indices<I>(&mut self, candidates: I) -> Result<usize, StateError>
    where
        I: IntoIterator<Item = usize>,
    {
        self.state
            .batched(|state| state.selection.invert(&mut state.store, candidates))
    }

    /// Clears the selection if `clear` allows it for this view.
    ///
    /// Returns the number of features unselected.
    pub fn clear(&mut self, clear: ClearStates) -> usize {
        if !clear.should_clear(self.state.selection_enabled()) {
            return 0;
        }
        self.state
            .batched(|state| state.selection.clear(&mut state.store))
    }

    /// Selects every live feature. Returns the number newly selected.
    pub fn select_all(&mut self) -> usize {
        let candidates: IndexSelection = self.state.store.iter().map(|(index, _)| index).collect();
        let (changed, _) =
            self.run_uncancelled(&candidates, Op::Combine(ModifySelectionMode::Append));
        changed
    }

    /// Combines explicit candidates with the selection.
    ///
    /// Returns the number of features whose selection changed. Nothing changes
    /// if any candidate is invalid.
    pub fn select_indices<I>(
        &mut self,
        candidates: I,
        modify: ModifySelectionMode,
    ) -> Result<usize, StateError>
    where
        I: IntoIterator<Item = usize>,
    {
        let candidates = SelectionIndex::candidates(&self.state.store, candidates)?;
        let (changed, _) = self.run_uncancelled(&candidates, Op::Combine(modify));
        Ok(changed)
    }

    /// Combines the live features accepted by `predicate` with the selection.
    ///
    /// Returns the number of features whose selection changed.
    pub fn select_where<F>(&mut self, mut predicate: F, modify: ModifySelectionMode) -> usize
    where
        F: FnMut(usize, &FeatureState) -> bool,
    {
        let candidates: IndexSelection = self
            .state
            .store
            .iter()
            .filter(|(index, state)| predicate(*index, state))
            .map(|(index, _)| index)
            .collect();
        let (changed, _) = self.run_uncancelled(&candidates, Op::Combine(modify));
        changed
    }

    /// Selects features by region.
    ///
    /// Returns the union of the envelopes of features whose selection changed,
    /// or `None` if nothing changed.
    pub fn select_by_region<G>(
        &mut self,
        geometry: &G,
        envelope: Rect,
        mode: SelectionMode,
        modify: ModifySelectionMode,
    ) -> Result<Option<Rect>, RegionError<G::Error>>
    where
        G: FeatureGeometry + ?Sized,
    {
        self.select_by_region_cancellable(geometry, envelope, mode, modify, never)
    }

    /// Like [`select_by_region`](Self::select_by_region), checking `cancel`
    /// before each chunk-sized batch.
    ///
    /// On cancellation the batches already applied stay applied, the selection
    /// stays consistent, and [`RegionError::Cancelled`] reports what changed.
    pub fn select_by_region_cancellable<G, C>(
        &mut self,
        geometry: &G,
        envelope: Rect,
        mode: SelectionMode,
        modify: ModifySelectionMode,
        mut cancel: C,
    ) -> Result<Option<Rect>, RegionError<G::Error>>
    where
        G: FeatureGeometry + ?Sized,
        C: FnMut() -> bool,
    {
        let candidates = self.region_candidates(geometry, envelope, mode)?;
        let envelope_of = |index: usize| geometry.feature_envelope(index);
        let (changed, dirty) = self
            .run(&candidates, Op::Combine(modify), &envelope_of, &mut cancel)
            .map_err(|changed| RegionError::Cancelled { changed })?;
        log::debug!(
            "select_by_region {mode:?}/{modify:?}: {} candidates, {changed} changed",
            candidates.len()
        );
        Ok(dirty)
    }

    /// Flips the selection of every feature whose envelope intersects `envelope`.
    ///
    /// Returns the union of the envelopes of the flipped features.
    pub fn invert_selection<G>(
        &mut self,
        geometry: &G,
        envelope: Rect,
    ) -> Result<Option<Rect>, RegionError<G::Error>>
    where
        G: FeatureGeometry + ?Sized,
    {
        self.invert_selection_with(geometry, envelope, SelectionMode::IntersectsExtent)
    }

    /// Like [`invert_selection`](Self::invert_selection) with an explicit predicate.
    pub fn invert_selection_with<G>(
        &mut self,
        geometry: &G,
        envelope: Rect,
        mode: SelectionMode,
    ) -> Result<Option<Rect>, RegionError<G::Error>>
    where
        G: FeatureGeometry + ?Sized,
    {
        let candidates = self.region_candidates(geometry, envelope, mode)?;
        let envelope_of = |index: usize| geometry.feature_envelope(index);
        let (changed, dirty) = self
            .run(&candidates, Op::Invert, &envelope_of, &mut never)
            .map_err(|changed| RegionError::Cancelled { changed })?;
        log::debug!("invert_selection {mode:?}: {changed} changed");
        Ok(dirty)
    }

    /// Union of the envelopes of every selected feature.
    #[must_use]
    pub fn selection_envelope<G>(&self, geometry: &G) -> Option<Rect>
    where
        G: FeatureGeometry + ?Sized,
    {
        self.state
            .selection
            .iter()
            .filter_map(|index| geometry.feature_envelope(index))
            .reduce(|acc, r| acc.union(r))
    }

    fn region_candidates<G>(
        &self,
        geometry: &G,
        envelope: Rect,
        mode: SelectionMode,
    ) -> Result<IndexSelection, RegionError<G::Error>>
    where
        G: FeatureGeometry + ?Sized,
    {
        let indices = geometry
            .candidates_intersecting(envelope, mode)
            .map_err(RegionError::Geometry)?;
        Ok(SelectionIndex::candidates(&self.state.store, indices)?)
    }

    fn run_uncancelled(&mut self, candidates: &IndexSelection, op: Op) -> Applied {
        match self.run(candidates, op, &no_envelope, &mut never) {
            Ok(applied) => applied,
            Err(dirty) => (0, dirty),
        }
    }

    /// Applies `op` in chunk-sized batches over the chunks it can affect.
    ///
    /// Returns the envelope changed so far as the error if `cancel` fires.
    fn run(
        &mut self,
        candidates: &IndexSelection,
        op: Op,
        envelope_of: &dyn Fn(usize) -> Option<Rect>,
        cancel: &mut dyn FnMut() -> bool,
    ) -> Result<Applied, Option<Rect>> {
        let state = &mut *self.state;
        let batch = state.chunks.chunk_size().max(1);
        let span = state.selection.affected_span(candidates, op.mode());
        let end = span.end.min(state.store.len());
        let mut changed = 0;
        let mut dirty: Option<Rect> = None;
        let mut cancelled = false;

        state.store.notifier.begin_batch();
        let mut start = span.start - span.start % batch;
        while start < end {
            if cancel() {
                cancelled = true;
                break;
            }
            let range = start..end.min(start.saturating_add(batch));
            start = range.end;
            let mut on_change = |index: usize| {
                if let Some(r) = envelope_of(index) {
                    dirty = Some(dirty.map_or(r, |d| d.union(r)));
                }
            };
            changed += match op {
                Op::Combine(mode) => state.selection.apply_range_with(
                    &mut state.store,
                    candidates,
                    mode,
                    range,
                    &mut on_change,
                ),
                Op::Invert => state.selection.invert_range_with(
                    &mut state.store,
                    candidates,
                    range,
                    &mut on_change,
                ),
            };
        }
        if let Some(rect) = dirty {
            state.store.notifier.include_envelope(rect);
        }
        state.store.notifier.end_batch();

        if cancelled {
            log::debug!("selection cancelled after {changed} changes");
            return Err(dirty);
        }
        Ok((changed, dirty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkPolicy, StateConfig};
    use crate::geometry::EnvelopeTable;
    use alloc::vec::Vec;

    fn state(n: usize, chunk: usize) -> DrawingState {
        DrawingState::with_features(
            n,
            StateConfig::default().with_chunk_policy(ChunkPolicy::FixedSize(chunk)),
        )
    }

    fn diagonal(n: usize) -> EnvelopeTable {
        let mut table = EnvelopeTable::new();
        for i in 0..n {
            let x = i as f64;
            table.set(i, Rect::new(x, x, x + 0.5, x + 0.5));
        }
        table
    }

    #[test]
    fn invert_indices_flips_and_mirrors() {
        let mut s = state(8, 4);
        s.selection()
            .select_indices([1, 2], ModifySelectionMode::Replace)
            .unwrap();

        assert_eq!(s.selection().invert_indices([2, 3, 6]), Ok(3));
        assert_eq!(s.selection().iter().collect::<Vec<_>>(), [1, 3, 6]);
        assert!(s.get(3).unwrap().selected);
        assert!(!s.get(2).unwrap().selected);
        assert_eq!(s.verify_consistency(), Ok(()));
    }

    #[test]
    fn invert_indices_rejects_unknown_indices() {
        let mut s = state(4, 4);
        s.remove(1).unwrap();
        let rev = s.selection_index().revision();

        assert_eq!(
            s.selection().invert_indices([0, 7]),
            Err(StateError::InvalidIndex { index: 7 })
        );
        assert_eq!(
            s.selection().invert_indices([1]),
            Err(StateError::InvalidIndex { index: 1 })
        );
        assert!(s.selection().is_empty());
        assert_eq!(s.selection_index().revision(), rev);
        assert_eq!(s.store().selected_count(), 0);
    }

    #[test]
    fn add_and_remove_ranges() {
        let mut s = state(10, 4);
        assert_eq!(s.selection().add_range([2, 4, 4, 9]), Ok(3));
        assert_eq!(
            s.selection().add_range([2, 11]),
            Err(StateError::InvalidIndex { index: 11 })
        );
        assert_eq!(s.selection().count(), 3);

        assert_eq!(s.selection().remove_range([4, 5]), Ok(true));
        assert_eq!(s.selection().remove_range([4, 5]), Ok(false));
        assert_eq!(s.selection().iter().collect::<Vec<_>>(), [2, 9]);
        assert_eq!(s.store().selected_count(), 2);
    }

    #[test]
    fn region_batches_start_at_the_affected_chunk() {
        let mut s = state(1_000, 10);
        let geometry = diagonal(1_000);
        let region = Rect::new(990.0, 990.0, 1_000.0, 1_000.0);

        let mut checks = 0;
        let changed = s
            .selection()
            .select_by_region_cancellable(
                &geometry,
                region,
                SelectionMode::IntersectsExtent,
                ModifySelectionMode::Append,
                || {
                    checks += 1;
                    false
                },
            )
            .unwrap();

        // Candidates 990..1000 sit in bitset word 15, which starts at 960.
        assert_eq!(checks, 4);
        assert_eq!(changed, Some(Rect::new(990.0, 990.0, 999.5, 999.5)));
        let selected: Vec<_> = s.selection().iter().collect();
        assert_eq!(selected, (990..1_000).collect::<Vec<_>>());
    }

    #[test]
    fn sparse_edit_on_a_large_layer_touches_one_feature() {
        let mut s = state(100_000, 1_000);
        s.begin_batch();
        let mut selection = s.selection();
        assert_eq!(selection.select_indices([99_999], ModifySelectionMode::Append), Ok(1));
        assert_eq!(selection.select_indices([99_999], ModifySelectionMode::Subtract), Ok(1));
        let set = s.end_batch().unwrap();
        assert_eq!(set.indices().collect::<Vec<_>>(), [99_999]);
        assert!(s.selection_index().as_bits().bounds().is_empty());
    }
}
