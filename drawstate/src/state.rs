// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-layer drawing state: store, chunks, selection and notifier together.

use alloc::vec::Vec;
use core::ops::Range;

use crate::chunk::ChunkAssigner;
use crate::config::{ChunkPolicy, StateConfig};
use crate::error::StateError;
use crate::filter::{Criteria, DrawingFilter, FilterScope, Query};
use crate::notify::{ChangeNotifier, ChangeSet, ListenerId};
use crate::selection::SelectionIndex;
use crate::store::FeatureStateStore;
use crate::types::{CategoryId, FeatureState};
use crate::view::FeatureSelection;

/// Drawing state of one layer's features.
///
/// Owns the [`FeatureStateStore`], the [`ChunkAssigner`], the [`SelectionIndex`]
/// and the store's [`ChangeNotifier`], and keeps them consistent. Every
/// mutating method is one logical operation: its changes reach listeners in a
/// single flush, unless a caller-opened batch is still in progress.
///
/// Not safe for concurrent mutation. Parallel readers should take a
/// [`snapshot`](Self::snapshot).
#[derive(Debug)]
pub struct DrawingState {
    pub(crate) store: FeatureStateStore,
    pub(crate) selection: SelectionIndex,
    pub(crate) chunks: ChunkAssigner,
    config: StateConfig,
}

impl Default for DrawingState {
    fn default() -> Self {
        Self::new(StateConfig::default())
    }
}

impl DrawingState {
    /// Creates an empty state.
    #[must_use]
    pub fn new(config: StateConfig) -> Self {
        Self {
            store: FeatureStateStore::new(),
            selection: SelectionIndex::new(),
            chunks: ChunkAssigner::new(config.chunk_policy),
            config,
        }
    }

    /// Creates a state holding `count` default features, chunked per `config`.
    ///
    /// Loading a dataset is not a user action, so no change is reported.
    #[must_use]
    pub fn with_features(count: usize, config: StateConfig) -> Self {
        let mut state = Self {
            store: FeatureStateStore::with_capacity(count),
            selection: SelectionIndex::with_capacity(count),
            chunks: ChunkAssigner::new(config.chunk_policy),
            config,
        };
        for _ in 0..count {
            state.store.register();
        }
        state.chunks.assign_all(&mut state.store, config.chunk_policy);
        state.store.notifier.discard();
        state
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> StateConfig {
        self.config
    }

    /// Whether the view currently allows selection.
    #[must_use]
    pub fn selection_enabled(&self) -> bool {
        self.config.selection_enabled
    }

    /// Enables or disables selection for [`ClearStates::True`](crate::ClearStates::True).
    pub fn set_selection_enabled(&mut self, enabled: bool) {
        self.config.selection_enabled = enabled;
    }

    /// Registers a new default feature and places it in a chunk.
    pub fn register(&mut self) -> usize {
        self.batched(|state| {
            let index = state.store.register();
            state
                .chunks
                .reassign_on_grow(&mut state.store, index..index + 1);
            index
        })
    }

    /// Registers `count` new default features. Returns their index range.
    pub fn register_many(&mut self, count: usize) -> Range<usize> {
        self.batched(|state| {
            let start = state.store.len();
            for _ in 0..count {
                state.store.register();
            }
            let range = start..state.store.len();
            state.chunks.reassign_on_grow(&mut state.store, range.clone());
            range
        })
    }

    /// Removes a feature, unselecting it first. Its index is never reused.
    pub fn remove(&mut self, index: usize) -> Result<FeatureState, StateError> {
        self.batched(|state| -> Result<FeatureState, StateError> {
            state.selection.remove(&mut state.store, index)?;
            state.store.remove(index)
        })
    }

    /// Drawing state of `index`.
    pub fn get(&self, index: usize) -> Result<FeatureState, StateError> {
        self.store.get(index)
    }

    /// Assigns a category to `index`. Returns `true` if it changed.
    pub fn set_category(
        &mut self,
        index: usize,
        category: Option<CategoryId>,
    ) -> Result<bool, StateError> {
        self.batched(|state| state.store.set_category(index, category))
    }

    /// Shows or hides `index`. Returns `true` if it changed.
    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<bool, StateError> {
        self.batched(|state| state.store.set_visible(index, visible))
    }

    /// Repartitions every feature under the configured chunk policy.
    pub fn assign_chunks(&mut self) {
        let policy = self.config.chunk_policy;
        self.batched(|state| state.chunks.assign_all(&mut state.store, policy));
    }

    /// Switches to `policy` and repartitions every feature.
    pub fn set_chunk_policy(&mut self, policy: ChunkPolicy) {
        self.config.chunk_policy = policy;
        self.assign_chunks();
    }

    /// The feature store.
    #[must_use]
    pub fn store(&self) -> &FeatureStateStore {
        &self.store
    }

    /// The selection index.
    #[must_use]
    pub fn selection_index(&self) -> &SelectionIndex {
        &self.selection
    }

    /// The chunk assigner.
    #[must_use]
    pub fn chunks(&self) -> &ChunkAssigner {
        &self.chunks
    }

    /// Query and count access.
    #[must_use]
    pub fn filter(&self) -> DrawingFilter<'_> {
        DrawingFilter::new(&self.store, &self.selection, &self.chunks)
    }

    /// Shorthand for `self.filter().query(criteria)`.
    #[must_use]
    pub fn query(&self, criteria: Criteria) -> Query<'_> {
        self.filter().query(criteria)
    }

    /// Shorthand for `self.filter().count(criteria)`.
    #[must_use]
    pub fn count(&self, criteria: Criteria) -> usize {
        self.filter().count(criteria)
    }

    /// Filter-level mutation over the features matching `criteria`.
    pub fn scope(&mut self, criteria: Criteria) -> FilterScope<'_> {
        FilterScope::new(self, criteria)
    }

    /// Selection operations.
    pub fn selection(&mut self) -> FeatureSelection<'_> {
        FeatureSelection::new(self)
    }

    /// The change notifier.
    #[must_use]
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.store.notifier
    }

    /// Registers a change listener.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeSet) + 'static,
    {
        self.store.notifier.subscribe(listener)
    }

    /// Removes a change listener.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.store.notifier.unsubscribe(id)
    }

    /// Opens a batch: operations coalesce until the matching [`end_batch`](Self::end_batch).
    pub fn begin_batch(&mut self) {
        self.store.notifier.begin_batch();
    }

    /// Closes a batch, flushing if it was the outermost one.
    pub fn end_batch(&mut self) -> Option<ChangeSet> {
        self.store.notifier.end_batch()
    }

    /// Flushes pending changes now, even inside a batch.
    pub fn flush(&mut self) -> ChangeSet {
        self.store.notifier.flush()
    }

    /// Checks that every feature's selected flag matches the selection index.
    ///
    /// Reports the first disagreement found.
    pub fn verify_consistency(&self) -> Result<(), StateError> {
        for index in self.selection.iter() {
            if !self.store.is_live(index) {
                return Err(StateError::InconsistentState {
                    index,
                    selected_in_index: true,
                });
            }
        }
        for (index, state) in self.store.iter() {
            let in_index = self.selection.contains(index);
            if state.selected != in_index {
                return Err(StateError::InconsistentState {
                    index,
                    selected_in_index: in_index,
                });
            }
        }
        Ok(())
    }

    /// Repairs disagreements between the store and the selection index.
    ///
    /// The selection index is trusted, except that removed features are dropped
    /// from it. Debug builds panic on the first disagreement; release builds log
    /// a warning per feature and heal. Returns the number of features healed.
    pub fn reconcile(&mut self) -> usize {
        let stale: Vec<usize> = self
            .selection
            .iter()
            .filter(|index| !self.store.is_live(*index))
            .collect();
        let mut healed = 0;
        for index in stale {
            report(StateError::InconsistentState {
                index,
                selected_in_index: true,
            });
            self.selection.forget(index);
            healed += 1;
        }
        for index in 0..self.store.len() {
            let Some(slot) = self.store.slot(index) else {
                continue;
            };
            let in_index = self.selection.contains(index);
            if slot.is_selected() != in_index {
                report(StateError::InconsistentState {
                    index,
                    selected_in_index: in_index,
                });
                self.store.set_selected(index, in_index);
                healed += 1;
            }
        }
        if healed > 0 && !self.store.notifier.is_batching() {
            self.store.notifier.flush();
        }
        healed
    }

    /// Immutable copy of the states in `range`, clamped to the index space.
    #[must_use]
    pub fn snapshot(&self, range: Range<usize>) -> StateSnapshot {
        let end = range.end.min(self.store.len());
        let start = range.start.min(end);
        StateSnapshot {
            start,
            states: (start..end).map(|index| self.store.get(index).ok()).collect(),
        }
    }

    /// Runs `f` as one logical operation, flushing at the end unless a batch is open.
    pub(crate) fn batched<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.store.notifier.begin_batch();
        let out = f(self);
        self.store.notifier.end_batch();
        out
    }
}

fn report(err: StateError) {
    if cfg!(debug_assertions) {
        panic!("{err}");
    }
    log::warn!("{err}; trusting the selection index");
}

/// Immutable copy of a range of feature states.
///
/// Snapshots own their data, so they can be sent to render threads while the
/// state keeps changing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    start: usize,
    states: Vec<Option<FeatureState>>,
}

impl StateSnapshot {
    /// The index range this snapshot covers.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.states.len()
    }

    /// Number of index slots covered, including removed features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if the snapshot covers no index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State of `index`, or `None` if outside the range or removed.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<FeatureState> {
        let at = index.checked_sub(self.start)?;
        self.states.get(at).copied().flatten()
    }

    /// Live features in the snapshot matching `criteria`, in ascending order.
    pub fn query(&self, criteria: Criteria) -> impl Iterator<Item = usize> + Clone + '_ {
        self.states
            .iter()
            .enumerate()
            .filter_map(move |(at, state)| {
                state
                    .filter(|s| criteria.matches(s))
                    .map(|_| self.start + at)
            })
    }

    /// Number of live features in the snapshot matching `criteria`.
    #[must_use]
    pub fn count(&self, criteria: Criteria) -> usize {
        self.query(criteria).count()
    }
}
