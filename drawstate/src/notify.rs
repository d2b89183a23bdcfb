// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batched change notification.
//!
//! Every mutation records which features changed and on which axes. Records are
//! coalesced per feature until they are flushed, either explicitly or at the end
//! of the outermost batch, and the flushed [`ChangeSet`] is handed to every
//! subscribed listener. A listener therefore sees one event per operation, not
//! one per feature.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use kurbo::Rect;

use crate::types::FilterType;

/// Identifies a listener registered with [`ChangeNotifier::subscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u32);

/// A flushed batch of changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<(usize, FilterType)>,
    envelope: Option<Rect>,
}

impl ChangeSet {
    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Changed features and the axes that changed, in ascending index order.
    #[must_use]
    pub fn changes(&self) -> &[(usize, FilterType)] {
        &self.changes
    }

    /// Changed feature indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.changes.iter().map(|(index, _)| *index)
    }

    /// Axes that changed for `index`, or `None` if it did not change.
    #[must_use]
    pub fn axes_of(&self, index: usize) -> Option<FilterType> {
        self.changes
            .binary_search_by_key(&index, |(i, _)| *i)
            .ok()
            .map(|at| self.changes[at].1)
    }

    /// Union of all axes that changed in this batch.
    #[must_use]
    pub fn axes(&self) -> FilterType {
        self.changes
            .iter()
            .fold(FilterType::empty(), |acc, (_, axes)| acc | *axes)
    }

    /// Screen-space area that needs repainting, if known.
    #[must_use]
    pub fn envelope(&self) -> Option<Rect> {
        self.envelope
    }
}

type Listener = Box<dyn FnMut(&ChangeSet)>;

/// Coalesces per-feature changes and notifies listeners.
pub struct ChangeNotifier {
    pending: HashMap<usize, FilterType>,
    envelope: Option<Rect>,
    depth: u32,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u32,
    generation: u64,
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("pending", &self.pending.len())
            .field("envelope", &self.envelope)
            .field("depth", &self.depth)
            .field("listeners", &self.listeners.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    /// Creates a notifier with no listeners and nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            envelope: None,
            depth: 0,
            listeners: Vec::new(),
            next_listener: 0,
            generation: 0,
        }
    }

    /// Records that `axes` changed for `index`.
    pub fn record(&mut self, index: usize, axes: FilterType) {
        *self.pending.entry(index).or_insert(FilterType::empty()) |= axes;
    }

    /// Grows the pending repaint area by `rect`.
    pub fn include_envelope(&mut self, rect: Rect) {
        self.envelope = Some(match self.envelope {
            Some(env) => env.union(rect),
            None => rect,
        });
    }

    /// Returns `true` if `index` has unflushed changes.
    #[must_use]
    pub fn is_pending(&self, index: usize) -> bool {
        self.pending.contains_key(&index)
    }

    /// Number of features with unflushed changes.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Opens a batch. Batches nest; only the outermost [`end_batch`](Self::end_batch) flushes.
    pub fn begin_batch(&mut self) {
        self.depth += 1;
    }

    /// Closes a batch, flushing when the outermost batch ends.
    ///
    /// Returns the flushed set, or `None` if a batch is still open. An unmatched
    /// call is ignored.
    pub fn end_batch(&mut self) -> Option<ChangeSet> {
        if self.depth == 0 {
            log::warn!("end_batch without matching begin_batch");
            return None;
        }
        self.depth -= 1;
        (self.depth == 0).then(|| self.flush())
    }

    /// Returns `true` while a batch is open.
    #[must_use]
    pub fn is_batching(&self) -> bool {
        self.depth > 0
    }

    /// Takes every pending change and notifies listeners if there were any.
    ///
    /// Changes are returned in ascending index order.
    pub fn flush(&mut self) -> ChangeSet {
        let mut changes: Vec<_> = self.pending.drain().collect();
        changes.sort_unstable_by_key(|(index, _)| *index);
        let set = ChangeSet {
            changes,
            envelope: self.envelope.take(),
        };
        if !set.is_empty() {
            self.generation = self.generation.wrapping_add(1);
            log::trace!(
                "flushing {} changed features to {} listeners",
                set.len(),
                self.listeners.len()
            );
            for (_, listener) in &mut self.listeners {
                listener(&set);
            }
        }
        set
    }

    /// Drops pending changes without notifying anyone.
    pub fn discard(&mut self) {
        self.pending.clear();
        self.envelope = None;
    }

    /// Number of non-empty flushes so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Registers a listener called with every non-empty flushed [`ChangeSet`].
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeSet) + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener = self.next_listener.wrapping_add(1);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }
}
