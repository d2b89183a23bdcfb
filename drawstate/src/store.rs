// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dense per-feature state storage.
//!
//! Features are identified by a stable index assigned at registration. The
//! store keeps one packed [`Slot`] per index and a set of counters maintained
//! incrementally on every transition, so that single-axis counts are O(1).
//!
//! Removal leaves a tombstone: indices are never reused, which keeps handles
//! held by the rendering engine and the selection bitset stable.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::error::StateError;
use crate::notify::ChangeNotifier;
use crate::types::{CategoryId, FeatureState, FilterType};

bitflags::bitflags! {
    /// Packed boolean state of a slot.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub(crate) struct SlotFlags: u8 {
        /// The feature is registered and not removed.
        const LIVE     = 0b0000_0001;
        /// The feature is selected.
        const SELECTED = 0b0000_0010;
        /// The feature is drawn.
        const VISIBLE  = 0b0000_0100;
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Slot {
    pub(crate) category: Option<CategoryId>,
    pub(crate) chunk: u32,
    pub(crate) flags: SlotFlags,
}

impl Slot {
    #[inline]
    pub(crate) fn is_live(&self) -> bool {
        self.flags.contains(SlotFlags::LIVE)
    }

    #[inline]
    pub(crate) fn is_selected(&self) -> bool {
        self.flags.contains(SlotFlags::SELECTED)
    }

    #[inline]
    pub(crate) fn is_visible(&self) -> bool {
        self.flags.contains(SlotFlags::VISIBLE)
    }

    fn state(&self) -> FeatureState {
        FeatureState {
            category: self.category,
            chunk: self.chunk,
            selected: self.is_selected(),
            visible: self.is_visible(),
        }
    }
}

/// Owns the drawing state of every feature and the counters derived from it.
///
/// Selection is only changed through [`SelectionIndex`](crate::SelectionIndex)
/// and chunks only through [`ChunkAssigner`](crate::ChunkAssigner); category and
/// visibility are set directly here.
#[derive(Debug, Default)]
pub struct FeatureStateStore {
    slots: Vec<Slot>,
    live: usize,
    selected: usize,
    visible: usize,
    categories: HashMap<Option<CategoryId>, usize>,
    chunk_live: Vec<usize>,
    pub(crate) notifier: ChangeNotifier,
}

impl FeatureStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for `capacity` features.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Size of the index space, including removed features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no index was ever registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of registered, not removed features.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of selected features.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.selected
    }

    /// Number of visible features.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible
    }

    /// Number of live features assigned `category`. `None` counts uncategorized features.
    #[must_use]
    pub fn category_count(&self, category: Option<CategoryId>) -> usize {
        self.categories.get(&category).copied().unwrap_or(0)
    }

    /// Number of live features in `chunk`.
    #[must_use]
    pub fn chunk_count(&self, chunk: u32) -> usize {
        self.chunk_live.get(chunk as usize).copied().unwrap_or(0)
    }

    /// Categories in use and their live feature counts, in no particular order.
    pub fn categories(&self) -> impl Iterator<Item = (Option<CategoryId>, usize)> + '_ {
        self.categories
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(c, n)| (*c, *n))
    }

    /// Returns `true` if `index` names a registered, not removed feature.
    #[must_use]
    pub fn is_live(&self, index: usize) -> bool {
        self.slot(index).is_some()
    }

    /// Returns the drawing state of `index`.
    pub fn get(&self, index: usize) -> Result<FeatureState, StateError> {
        self.slot(index)
            .map(Slot::state)
            .ok_or(StateError::InvalidIndex { index })
    }

    /// Live features and their states in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, FeatureState)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_live())
            .map(|(index, slot)| (index, slot.state()))
    }

    /// Assigns `category` to `index`. Returns `true` if the category changed.
    pub(crate) fn set_category(
        &mut self,
        index: usize,
        category: Option<CategoryId>,
    ) -> Result<bool, StateError> {
        let slot = self.live_slot_mut(index)?;
        let old = slot.category;
        if old == category {
            return Ok(false);
        }
        slot.category = category;
        self.uncount_category(old);
        *self.categories.entry(category).or_insert(0) += 1;
        self.notifier.record(index, FilterType::CATEGORY);
        Ok(true)
    }

    /// Shows or hides `index`. Returns `true` if visibility changed.
    pub(crate) fn set_visible(&mut self, index: usize, visible: bool) -> Result<bool, StateError> {
        let slot = self.live_slot_mut(index)?;
        if slot.is_visible() == visible {
            return Ok(false);
        }
        slot.flags.set(SlotFlags::VISIBLE, visible);
        if visible {
            self.visible += 1;
        } else {
            self.visible -= 1;
        }
        self.notifier.record(index, FilterType::VISIBLE);
        Ok(true)
    }

    /// Registers a new feature and returns its index.
    ///
    /// The feature starts uncategorized, unselected, visible, and in chunk 0
    /// until the chunk assigner places it.
    pub(crate) fn register(&mut self) -> usize {
        let index = self.slots.len();
        self.slots.push(Slot {
            category: None,
            chunk: 0,
            flags: SlotFlags::LIVE | SlotFlags::VISIBLE,
        });
        self.live += 1;
        self.visible += 1;
        *self.categories.entry(None).or_insert(0) += 1;
        self.count_chunk(0);
        self.notifier.record(index, FilterType::all());
        index
    }

    /// Tombstones `index`, returning its last state.
    pub(crate) fn remove(&mut self, index: usize) -> Result<FeatureState, StateError> {
        let slot = self.live_slot_mut(index)?;
        let old = *slot;
        slot.flags = SlotFlags::empty();
        self.live -= 1;
        if old.is_visible() {
            self.visible -= 1;
        }
        if old.is_selected() {
            self.selected -= 1;
        }
        self.uncount_category(old.category);
        self.chunk_live[old.chunk as usize] -= 1;
        self.notifier.record(index, FilterType::all());
        Ok(old.state())
    }

    /// Sets the selected flag. Returns `true` if it changed.
    ///
    /// Removed indices are left untouched.
    pub(crate) fn set_selected(&mut self, index: usize, selected: bool) -> bool {
        let Some(slot) = self.slots.get_mut(index).filter(|s| s.is_live()) else {
            return false;
        };
        if slot.is_selected() == selected {
            return false;
        }
        slot.flags.set(SlotFlags::SELECTED, selected);
        if selected {
            self.selected += 1;
        } else {
            self.selected -= 1;
        }
        self.notifier.record(index, FilterType::SELECTION);
        true
    }

    /// Moves `index` into `chunk`. Returns `true` if it changed.
    ///
    /// Removed indices are left untouched.
    pub(crate) fn set_chunk(&mut self, index: usize, chunk: u32) -> bool {
        let Some(old) = self
            .slots
            .get(index)
            .filter(|s| s.is_live())
            .map(|s| s.chunk)
        else {
            return false;
        };
        if old == chunk {
            return false;
        }
        self.slots[index].chunk = chunk;
        self.chunk_live[old as usize] -= 1;
        self.count_chunk(chunk);
        self.notifier.record(index, FilterType::CHUNK);
        true
    }

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index).filter(|s| s.is_live())
    }

    fn live_slot_mut(&mut self, index: usize) -> Result<&mut Slot, StateError> {
        self.slots
            .get_mut(index)
            .filter(|s| s.is_live())
            .ok_or(StateError::InvalidIndex { index })
    }

    fn count_chunk(&mut self, chunk: u32) {
        let at = chunk as usize;
        if self.chunk_live.len() <= at {
            self.chunk_live.resize(at + 1, 0);
        }
        self.chunk_live[at] += 1;
    }

    fn uncount_category(&mut self, category: Option<CategoryId>) {
        if let Some(n) = self.categories.get_mut(&category) {
            *n -= 1;
            if *n == 0 {
                self.categories.remove(&category);
            }
        }
    }
}
