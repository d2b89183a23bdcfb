// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing filters: conjunctive predicates over category, chunk, selection and
//! visibility.
//!
//! A [`Criteria`] names the axes to constrain; unconstrained axes match
//! everything. [`DrawingFilter`] answers queries and counts against the store
//! and picks the narrowest source to scan:
//!
//! - a chunk constraint limits the scan to that chunk's index range;
//! - `selected == true` walks the selection bitset instead of every index;
//! - single-axis counts come straight from the store's counters.
//!
//! [`FilterScope`] applies filter-level mutations to the innermost axis a
//! criteria constrains.

use alloc::vec::Vec;
use core::iter::FusedIterator;
use core::ops::Range;

use drawstate_selection::Iter;

use crate::chunk::ChunkAssigner;
use crate::error::StateError;
use crate::selection::SelectionIndex;
use crate::state::DrawingState;
use crate::store::{FeatureStateStore, Slot};
use crate::types::{CategoryId, FeatureState, FilterType};

/// Conjunction of per-axis constraints.
///
/// ```
/// use drawstate::{CategoryId, Criteria, FilterType};
///
/// let criteria = Criteria::new().category(CategoryId::new(3)).selected(true);
/// assert_eq!(criteria.filter_type(), FilterType::CATEGORY | FilterType::SELECTION);
/// assert!(Criteria::new().is_unconstrained());
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Criteria {
    category: Option<Option<CategoryId>>,
    chunk: Option<u32>,
    selected: Option<bool>,
    visible: Option<bool>,
}

impl Criteria {
    /// Criteria that match every live feature.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            category: None,
            chunk: None,
            selected: None,
            visible: None,
        }
    }

    /// Constrains to features assigned `category`.
    #[must_use]
    pub const fn category(mut self, category: CategoryId) -> Self {
        self.category = Some(Some(category));
        self
    }

    /// Constrains to features without a category.
    #[must_use]
    pub const fn uncategorized(mut self) -> Self {
        self.category = Some(None);
        self
    }

    /// Constrains to features in `chunk`.
    #[must_use]
    pub const fn chunk(mut self, chunk: u32) -> Self {
        self.chunk = Some(chunk);
        self
    }

    /// Constrains on selection state.
    #[must_use]
    pub const fn selected(mut self, selected: bool) -> Self {
        self.selected = Some(selected);
        self
    }

    /// Constrains on visibility.
    #[must_use]
    pub const fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// The constrained axes.
    #[must_use]
    pub fn filter_type(&self) -> FilterType {
        let mut axes = FilterType::empty();
        axes.set(FilterType::CATEGORY, self.category.is_some());
        axes.set(FilterType::CHUNK, self.chunk.is_some());
        axes.set(FilterType::SELECTION, self.selected.is_some());
        axes.set(FilterType::VISIBLE, self.visible.is_some());
        axes
    }

    /// Returns `true` if no axis is constrained.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.filter_type().is_empty()
    }

    /// The category constraint: `Some(None)` means uncategorized.
    #[must_use]
    pub fn category_constraint(&self) -> Option<Option<CategoryId>> {
        self.category
    }

    /// The chunk constraint.
    #[must_use]
    pub fn chunk_constraint(&self) -> Option<u32> {
        self.chunk
    }

    /// The selection constraint.
    #[must_use]
    pub fn selected_constraint(&self) -> Option<bool> {
        self.selected
    }

    /// The visibility constraint.
    #[must_use]
    pub fn visible_constraint(&self) -> Option<bool> {
        self.visible
    }

    /// Returns `true` if `state` satisfies every constrained axis.
    #[must_use]
    pub fn matches(&self, state: &FeatureState) -> bool {
        self.category.is_none_or(|c| c == state.category)
            && self.chunk.is_none_or(|c| c == state.chunk)
            && self.selected.is_none_or(|s| s == state.selected)
            && self.visible.is_none_or(|v| v == state.visible)
    }

    #[inline]
    pub(crate) fn matches_slot(&self, slot: &Slot) -> bool {
        self.category.is_none_or(|c| c == slot.category)
            && self.chunk.is_none_or(|c| c == slot.chunk)
            && self.selected.is_none_or(|s| s == slot.is_selected())
            && self.visible.is_none_or(|v| v == slot.is_visible())
    }
}

/// Read-only query and count access over a store.
#[derive(Copy, Clone, Debug)]
pub struct DrawingFilter<'a> {
    store: &'a FeatureStateStore,
    selection: &'a SelectionIndex,
    chunks: &'a ChunkAssigner,
}

impl<'a> DrawingFilter<'a> {
    /// Creates a filter over the given records.
    #[must_use]
    pub fn new(
        store: &'a FeatureStateStore,
        selection: &'a SelectionIndex,
        chunks: &'a ChunkAssigner,
    ) -> Self {
        Self {
            store,
            selection,
            chunks,
        }
    }

    /// Live features matching `criteria`, in ascending index order.
    ///
    /// The query is lazy; clone it to iterate again from the same position.
    #[must_use]
    pub fn query(&self, criteria: Criteria) -> Query<'a> {
        let span = self.span(&criteria);
        let source = if criteria.selected == Some(true) {
            Source::Selected(self.selection.iter_range(span))
        } else {
            Source::Span(span)
        };
        Query {
            store: self.store,
            criteria,
            source,
        }
    }

    /// Number of live features matching `criteria`.
    ///
    /// Always equal to the length of [`query`](Self::query) for the same criteria.
    #[must_use]
    pub fn count(&self, criteria: Criteria) -> usize {
        let store = self.store;
        let Criteria {
            category,
            chunk,
            selected,
            visible,
        } = criteria;
        match (category, chunk, selected, visible) {
            (None, None, None, None) => store.live_count(),
            (Some(c), None, None, None) => store.category_count(c),
            (None, Some(c), None, None) => store.chunk_count(c),
            (None, None, Some(true), None) => store.selected_count(),
            (None, None, Some(false), None) => store.live_count() - store.selected_count(),
            (None, None, None, Some(true)) => store.visible_count(),
            (None, None, None, Some(false)) => store.live_count() - store.visible_count(),
            (None, Some(_), Some(true), None) => self.selection.count_range(self.span(&criteria)),
            _ => self.query(criteria).count(),
        }
    }

    /// Returns `true` if `index` is live and matches `criteria`.
    #[must_use]
    pub fn contains(&self, criteria: Criteria, index: usize) -> bool {
        self.store
            .slot(index)
            .is_some_and(|slot| criteria.matches_slot(slot))
    }

    fn span(&self, criteria: &Criteria) -> Range<usize> {
        let len = self.store.len();
        match criteria.chunk {
            Some(chunk) => self
                .chunks
                .chunk_range(chunk)
                .map_or(0..0, |r| r.start.min(len)..r.end.min(len)),
            None => 0..len,
        }
    }
}

#[derive(Clone, Debug)]
enum Source<'a> {
    Span(Range<usize>),
    Selected(Iter<'a>),
}

/// Lazy ascending iterator over features matching a [`Criteria`].
#[derive(Clone, Debug)]
pub struct Query<'a> {
    store: &'a FeatureStateStore,
    criteria: Criteria,
    source: Source<'a>,
}

impl Query<'_> {
    /// The criteria this query evaluates.
    #[must_use]
    pub fn criteria(&self) -> Criteria {
        self.criteria
    }
}

impl Iterator for Query<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            let index = match &mut self.source {
                Source::Span(span) => span.next()?,
                Source::Selected(iter) => iter.next()?,
            };
            if self
                .store
                .slot(index)
                .is_some_and(|slot| self.criteria.matches_slot(slot))
            {
                return Some(index);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.source {
            Source::Span(span) => (0, Some(span.len())),
            Source::Selected(_) => (0, Some(self.store.selected_count())),
        }
    }
}

impl FusedIterator for Query<'_> {}

/// Filter-level mutation over the features matching a [`Criteria`].
///
/// Mutations act on the innermost constrained axis: adding a feature gives it
/// the criteria's value on that axis, removing it takes that value away. Chunk
/// membership is owned by the chunk assigner, so a scope whose innermost axis is
/// the chunk, or that constrains nothing, cannot be mutated.
#[derive(Debug)]
pub struct FilterScope<'a> {
    state: &'a mut DrawingState,
    criteria: Criteria,
}

impl<'a> FilterScope<'a> {
    pub(crate) fn new(state: &'a mut DrawingState, criteria: Criteria) -> Self {
        Self { state, criteria }
    }

    /// The scope's criteria.
    #[must_use]
    pub fn criteria(&self) -> Criteria {
        self.criteria
    }

    /// The axis mutations act on.
    pub fn innermost(&self) -> Result<FilterType, StateError> {
        let filter = self.criteria.filter_type();
        match filter.innermost() {
            Some(axis) if axis != FilterType::CHUNK => Ok(axis),
            _ => Err(StateError::InvalidScope { filter }),
        }
    }

    /// Returns `true` if `index` is live and inside the scope.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.state.filter().contains(self.criteria, index)
    }

    /// Number of features inside the scope.
    #[must_use]
    pub fn count(&self) -> usize {
        self.state.filter().count(self.criteria)
    }

    /// Gives `index` the scope's value on the innermost axis.
    ///
    /// Returns `true` if the feature changed.
    pub fn add(&mut self, index: usize) -> Result<bool, StateError> {
        let axis = self.innermost()?;
        let criteria = self.criteria;
        self.state
            .batched(|state| set_axis(state, criteria, axis, index, true))
    }

    /// Takes the scope's value on the innermost axis away from `index`.
    ///
    /// Features outside the scope are left alone. Returns `true` if the feature
    /// changed.
    pub fn remove(&mut self, index: usize) -> Result<bool, StateError> {
        let axis = self.innermost()?;
        if !self.state.store.is_live(index) {
            return Err(StateError::InvalidIndex { index });
        }
        if !self.contains(index) {
            return Ok(false);
        }
        let criteria = self.criteria;
        self.state
            .batched(|state| set_axis(state, criteria, axis, index, false))
    }

    /// Removes every feature from the scope. Returns the number changed.
    pub fn clear(&mut self) -> Result<usize, StateError> {
        let axis = self.innermost()?;
        let criteria = self.criteria;
        let members: Vec<usize> = self.state.filter().query(criteria).collect();
        self.state.batched(|state| -> Result<usize, StateError> {
            let mut changed = 0;
            for index in members {
                changed += usize::from(set_axis(state, criteria, axis, index, false)?);
            }
            Ok(changed)
        })
    }
}

fn set_axis(
    state: &mut DrawingState,
    criteria: Criteria,
    axis: FilterType,
    index: usize,
    member: bool,
) -> Result<bool, StateError> {
    if axis == FilterType::CATEGORY {
        let target = match criteria.category {
            Some(category) if member => category,
            _ => None,
        };
        state.store.set_category(index, target)
    } else if axis == FilterType::SELECTION {
        if criteria.selected.unwrap_or(true) == member {
            state.selection.add(&mut state.store, index)
        } else {
            state.selection.remove(&mut state.store, index)
        }
    } else if axis == FilterType::VISIBLE {
        let visible = criteria.visible.unwrap_or(true) == member;
        state.store.set_visible(index, visible)
    } else {
        Err(StateError::InvalidScope {
            filter: criteria.filter_type(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkPolicy, StateConfig};
    use drawstate_selection::ModifySelectionMode;

    fn state(n: usize, chunk: usize) -> DrawingState {
        DrawingState::with_features(
            n,
            StateConfig::default().with_chunk_policy(ChunkPolicy::FixedSize(chunk)),
        )
    }

    #[test]
    fn query_and_count_agree_on_mixed_criteria() {
        let mut s = state(20, 6);
        let red = CategoryId::new(1);
        for i in (0..20).step_by(2) {
            s.set_category(i, Some(red)).unwrap();
        }
        s.selection()
            .select_indices([1, 2, 3, 4, 13], ModifySelectionMode::Append)
            .unwrap();
        s.set_visible(4, false).unwrap();
        s.remove(3).unwrap();

        let cases = [
            Criteria::new(),
            Criteria::new().category(red),
            Criteria::new().uncategorized(),
            Criteria::new().chunk(0),
            Criteria::new().chunk(3),
            Criteria::new().chunk(9),
            Criteria::new().selected(true),
            Criteria::new().selected(false),
            Criteria::new().visible(false),
            Criteria::new().chunk(0).selected(true),
            Criteria::new().category(red).selected(true).visible(true),
        ];
        let filter = s.filter();
        for c in cases {
            assert_eq!(filter.query(c).count(), filter.count(c), "{c:?}");
        }
        assert_eq!(
            filter.query(Criteria::new().chunk(0).selected(true)).collect::<Vec<_>>(),
            [1, 2, 4]
        );
        assert_eq!(filter.count(Criteria::new()), 19);
    }

    #[test]
    fn empty_and_all_invisible_counts() {
        let s = state(0, 4);
        assert_eq!(s.filter().count(Criteria::new()), 0);
        assert_eq!(s.filter().query(Criteria::new().visible(true)).count(), 0);

        let mut s = state(5, 4);
        for i in 0..5 {
            s.set_visible(i, false).unwrap();
        }
        let visible = Criteria::new().visible(true);
        assert_eq!(s.filter().count(visible), 0);
        assert_eq!(s.filter().query(visible).next(), None);
    }

    #[test]
    fn query_is_restartable_via_clone() {
        let s = state(5, 2);
        let mut q = s.filter().query(Criteria::new());
        assert_eq!(q.next(), Some(0));
        let fork = q.clone();
        assert_eq!(q.collect::<Vec<_>>(), [1, 2, 3, 4]);
        assert_eq!(fork.collect::<Vec<_>>(), [1, 2, 3, 4]);
    }

    #[test]
    fn scope_mutates_innermost_axis() {
        let mut s = state(6, 3);
        let red = CategoryId::new(7);
        let mut scope = s.scope(Criteria::new().category(red));
        assert_eq!(scope.innermost(), Ok(FilterType::CATEGORY));
        assert_eq!(scope.add(1), Ok(true));
        assert_eq!(scope.add(2), Ok(true));
        assert_eq!(scope.count(), 2);
        assert_eq!(scope.remove(1), Ok(true));
        assert_eq!(scope.remove(0), Ok(false));
        assert_eq!(s.get(1).unwrap().category, None);

        let mut selected_red = s.scope(Criteria::new().category(red).selected(true));
        assert_eq!(selected_red.innermost(), Ok(FilterType::SELECTION));
        assert_eq!(selected_red.add(2), Ok(true));
        assert_eq!(selected_red.clear(), Ok(1));
        assert!(s.selection_index().is_empty());
        assert_eq!(s.store().selected_count(), 0);
    }

    #[test]
    fn hidden_scope_hides_on_add() {
        let mut s = state(4, 4);
        let mut hidden = s.scope(Criteria::new().visible(false));
        assert_eq!(hidden.add(3), Ok(true));
        assert_eq!(hidden.count(), 1);
        assert_eq!(hidden.clear(), Ok(1));
        assert_eq!(s.store().visible_count(), 4);
    }

    #[test]
    fn chunk_and_empty_scopes_are_rejected() {
        let mut s = state(4, 2);
        let mut by_chunk = s.scope(Criteria::new().category(CategoryId::new(0)).chunk(1));
        assert_eq!(
            by_chunk.add(0),
            Err(StateError::InvalidScope {
                filter: FilterType::CATEGORY | FilterType::CHUNK
            })
        );
        let mut everything = s.scope(Criteria::new());
        assert_eq!(
            everything.clear(),
            Err(StateError::InvalidScope {
                filter: FilterType::empty()
            })
        );
    }
}
