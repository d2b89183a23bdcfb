// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: category handles, per-feature state, filter axes and selection tags.

use core::fmt;
use core::num::NonZeroU32;

/// Non-owning handle to a category descriptor.
///
/// Category descriptors (symbols, value ranges, unique values) are owned by the
/// classification engine. This crate only records which handle a feature was
/// assigned and filters on handle equality; it never creates, resolves, or
/// destroys descriptors.
///
/// The handle is niche-optimized, so `Option<CategoryId>` is four bytes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(NonZeroU32);

impl CategoryId {
    /// Creates a handle from the classification engine's category number.
    ///
    /// # Panics
    ///
    /// Panics if `id == u32::MAX`, which is reserved.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        match NonZeroU32::new(id.wrapping_add(1)) {
            Some(raw) => Self(raw),
            None => panic!("CategoryId u32::MAX is reserved"),
        }
    }

    /// Returns the category number this handle was created from.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CategoryId").field(&self.get()).finish()
    }
}

/// Drawing state of a single feature.
///
/// This is a by-value view; the store keeps a packed representation internally.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeatureState {
    /// Assigned category, or `None` if classification has not assigned one.
    pub category: Option<CategoryId>,
    /// Rendering chunk the feature belongs to.
    pub chunk: u32,
    /// Whether the feature is selected.
    pub selected: bool,
    /// Whether the feature is drawn.
    pub visible: bool,
}

impl Default for FeatureState {
    fn default() -> Self {
        Self {
            category: None,
            chunk: 0,
            selected: false,
            visible: true,
        }
    }
}

bitflags::bitflags! {
    /// Axes a drawing filter constrains. Axes not present match everything.
    ///
    /// Flags are ordered from outermost to innermost: filter-level mutations act
    /// on the innermost axis a scope names (see [`FilterType::innermost`]).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct FilterType: u8 {
        /// Match on category handle equality.
        const CATEGORY  = 0b0000_0001;
        /// Match on chunk equality.
        const CHUNK     = 0b0000_0010;
        /// Match on selection state.
        const SELECTION = 0b0000_0100;
        /// Match on visibility.
        const VISIBLE   = 0b0000_1000;
    }
}

impl FilterType {
    /// Returns the innermost axis in this set, if any.
    ///
    /// ```
    /// use drawstate::FilterType;
    ///
    /// let scope = FilterType::CATEGORY | FilterType::SELECTION;
    /// assert_eq!(scope.innermost(), Some(FilterType::SELECTION));
    /// assert_eq!(FilterType::empty().innermost(), None);
    /// ```
    #[must_use]
    pub fn innermost(self) -> Option<Self> {
        if self.is_empty() {
            return None;
        }
        let top = u8::BITS - 1 - self.bits().leading_zeros();
        Some(Self::from_bits_truncate(1 << top))
    }
}

/// Geometry predicate used to turn a region into candidate features.
///
/// This crate never evaluates the predicate itself; the tag is passed through
/// to the [`FeatureGeometry`](crate::FeatureGeometry) collaborator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum SelectionMode {
    /// The feature's envelope overlaps the region.
    #[default]
    IntersectsExtent,
    /// The feature's geometry intersects the region.
    Intersects,
    /// The region fully contains the feature.
    Contains,
    /// The feature fully contains the region.
    Within,
    /// The feature does not touch the region.
    Disjoint,
}

/// Three-valued override for clearing a selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ClearStates {
    /// Never clear.
    #[default]
    False,
    /// Clear only if selection is enabled for the view.
    True,
    /// Always clear.
    Force,
}

impl ClearStates {
    /// Whether a clear should happen for a view with the given `selection_enabled` flag.
    #[must_use]
    pub const fn should_clear(self, selection_enabled: bool) -> bool {
        match self {
            Self::False => false,
            Self::True => selection_enabled,
            Self::Force => true,
        }
    }
}

/// Anything that can name a feature by its stable index.
pub trait FeatureHandle {
    /// The feature's index in the store.
    fn feature_index(&self) -> usize;
}

impl FeatureHandle for usize {
    #[inline]
    fn feature_index(&self) -> usize {
        *self
    }
}

impl FeatureHandle for u32 {
    #[inline]
    fn feature_index(&self) -> usize {
        *self as usize
    }
}

impl<T: FeatureHandle + ?Sized> FeatureHandle for &T {
    #[inline]
    fn feature_index(&self) -> usize {
        (**self).feature_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_id_round_trips_and_packs() {
        let id = CategoryId::new(0);
        assert_eq!(id.get(), 0);
        assert_eq!(CategoryId::new(41).get(), 41);
        assert_eq!(size_of::<Option<CategoryId>>(), 4);
    }

    #[test]
    fn innermost_picks_highest_axis() {
        assert_eq!(
            (FilterType::CHUNK | FilterType::VISIBLE).innermost(),
            Some(FilterType::VISIBLE)
        );
        assert_eq!(FilterType::CATEGORY.innermost(), Some(FilterType::CATEGORY));
        assert_eq!(FilterType::all().innermost(), Some(FilterType::VISIBLE));
    }

    #[test]
    fn clear_states_honor_enabled_flag() {
        assert!(!ClearStates::False.should_clear(true));
        assert!(ClearStates::True.should_clear(true));
        assert!(!ClearStates::True.should_clear(false));
        assert!(ClearStates::Force.should_clear(false));
    }

    #[test]
    fn default_state_is_visible_and_unselected() {
        let state = FeatureState::default();
        assert!(state.visible);
        assert!(!state.selected);
        assert_eq!(state.category, None);
    }
}
