// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use core::fmt;

use kurbo::Rect;

use crate::types::FilterType;

/// Errors reported by state, selection and filter operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StateError {
    /// The index is out of range or names a removed feature.
    InvalidIndex {
        /// The offending index.
        index: usize,
    },
    /// A feature's selected flag disagrees with the selection index.
    InconsistentState {
        /// The feature whose records disagree.
        index: usize,
        /// Membership according to the selection index.
        selected_in_index: bool,
    },
    /// A filter-level mutation was attempted on a scope that cannot be mutated.
    InvalidScope {
        /// The scope's constrained axes.
        filter: FilterType,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIndex { index } => write!(f, "invalid feature index {index}"),
            Self::InconsistentState {
                index,
                selected_in_index,
            } => write!(
                f,
                "feature {index} selected flag disagrees with selection index (index says {selected_in_index})"
            ),
            Self::InvalidScope { filter } => {
                write!(f, "filter scope {filter:?} has no mutable innermost axis")
            }
        }
    }
}

impl core::error::Error for StateError {}

/// Errors reported by region-based selection.
///
/// `E` is the error type of the [`FeatureGeometry`](crate::FeatureGeometry) collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum RegionError<E> {
    /// The geometry collaborator failed to produce candidates.
    Geometry(E),
    /// A candidate was rejected before the selection was touched.
    State(StateError),
    /// The operation was cancelled between chunk-sized batches.
    ///
    /// Batches applied before cancellation stay applied and consistent.
    Cancelled {
        /// Union of the envelopes of features changed before cancellation.
        changed: Option<Rect>,
    },
}

impl<E> From<StateError> for RegionError<E> {
    fn from(err: StateError) -> Self {
        Self::State(err)
    }
}

impl<E: fmt::Display> fmt::Display for RegionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry(err) => write!(f, "geometry query failed: {err}"),
            Self::State(err) => write!(f, "{err}"),
            Self::Cancelled { .. } => f.write_str("region selection cancelled"),
        }
    }
}

impl<E> core::error::Error for RegionError<E>
where
    E: core::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Geometry(err) => Some(err),
            Self::State(err) => Some(err),
            Self::Cancelled { .. } => None,
        }
    }
}
