// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=drawstate --heading-base-level=0

//! Drawstate: per-feature drawing state, selection and drawing filters.
//!
//! This crate tracks how every feature of a large vector layer should be drawn
//! (its category, its rendering chunk, whether it is selected, whether it is
//! visible) and answers the questions a renderer asks every frame: _which
//! visible features are in chunk 3?_, _how many features are selected?_
//!
//! It is split into a handful of cooperating parts, all owned by a
//! [`DrawingState`]:
//!
//! - [`FeatureStateStore`]: dense per-feature state behind stable indices,
//!   with incrementally maintained counters.
//! - [`ChunkAssigner`]: contiguous index ranges the renderer draws and
//!   invalidates as units.
//! - [`SelectionIndex`]: the authoritative selected set, a bitset mirrored into
//!   each feature's `selected` flag.
//! - [`DrawingFilter`]: lazy queries and counts over category, chunk,
//!   selection and visibility.
//! - [`FeatureSelection`]: region, predicate and explicit selection with the
//!   four [`ModifySelectionMode`]s, reporting the changed screen area.
//! - [`ChangeNotifier`]: coalesces changes and notifies listeners once per
//!   logical operation.
//!
//! Geometry is not owned here. Region selection asks a [`FeatureGeometry`]
//! collaborator for candidates; [`EnvelopeTable`] is a simple implementation
//! over axis-aligned envelopes.
//!
//! ## Example
//!
//! ```rust
//! use drawstate::{
//!     ChunkPolicy, ClearStates, Criteria, DrawingState, ModifySelectionMode, StateConfig,
//! };
//!
//! let config = StateConfig::default().with_chunk_policy(ChunkPolicy::FixedSize(4));
//! let mut state = DrawingState::with_features(10, config);
//! assert_eq!(state.chunks().chunks().collect::<Vec<_>>(), [0..4, 4..8, 8..10]);
//!
//! state
//!     .selection()
//!     .select_indices([1, 5, 9], ModifySelectionMode::Append)
//!     .unwrap();
//! assert_eq!(state.count(Criteria::new().selected(true)), 3);
//!
//! // Selected features in the last chunk.
//! let hits: Vec<_> = state.query(Criteria::new().chunk(2).selected(true)).collect();
//! assert_eq!(hits, [9]);
//!
//! state.selection().clear(ClearStates::Force);
//! assert_eq!(state.count(Criteria::new().selected(true)), 0);
//! assert!(state.store().iter().all(|(_, feature)| !feature.selected));
//! ```
//!
//! ## Region selection
//!
//! ```rust
//! use drawstate::{DrawingState, EnvelopeTable, ModifySelectionMode, SelectionMode, StateConfig};
//! use kurbo::Rect;
//!
//! let mut state = DrawingState::with_features(3, StateConfig::default());
//! let mut envelopes = EnvelopeTable::new();
//! envelopes.set(0, Rect::new(0.0, 0.0, 1.0, 1.0));
//! envelopes.set(1, Rect::new(5.0, 5.0, 6.0, 6.0));
//! envelopes.set(2, Rect::new(0.5, 0.5, 2.0, 2.0));
//!
//! let region = Rect::new(0.0, 0.0, 3.0, 3.0);
//! let changed = state
//!     .selection()
//!     .select_by_region(&envelopes, region, SelectionMode::Contains, ModifySelectionMode::Replace)
//!     .unwrap();
//! assert_eq!(changed, Some(Rect::new(0.0, 0.0, 2.0, 2.0)));
//!
//! // Nothing changes the second time, so there is nothing to repaint.
//! let again = state
//!     .selection()
//!     .select_by_region(&envelopes, region, SelectionMode::Contains, ModifySelectionMode::Replace)
//!     .unwrap();
//! assert_eq!(again, None);
//! ```
//!
//! The state is single-threaded. Renderers that draw in parallel take a
//! [`StateSnapshot`] of the index ranges they need.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod category;
mod chunk;
mod config;
mod error;
mod filter;
mod geometry;
mod notify;
mod selection;
mod state;
mod store;
mod types;
mod view;

pub use category::{FieldMatch, FieldMatches, Matchable, find_category};
pub use chunk::ChunkAssigner;
pub use config::{ChunkPolicy, DEFAULT_CHUNK_SIZE, StateConfig};
pub use error::{RegionError, StateError};
pub use filter::{Criteria, DrawingFilter, FilterScope, Query};
pub use geometry::{EnvelopeTable, FeatureGeometry, GeometryError};
pub use notify::{ChangeNotifier, ChangeSet, ListenerId};
pub use selection::SelectionIndex;
pub use state::{DrawingState, StateSnapshot};
pub use store::FeatureStateStore;
pub use types::{CategoryId, ClearStates, FeatureHandle, FeatureState, FilterType, SelectionMode};
pub use view::FeatureSelection;

pub use drawstate_selection::{IndexSelection, Iter as SelectionIter, ModifySelectionMode};
