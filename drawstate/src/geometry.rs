// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The geometry collaborator seam and a simple envelope-based implementation.
//!
//! Region selection needs two things from geometry: the candidate features for
//! a region under a [`SelectionMode`], and each feature's envelope so that the
//! changed screen area can be reported. [`FeatureGeometry`] captures exactly
//! that; spatial indexing and exact predicates belong to the implementor.
//!
//! [`EnvelopeTable`] is a ready-made implementation that evaluates every mode
//! against axis-aligned envelopes, either by a flat scan or through a uniform
//! grid.

use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use kurbo::Rect;
use smallvec::SmallVec;

use crate::types::SelectionMode;

/// Source of candidate features and feature envelopes.
pub trait FeatureGeometry {
    /// Error returned when a query cannot be answered.
    type Error;

    /// Indices of the features matching `envelope` under `mode`.
    ///
    /// Order and duplicates do not matter to callers.
    fn candidates_intersecting(
        &self,
        envelope: Rect,
        mode: SelectionMode,
    ) -> Result<Vec<usize>, Self::Error>;

    /// Envelope of one feature, or `None` if it has no geometry.
    fn feature_envelope(&self, index: usize) -> Option<Rect>;
}

/// Errors reported by [`EnvelopeTable`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GeometryError {
    /// The query envelope has non-finite coordinates or negative extent.
    DegenerateEnvelope(Rect),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateEnvelope(rect) => write!(f, "degenerate query envelope {rect:?}"),
        }
    }
}

impl core::error::Error for GeometryError {}

/// Envelopes spanning more grid cells than this are kept in a side list.
const MAX_LINKED_CELLS: i64 = 1_024;

/// Feature envelopes indexed by feature index.
///
/// Every [`SelectionMode`] is evaluated on envelopes, so
/// [`SelectionMode::Intersects`] behaves like [`SelectionMode::IntersectsExtent`].
/// Edges are inclusive: touching envelopes intersect. Envelopes are stored with
/// ordered corners.
#[derive(Clone, Debug, Default)]
pub struct EnvelopeTable {
    envelopes: Vec<Option<Rect>>,
    grid: Option<Grid>,
}

#[derive(Clone)]
struct Grid {
    cell_size: f64,
    cells: HashMap<(i32, i32), SmallVec<[usize; 8]>>,
    /// Indices whose envelopes cover more than `MAX_LINKED_CELLS` cells.
    oversized: Vec<usize>,
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("cell_size", &self.cell_size)
            .field("cells", &self.cells.len())
            .field("oversized", &self.oversized.len())
            .finish_non_exhaustive()
    }
}

impl EnvelopeTable {
    /// Creates an empty table answered by flat scans.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table that buckets envelopes into square cells of `cell_size`.
    ///
    /// Non-positive or non-finite sizes fall back to flat scans.
    #[must_use]
    pub fn with_grid(cell_size: f64) -> Self {
        let grid = (cell_size.is_finite() && cell_size > 0.0).then(|| Grid {
            cell_size,
            cells: HashMap::new(),
            oversized: Vec::new(),
        });
        Self {
            envelopes: Vec::new(),
            grid,
        }
    }

    /// Number of index slots, including features without an envelope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    /// Returns `true` if no envelope was ever set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    /// Envelope of `index`, if set.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Rect> {
        self.envelopes.get(index).copied().flatten()
    }

    /// Sets the envelope of `index`, replacing any previous one.
    pub fn set(&mut self, index: usize, envelope: Rect) {
        let envelope = envelope.abs();
        if self.envelopes.len() <= index {
            self.envelopes.resize(index + 1, None);
        }
        let old = self.envelopes[index].replace(envelope);
        if let Some(grid) = &mut self.grid {
            if let Some(old) = old {
                grid.unlink(index, old);
            }
            grid.link(index, envelope);
        }
    }

    /// Clears the envelope of `index`. Returns the previous envelope.
    pub fn remove(&mut self, index: usize) -> Option<Rect> {
        let old = self.envelopes.get_mut(index)?.take()?;
        if let Some(grid) = &mut self.grid {
            grid.unlink(index, old);
        }
        Some(old)
    }

    /// Union of every envelope in the table.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        self.envelopes
            .iter()
            .flatten()
            .copied()
            .reduce(|acc, r| acc.union(r))
    }

    /// Candidate indices in ascending order.
    fn query(&self, region: Rect, mode: SelectionMode) -> Vec<usize> {
        let hit = |index: &usize| {
            self.get(*index)
                .is_some_and(|env| mode_matches(mode, region, env))
        };
        match (&self.grid, mode) {
            (Some(grid), m) if m != SelectionMode::Disjoint => {
                let mut out: Vec<usize> = grid.near(region).filter(hit).collect();
                out.sort_unstable();
                out.dedup();
                out
            }
            _ => (0..self.envelopes.len()).filter(hit).collect(),
        }
    }
}

impl FeatureGeometry for EnvelopeTable {
    type Error = GeometryError;

    fn candidates_intersecting(
        &self,
        envelope: Rect,
        mode: SelectionMode,
    ) -> Result<Vec<usize>, GeometryError> {
        if is_degenerate(envelope) {
            return Err(GeometryError::DegenerateEnvelope(envelope));
        }
        Ok(self.query(envelope, mode))
    }

    fn feature_envelope(&self, index: usize) -> Option<Rect> {
        self.get(index)
    }
}

type CellRange = (i32, i32, i32, i32);

impl Grid {
    fn cell_range(&self, rect: Rect) -> CellRange {
        let (x0, x1) = ordered(
            cell_coord(rect.x0, self.cell_size),
            cell_coord(rect.x1, self.cell_size),
        );
        let (y0, y1) = ordered(
            cell_coord(rect.y0, self.cell_size),
            cell_coord(rect.y1, self.cell_size),
        );
        (x0, y0, x1, y1)
    }

    fn link(&mut self, index: usize, rect: Rect) {
        let range = self.cell_range(rect);
        if cell_count(range) > MAX_LINKED_CELLS {
            self.oversized.push(index);
            return;
        }
        let (x0, y0, x1, y1) = range;
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                self.cells.entry((cx, cy)).or_default().push(index);
            }
        }
    }

    fn unlink(&mut self, index: usize, rect: Rect) {
        let range = self.cell_range(rect);
        if cell_count(range) > MAX_LINKED_CELLS {
            self.oversized.retain(|i| *i != index);
            return;
        }
        let (x0, y0, x1, y1) = range;
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                if let Some(cell) = self.cells.get_mut(&(cx, cy)) {
                    cell.retain(|i| *i != index);
                    if cell.is_empty() {
                        self.cells.remove(&(cx, cy));
                    }
                }
            }
        }
    }

    /// Indices stored in cells overlapping `region`, possibly repeated, plus
    /// every oversized envelope.
    fn near(&self, region: Rect) -> impl Iterator<Item = usize> + '_ {
        let range = self.cell_range(region);
        let (x0, y0, x1, y1) = range;
        let sparse = usize::try_from(cell_count(range)).map_or(true, |n| n > self.cells.len());
        // Walking the occupied cells is cheaper than walking a mostly empty span.
        let occupied: Vec<&SmallVec<[usize; 8]>> = if sparse {
            self.cells
                .iter()
                .filter(|((cx, cy), _)| (x0..=x1).contains(cx) && (y0..=y1).contains(cy))
                .map(|(_, cell)| cell)
                .collect()
        } else {
            (y0..=y1)
                .flat_map(|cy| (x0..=x1).map(move |cx| (cx, cy)))
                .filter_map(|key| self.cells.get(&key))
                .collect()
        };
        occupied
            .into_iter()
            .flat_map(|cell| cell.iter().copied())
            .chain(self.oversized.iter().copied())
    }
}

fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a <= b { (a, b) } else { (b, a) }
}

fn cell_count((x0, y0, x1, y1): CellRange) -> i64 {
    let w = i64::from(x1) - i64::from(x0) + 1;
    let h = i64::from(y1) - i64::from(y0) + 1;
    w.saturating_mul(h)
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Grid cell indices are intentionally i32; out-of-range values are saturated."
)]
fn cell_coord(value: f64, cell_size: f64) -> i32 {
    let t = value / cell_size;
    let coord = t as i32;
    // The cast truncates toward zero; step down for negative fractions.
    if t < 0.0 && f64::from(coord) > t {
        coord.saturating_sub(1)
    } else {
        coord
    }
}

fn is_degenerate(rect: Rect) -> bool {
    let finite = rect.x0.is_finite()
        && rect.y0.is_finite()
        && rect.x1.is_finite()
        && rect.y1.is_finite();
    !finite || rect.x1 < rect.x0 || rect.y1 < rect.y0
}

fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

fn encloses(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && inner.x1 <= outer.x1 && outer.y0 <= inner.y0 && inner.y1 <= outer.y1
}

fn mode_matches(mode: SelectionMode, region: Rect, env: Rect) -> bool {
    match mode {
        SelectionMode::IntersectsExtent | SelectionMode::Intersects => overlaps(region, env),
        SelectionMode::Contains => encloses(region, env),
        SelectionMode::Within => encloses(env, region),
        SelectionMode::Disjoint => !overlaps(region, env),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_squares(table: &mut EnvelopeTable, n: usize) {
        for i in 0..n {
            let x = i as f64 * 10.0;
            table.set(i, Rect::new(x, 0.0, x + 1.0, 1.0));
        }
    }

    fn both(n: usize) -> [EnvelopeTable; 2] {
        let mut flat = EnvelopeTable::new();
        let mut grid = EnvelopeTable::with_grid(4.0);
        unit_squares(&mut flat, n);
        unit_squares(&mut grid, n);
        [flat, grid]
    }

    #[test]
    fn modes_on_envelopes() {
        for table in both(5) {
            let region = Rect::new(-1.0, -1.0, 21.0, 2.0);
            let hits = table
                .candidates_intersecting(region, SelectionMode::IntersectsExtent)
                .unwrap();
            assert_eq!(hits, [0, 1, 2]);

            let inside = Rect::new(9.5, -1.0, 20.5, 2.0);
            let contained = table
                .candidates_intersecting(inside, SelectionMode::Contains)
                .unwrap();
            assert_eq!(contained, [1]);

            let disjoint = table
                .candidates_intersecting(region, SelectionMode::Disjoint)
                .unwrap();
            assert_eq!(disjoint, [3, 4]);

            let point = Rect::new(30.5, 0.5, 30.5, 0.5);
            let within = table
                .candidates_intersecting(point, SelectionMode::Within)
                .unwrap();
            assert_eq!(within, [3]);
        }
    }

    #[test]
    fn negative_coordinates_land_in_negative_cells() {
        assert_eq!(cell_coord(-0.5, 4.0), -1);
        assert_eq!(cell_coord(-4.0, 4.0), -1);
        assert_eq!(cell_coord(3.9, 4.0), 0);

        let mut table = EnvelopeTable::with_grid(4.0);
        table.set(0, Rect::new(-9.0, -9.0, -7.0, -7.0));
        let hits = table
            .candidates_intersecting(Rect::new(-8.0, -8.0, 0.0, 0.0), SelectionMode::Intersects)
            .unwrap();
        assert_eq!(hits, [0]);
    }

    #[test]
    fn moving_and_removing_envelopes() {
        let mut table = EnvelopeTable::with_grid(4.0);
        table.set(0, Rect::new(0.0, 0.0, 1.0, 1.0));
        table.set(0, Rect::new(100.0, 100.0, 101.0, 101.0));
        let near_origin = Rect::new(0.0, 0.0, 2.0, 2.0);
        assert!(
            table
                .candidates_intersecting(near_origin, SelectionMode::IntersectsExtent)
                .unwrap()
                .is_empty()
        );
        assert_eq!(table.remove(0), Some(Rect::new(100.0, 100.0, 101.0, 101.0)));
        assert_eq!(table.remove(0), None);
        assert_eq!(table.bounds(), None);
    }

    #[test]
    fn inverted_envelopes_are_normalised() {
        for mut table in [EnvelopeTable::new(), EnvelopeTable::with_grid(1.0)] {
            table.set(0, Rect::new(3.0, 3.0, 1.0, 1.0));
            assert_eq!(table.get(0), Some(Rect::new(1.0, 1.0, 3.0, 3.0)));
            let hits = table
                .candidates_intersecting(Rect::new(2.0, 2.0, 2.5, 2.5), SelectionMode::Intersects)
                .unwrap();
            assert_eq!(hits, [0]);
        }
    }

    #[test]
    fn huge_envelopes_skip_the_cell_map() {
        let mut table = EnvelopeTable::with_grid(1.0);
        table.set(0, Rect::new(-1.0e9, -1.0e9, 1.0e9, 1.0e9));
        table.set(1, Rect::new(5.0, 5.0, 5.5, 5.5));
        let grid = table.grid.as_ref().unwrap();
        assert_eq!(grid.cells.len(), 1);
        assert_eq!(grid.oversized, [0]);

        let region = Rect::new(4.0, 4.0, 6.0, 6.0);
        let hits = table
            .candidates_intersecting(region, SelectionMode::IntersectsExtent)
            .unwrap();
        assert_eq!(hits, [0, 1]);

        table.remove(0);
        assert!(table.grid.as_ref().unwrap().oversized.is_empty());
        let hits = table
            .candidates_intersecting(region, SelectionMode::IntersectsExtent)
            .unwrap();
        assert_eq!(hits, [1]);
    }

    #[test]
    fn degenerate_queries_are_rejected() {
        let table = EnvelopeTable::new();
        let inverted = Rect::new(5.0, 0.0, 1.0, 1.0);
        assert_eq!(
            table.candidates_intersecting(inverted, SelectionMode::IntersectsExtent),
            Err(GeometryError::DegenerateEnvelope(inverted))
        );
        let nan = Rect::new(f64::NAN, 0.0, 1.0, 1.0);
        assert!(
            table
                .candidates_intersecting(nan, SelectionMode::IntersectsExtent)
                .is_err()
        );
    }
}
