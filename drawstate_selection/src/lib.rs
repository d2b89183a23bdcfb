// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=drawstate_selection --heading-base-level=0

//! Drawstate Selection: bitset-backed index selection.
//!
//! This crate focuses on the _bookkeeping_ of a selection over a dense index
//! space: the set of selected feature indices plus a revision counter. It does
//! **not** know anything about geometry or how candidate sets are produced;
//! callers compute candidates (a region query, a predicate, a lasso) and then
//! combine them with the current selection.
//!
//! The core type is [`IndexSelection`], a compact bitset that tracks:
//! - The set of selected indices, one bit per index.
//! - The number of selected indices, maintained incrementally.
//! - A monotonically increasing **revision** counter that bumps when the
//!   selection changes.
//!
//! Bulk operations work a machine word at a time, so combining a large candidate
//! set with the current selection is proportional to the number of words touched
//! rather than to the number of indices times a lookup cost.
//!
//! ## Minimal example
//!
//! ```rust
//! use drawstate_selection::{IndexSelection, ModifySelectionMode};
//!
//! let mut selection = IndexSelection::new();
//! selection.insert(2);
//! selection.insert(3);
//! selection.insert(4);
//!
//! // Keep only the indices that are also candidates.
//! let candidates: IndexSelection = [3, 4, 5].into_iter().collect();
//! selection.combine(&candidates, ModifySelectionMode::SelectFrom);
//!
//! assert_eq!(selection.iter().collect::<Vec<_>>(), [3, 4]);
//! assert_eq!(selection.len(), 2);
//! ```
//!
//! ## Observing changes
//!
//! Every mutating method has a `*_with` variant that reports each index whose
//! membership actually changed to a [`SelectionObserver`]. Closures of the form
//! `FnMut(usize, bool)` implement the trait, which makes it easy to mirror the
//! selection into per-feature state records:
//!
//! ```rust
//! use drawstate_selection::IndexSelection;
//!
//! let mut mirror = [false; 8];
//! let mut selection = IndexSelection::new();
//!
//! selection.extend_with([1, 5, 5], &mut |index: usize, selected: bool| {
//!     mirror[index] = selected;
//! });
//! assert_eq!(mirror, [false, true, false, false, false, true, false, false]);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use core::ops::Range;

const WORD_BITS: usize = u64::BITS as usize;

#[inline]
const fn word_of(index: usize) -> usize {
    index / WORD_BITS
}

#[inline]
const fn bit_of(index: usize) -> u64 {
    1_u64 << (index % WORD_BITS)
}

fn unobserved(_index: usize, _selected: bool) {}

/// Bits of `word` that fall inside `[start, end)`.
///
/// `word` must overlap the span, i.e. `word * 64 < end`.
#[inline]
fn span_mask(word: usize, start: usize, end: usize) -> u64 {
    let base = word * WORD_BITS;
    let lo = start.saturating_sub(base).min(WORD_BITS);
    let hi = (end - base).min(WORD_BITS);
    if hi <= lo {
        return 0;
    }
    let upper = if hi == WORD_BITS {
        u64::MAX
    } else {
        (1_u64 << hi) - 1
    };
    let lower = !((1_u64 << lo) - 1);
    upper & lower
}

/// How a candidate set is combined with the current selection.
///
/// These are the four set-algebra operators supported by every region- or
/// predicate-based selection mutation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ModifySelectionMode {
    /// Union: candidates are added to the current selection.
    Append,
    /// Difference: candidates are removed from the current selection.
    Subtract,
    /// Assignment: the selection becomes exactly the candidate set.
    #[default]
    Replace,
    /// Intersection: only currently selected candidates stay selected.
    SelectFrom,
}

impl ModifySelectionMode {
    /// Combine one word of the current selection with one word of candidates.
    #[inline]
    #[must_use]
    pub const fn combine_word(self, current: u64, candidates: u64) -> u64 {
        match self {
            Self::Append => current | candidates,
            Self::Subtract => current & !candidates,
            Self::Replace => candidates,
            Self::SelectFrom => current & candidates,
        }
    }
}

/// Receives every membership change made by a `*_with` mutation.
///
/// `selected` is the new membership of `index`. Indices are reported in
/// ascending order within a single bulk call.
pub trait SelectionObserver {
    /// Called once per index whose membership changed.
    fn selection_changed(&mut self, index: usize, selected: bool);
}

impl<F> SelectionObserver for F
where
    F: FnMut(usize, bool),
{
    #[inline]
    fn selection_changed(&mut self, index: usize, selected: bool) {
        self(index, selected);
    }
}

/// A bitset of selected indices with a revision counter.
///
/// Storage grows on demand to cover the highest selected index and drops
/// trailing empty words as indices are removed, so bulk operations only visit
/// the words between the lowest and highest selected index. Two selections
/// compare equal when they contain the same indices, regardless of capacity or
/// revision.
#[derive(Clone, Debug)]
pub struct IndexSelection {
    words: Vec<u64>,
    count: usize,
    revision: u64,
    /// No word below `low` has a bit set; `usize::MAX` while empty.
    low: usize,
}

impl Default for IndexSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexSelection {
    /// Creates an empty selection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            words: Vec::new(),
            count: 0,
            revision: 0,
            low: usize::MAX,
        }
    }

    /// Creates an empty selection with room for indices in `0..len` without reallocating.
    #[must_use]
    pub fn with_capacity(len: usize) -> Self {
        Self {
            words: Vec::with_capacity(len.div_ceil(WORD_BITS)),
            count: 0,
            revision: 0,
            low: usize::MAX,
        }
    }

    /// Creates a selection containing every index in `span`.
    #[must_use]
    pub fn from_span(span: Range<usize>) -> Self {
        let mut selection = Self::with_capacity(span.end);
        selection.insert_span(span);
        selection.revision = 0;
        selection
    }

    /// Returns `true` if no index is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the number of selected indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns the current revision counter.
    ///
    /// The revision is bumped once per mutating call that changes the contents.
    /// No-op calls leave it unchanged.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns `true` if `index` is selected.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.words
            .get(word_of(index))
            .is_some_and(|word| word & bit_of(index) != 0)
    }

    /// Returns the lowest selected index.
    #[must_use]
    pub fn first(&self) -> Option<usize> {
        self.iter().next()
    }

    /// A word-aligned range holding every selected index.
    ///
    /// The range may be wider than `first()..=last()`, but it is empty exactly
    /// when nothing is selected, and finding it never scans the bitset.
    ///
    /// ```rust
    /// use drawstate_selection::IndexSelection;
    ///
    /// let mut selection: IndexSelection = [130, 200].into_iter().collect();
    /// assert_eq!(selection.bounds(), 128..256);
    /// selection.remove(200);
    /// assert_eq!(selection.bounds(), 128..192);
    /// selection.clear();
    /// assert!(selection.bounds().is_empty());
    /// ```
    #[must_use]
    pub fn bounds(&self) -> Range<usize> {
        let end = self.words.len();
        self.low.min(end) * WORD_BITS..end * WORD_BITS
    }

    /// The indices whose membership [`combine`](Self::combine) with `candidates`
    /// and `mode` can change, as a word-aligned range.
    ///
    /// Append only touches the candidates' span, Subtract the overlap of both
    /// spans, SelectFrom the selection's span, and Replace the hull of both.
    #[must_use]
    pub fn affected_span(&self, candidates: &Self, mode: ModifySelectionMode) -> Range<usize> {
        let current = self.bounds();
        let incoming = candidates.bounds();
        match mode {
            ModifySelectionMode::Append => incoming,
            ModifySelectionMode::Subtract => intersect(current, incoming),
            ModifySelectionMode::SelectFrom => current,
            ModifySelectionMode::Replace => hull(current, incoming),
        }
    }

    /// Returns the highest selected index.
    #[must_use]
    pub fn last(&self) -> Option<usize> {
        let (word, bits) = self
            .words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, bits)| **bits != 0)?;
        Some(word * WORD_BITS + (WORD_BITS - 1 - bits.leading_zeros() as usize))
    }

    /// Iterates over the selected indices in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        self.iter_range(0..usize::MAX)
    }

    /// Iterates over the selected indices inside `range` in ascending order.
    pub fn iter_range(&self, range: Range<usize>) -> Iter<'_> {
        let limit = self.words.len() * WORD_BITS;
        let range = range.start.max(self.bounds().start)..range.end;
        if range.start >= range.end || range.start >= limit {
            return Iter {
                words: &self.words,
                word: self.words.len(),
                bits: 0,
                end: range.end,
            };
        }
        let word = word_of(range.start);
        Iter {
            words: &self.words,
            word,
            bits: self.words[word] & (u64::MAX << (range.start % WORD_BITS)),
            end: range.end,
        }
    }

    /// Counts the selected indices inside `range` without iterating them.
    #[must_use]
    pub fn count_range(&self, range: Range<usize>) -> usize {
        let end = range.end.min(self.words.len() * WORD_BITS);
        if range.start >= end {
            return 0;
        }
        (word_of(range.start)..=word_of(end - 1))
            .map(|w| (self.words[w] & span_mask(w, range.start, end)).count_ones() as usize)
            .sum()
    }

    /// Selects `index`. Returns `true` if it was previously unselected.
    pub fn insert(&mut self, index: usize) -> bool {
        self.insert_with(index, &mut unobserved)
    }

    /// Unselects `index`. Returns `true` if it was previously selected.
    pub fn remove(&mut self, index: usize) -> bool {
        self.remove_with(index, &mut unobserved)
    }

    /// Selects every index in `span`. Returns the number of newly selected indices.
    pub fn insert_span(&mut self, span: Range<usize>) -> usize {
        self.insert_span_with(span, &mut unobserved)
    }

    /// Removes every index from the selection.
    pub fn clear(&mut self) {
        self.clear_with(&mut unobserved);
    }

    /// Combines `candidates` with the selection according to `mode`.
    ///
    /// Returns the number of indices whose membership changed.
    pub fn combine(&mut self, candidates: &Self, mode: ModifySelectionMode) -> usize {
        self.combine_with(candidates, mode, &mut unobserved)
    }

    /// Flips the membership of every index in `candidates`.
    ///
    /// Returns the number of indices whose membership changed, which is always
    /// `candidates.len()`.
    pub fn invert(&mut self, candidates: &Self) -> usize {
        self.invert_with(candidates, &mut unobserved)
    }

    /// Selects `index`, reporting the change to `observer`.
    pub fn insert_with<O>(&mut self, index: usize, observer: &mut O) -> bool
    where
        O: SelectionObserver + ?Sized,
    {
        let inserted = self.set_bit(index, true, observer);
        if inserted {
            self.bump_revision();
        }
        inserted
    }

    /// Unselects `index`, reporting the change to `observer`.
    pub fn remove_with<O>(&mut self, index: usize, observer: &mut O) -> bool
    where
        O: SelectionObserver + ?Sized,
    {
        let removed = self.set_bit(index, false, observer);
        if removed {
            self.bump_revision();
        }
        removed
    }

    /// Selects every index yielded by `indices`. Duplicates are ignored.
    ///
    /// Returns the number of newly selected indices.
    pub fn extend_with<I, O>(&mut self, indices: I, observer: &mut O) -> usize
    where
        I: IntoIterator<Item = usize>,
        O: SelectionObserver + ?Sized,
    {
        let mut changed = 0;
        for index in indices {
            changed += usize::from(self.set_bit(index, true, observer));
        }
        if changed > 0 {
            self.bump_revision();
        }
        changed
    }

    /// Unselects every index yielded by `indices`. Unselected indices are ignored.
    ///
    /// Returns the number of indices that were removed.
    pub fn remove_all_with<I, O>(&mut self, indices: I, observer: &mut O) -> usize
    where
        I: IntoIterator<Item = usize>,
        O: SelectionObserver + ?Sized,
    {
        let mut changed = 0;
        for index in indices {
            changed += usize::from(self.set_bit(index, false, observer));
        }
        if changed > 0 {
            self.bump_revision();
        }
        changed
    }

    /// Selects every index in `span`, a word at a time.
    pub fn insert_span_with<O>(&mut self, span: Range<usize>, observer: &mut O) -> usize
    where
        O: SelectionObserver + ?Sized,
    {
        self.rewrite(span, |_, _| u64::MAX, observer)
    }

    /// Removes every index, reporting each one to `observer`.
    ///
    /// Returns the number of indices removed.
    pub fn clear_with<O>(&mut self, observer: &mut O) -> usize
    where
        O: SelectionObserver + ?Sized,
    {
        if self.count == 0 {
            return 0;
        }
        self.rewrite(self.bounds(), |_, _| 0, observer)
    }

    /// Combines `candidates` with the selection according to `mode`, reporting changes.
    pub fn combine_with<O>(
        &mut self,
        candidates: &Self,
        mode: ModifySelectionMode,
        observer: &mut O,
    ) -> usize
    where
        O: SelectionObserver + ?Sized,
    {
        self.combine_range_with(candidates, mode, 0..usize::MAX, observer)
    }

    /// Like [`IndexSelection::combine_with`], but only indices inside `range` are touched.
    ///
    /// Splitting a large combine into consecutive ranges yields the same result
    /// as a single call over the union of those ranges.
    pub fn combine_range_with<O>(
        &mut self,
        candidates: &Self,
        mode: ModifySelectionMode,
        range: Range<usize>,
        observer: &mut O,
    ) -> usize
    where
        O: SelectionObserver + ?Sized,
    {
        let span = intersect(range, self.affected_span(candidates, mode));
        self.rewrite(
            span,
            |w, old| mode.combine_word(old, candidates.words.get(w).copied().unwrap_or(0)),
            observer,
        )
    }

    /// Flips the membership of every index in `candidates`, reporting changes.
    pub fn invert_with<O>(&mut self, candidates: &Self, observer: &mut O) -> usize
    where
        O: SelectionObserver + ?Sized,
    {
        self.invert_range_with(candidates, 0..usize::MAX, observer)
    }

    /// Like [`IndexSelection::invert_with`], restricted to `range`.
    pub fn invert_range_with<O>(
        &mut self,
        candidates: &Self,
        range: Range<usize>,
        observer: &mut O,
    ) -> usize
    where
        O: SelectionObserver + ?Sized,
    {
        let span = intersect(range, candidates.bounds());
        self.rewrite(
            span,
            |w, old| old ^ candidates.words.get(w).copied().unwrap_or(0),
            observer,
        )
    }

    fn set_bit<O>(&mut self, index: usize, value: bool, observer: &mut O) -> bool
    where
        O: SelectionObserver + ?Sized,
    {
        let word = word_of(index);
        let bit = bit_of(index);
        if value {
            if self.words.len() <= word {
                self.words.resize(word + 1, 0);
            }
            if self.words[word] & bit != 0 {
                return false;
            }
            self.words[word] |= bit;
            self.count += 1;
            self.low = self.low.min(word);
        } else {
            match self.words.get_mut(word) {
                Some(bits) if *bits & bit != 0 => *bits &= !bit,
                _ => return false,
            }
            self.count -= 1;
            self.trim();
        }
        observer.selection_changed(index, value);
        true
    }

    /// Rewrites every word overlapping `span` with `op(word_index, old_bits)`.
    ///
    /// Only bits inside `span` take the new value; every flipped bit is reported
    /// to `observer` in ascending order.
    fn rewrite<F, O>(&mut self, span: Range<usize>, mut op: F, observer: &mut O) -> usize
    where
        F: FnMut(usize, u64) -> u64,
        O: SelectionObserver + ?Sized,
    {
        if span.start >= span.end {
            return 0;
        }
        let last_word = word_of(span.end - 1);
        if self.words.len() <= last_word {
            self.words.resize(last_word + 1, 0);
        }

        let mut changed = 0;
        for w in word_of(span.start)..=last_word {
            let mask = span_mask(w, span.start, span.end);
            let old = self.words[w];
            let new = (old & !mask) | (op(w, old) & mask);
            let mut diff = old ^ new;
            if diff == 0 {
                continue;
            }
            self.words[w] = new;
            if new != 0 {
                self.low = self.low.min(w);
            }
            self.count += (new & !old).count_ones() as usize;
            self.count -= (old & !new).count_ones() as usize;
            changed += diff.count_ones() as usize;
            while diff != 0 {
                let bit = diff.trailing_zeros() as usize;
                diff &= diff - 1;
                observer.selection_changed(w * WORD_BITS + bit, new & (1_u64 << bit) != 0);
            }
        }
        self.trim();
        if changed > 0 {
            self.bump_revision();
        }
        changed
    }

    /// Drops trailing empty words, keeping the last stored word non-zero.
    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
        if self.words.is_empty() {
            self.low = usize::MAX;
        }
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

fn intersect(a: Range<usize>, b: Range<usize>) -> Range<usize> {
    a.start.max(b.start)..a.end.min(b.end)
}

fn hull(a: Range<usize>, b: Range<usize>) -> Range<usize> {
    if a.is_empty() {
        b
    } else if b.is_empty() {
        a
    } else {
        a.start.min(b.start)..a.end.max(b.end)
    }
}

impl PartialEq for IndexSelection {
    fn eq(&self, other: &Self) -> bool {
        if self.count != other.count {
            return false;
        }
        let (short, long) = if self.words.len() <= other.words.len() {
            (&self.words, &other.words)
        } else {
            (&other.words, &self.words)
        };
        short.iter().zip(long.iter()).all(|(a, b)| a == b)
            && long[short.len()..].iter().all(|w| *w == 0)
    }
}

impl Eq for IndexSelection {}

impl FromIterator<usize> for IndexSelection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut selection = Self::new();
        selection.extend(iter);
        selection.revision = 0;
        selection
    }
}

impl Extend<usize> for IndexSelection {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        self.extend_with(iter, &mut unobserved);
    }
}

impl<'a> IntoIterator for &'a IndexSelection {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over selected indices.
///
/// Cloning the iterator restarts nothing; it forks the current position.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    words: &'a [u64],
    word: usize,
    bits: u64,
    end: usize,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.bits != 0 {
                let bit = self.bits.trailing_zeros() as usize;
                self.bits &= self.bits - 1;
                let index = self.word * WORD_BITS + bit;
                if index >= self.end {
                    self.bits = 0;
                    self.word = self.words.len();
                    return None;
                }
                return Some(index);
            }
            if self.word >= self.words.len() {
                return None;
            }
            self.word += 1;
            if self.word >= self.words.len() || self.word * WORD_BITS >= self.end {
                self.word = self.words.len();
                return None;
            }
            self.bits = self.words[self.word];
        }
    }
}

impl core::iter::FusedIterator for Iter<'_> {}
