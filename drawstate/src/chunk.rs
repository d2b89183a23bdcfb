// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Partitioning of the index space into rendering chunks.
//!
//! Chunks are contiguous index ranges. The partition depends only on the
//! policy and on registration order, never on geometry, so it is stable across
//! calls and every live feature belongs to exactly one chunk.

use alloc::vec::Vec;
use core::ops::Range;

use crate::config::{ChunkPolicy, DEFAULT_CHUNK_SIZE};
use crate::store::FeatureStateStore;

/// Assigns chunk ids to features and answers chunk-range queries.
#[derive(Clone, Debug)]
pub struct ChunkAssigner {
    policy: ChunkPolicy,
    chunk_size: usize,
    /// First index of every chunk, ascending.
    starts: Vec<usize>,
    /// Indices below this have been assigned.
    covered: usize,
}

impl Default for ChunkAssigner {
    fn default() -> Self {
        Self::new(ChunkPolicy::default())
    }
}

impl ChunkAssigner {
    /// Creates an assigner with no chunks yet.
    ///
    /// A [`ChunkPolicy::FixedCount`] policy needs the index space size, so growth
    /// before the first full reassignment
    /// ([`DrawingState::assign_chunks`](crate::DrawingState::assign_chunks)) uses
    /// [`DEFAULT_CHUNK_SIZE`].
    #[must_use]
    pub fn new(policy: ChunkPolicy) -> Self {
        let chunk_size = match policy {
            ChunkPolicy::FixedSize(size) => size.max(1),
            ChunkPolicy::FixedCount(_) => DEFAULT_CHUNK_SIZE,
        };
        Self {
            policy,
            chunk_size,
            starts: Vec::new(),
            covered: 0,
        }
    }

    /// The policy used by the last full assignment.
    #[must_use]
    pub fn policy(&self) -> ChunkPolicy {
        self.policy
    }

    /// Number of indices per chunk.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.starts.len()
    }

    /// Size of the index space that has been assigned.
    #[must_use]
    pub fn covered_len(&self) -> usize {
        self.covered
    }

    /// Index range of `chunk`, or `None` if it does not exist.
    #[must_use]
    pub fn chunk_range(&self, chunk: u32) -> Option<Range<usize>> {
        let at = chunk as usize;
        let start = *self.starts.get(at)?;
        let end = self.starts.get(at + 1).copied().unwrap_or(self.covered);
        Some(start..end)
    }

    /// Chunk containing `index`, or `None` if it has not been assigned.
    #[must_use]
    pub fn chunk_of(&self, index: usize) -> Option<u32> {
        if index >= self.covered {
            return None;
        }
        let at = self.starts.partition_point(|start| *start <= index) - 1;
        u32::try_from(at).ok()
    }

    /// Index ranges of every chunk, in chunk order.
    pub fn chunks(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.starts.len()).map(|at| {
            let end = self.starts.get(at + 1).copied().unwrap_or(self.covered);
            self.starts[at]..end
        })
    }

    /// Partitions the whole index space of `store` under `policy`.
    ///
    /// Every live feature's chunk is rewritten; features whose chunk changes are
    /// recorded with the store's change notifier.
    pub(crate) fn assign_all(&mut self, store: &mut FeatureStateStore, policy: ChunkPolicy) {
        let len = store.len();
        self.policy = policy;
        self.chunk_size = policy.chunk_size(len);
        self.starts = (0..len).step_by(self.chunk_size).collect();
        self.covered = len;

        let mut moved = 0;
        for index in 0..len {
            moved += usize::from(store.set_chunk(index, self.chunk_id(index / self.chunk_size)));
        }
        log::debug!(
            "assigned {len} indices to {} chunks of {} ({moved} moved)",
            self.starts.len(),
            self.chunk_size
        );
    }

    /// Places newly registered indices, opening chunks as the last one fills.
    ///
    /// `new_indices` must start at [`covered_len`](Self::covered_len); indices
    /// that are already covered are ignored. Existing features never move.
    pub(crate) fn reassign_on_grow(
        &mut self,
        store: &mut FeatureStateStore,
        new_indices: Range<usize>,
    ) {
        let start = new_indices.start.max(self.covered);
        for index in start..new_indices.end {
            let last_full = self
                .starts
                .last()
                .is_none_or(|first| index - first >= self.chunk_size);
            if last_full {
                self.starts.push(index);
            }
            let chunk = self.chunk_id(self.starts.len() - 1);
            store.set_chunk(index, chunk);
            self.covered = index + 1;
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "chunk counts above u32::MAX would need over four billion chunks"
    )]
    fn chunk_id(&self, at: usize) -> u32 {
        at as u32
    }
}
