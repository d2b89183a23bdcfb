// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction-time configuration for [`DrawingState`](crate::DrawingState).

/// Default number of features per rendering chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// How features are partitioned into rendering chunks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChunkPolicy {
    /// Every chunk holds at most this many consecutive indices.
    FixedSize(usize),
    /// The index space is split into this many chunks of equal size.
    ///
    /// The count is honored by [`ChunkAssigner::assign_all`](crate::ChunkAssigner::assign_all).
    /// Features registered afterwards open further chunks of the same size.
    FixedCount(usize),
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self::FixedSize(DEFAULT_CHUNK_SIZE)
    }
}

impl ChunkPolicy {
    /// Chunk size this policy yields for an index space of `feature_count` entries.
    ///
    /// Zero sizes and counts are treated as one.
    ///
    /// ```
    /// use drawstate::ChunkPolicy;
    ///
    /// assert_eq!(ChunkPolicy::FixedSize(4).chunk_size(10), 4);
    /// assert_eq!(ChunkPolicy::FixedCount(3).chunk_size(10), 4);
    /// assert_eq!(ChunkPolicy::FixedCount(3).chunk_size(0), 1);
    /// ```
    #[must_use]
    pub fn chunk_size(self, feature_count: usize) -> usize {
        match self {
            Self::FixedSize(size) => size.max(1),
            Self::FixedCount(count) => feature_count.div_ceil(count.max(1)).max(1),
        }
    }
}

/// Configuration for a [`DrawingState`](crate::DrawingState).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StateConfig {
    /// Chunking policy used by full reassignment.
    pub chunk_policy: ChunkPolicy,
    /// Whether the view currently allows selection.
    ///
    /// Consulted by [`ClearStates::True`](crate::ClearStates::True).
    pub selection_enabled: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            chunk_policy: ChunkPolicy::default(),
            selection_enabled: true,
        }
    }
}

impl StateConfig {
    /// Returns this configuration with a different chunking policy.
    #[must_use]
    pub const fn with_chunk_policy(mut self, policy: ChunkPolicy) -> Self {
        self.chunk_policy = policy;
        self
    }

    /// Returns this configuration with selection enabled or disabled.
    #[must_use]
    pub const fn with_selection_enabled(mut self, enabled: bool) -> Self {
        self.selection_enabled = enabled;
        self
    }
}
