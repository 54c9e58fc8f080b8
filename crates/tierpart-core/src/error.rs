//! Error taxonomy for the partition subsystem.
//!
//! Construction-time argument errors are reported synchronously by
//! [`crate::TieredPartition::create`] with no partial structures retained.
//! Exhaustion is a typed run-time failure, never an abort. Misuse the
//! subsystem does not track (double free, freeing a foreign offset) stays
//! caller responsibility; the variants here only cover what can be checked
//! without extra bookkeeping.

use thiserror::Error;

/// Every failure the partition boundary can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PartitionError {
    /// The arena buffer was empty.
    #[error("arena buffer is empty")]
    InvalidArena,

    /// The arena cannot hold the requested row layout.
    #[error("arena holds {actual} bytes but the layout needs {required}")]
    ArenaTooSmall { required: usize, actual: usize },

    /// Fewer than two blocks per tier were requested.
    #[error("block count must be at least 2, got {0}")]
    InvalidBlockCount(usize),

    /// The granularity cannot hold an embedded link word.
    #[error("granularity must be at least {min} bytes, got {0}", min = size_of::<usize>())]
    InvalidGranularity(usize),

    /// The tier count is zero or above [`crate::MAX_TIERS`].
    #[error("tier count must be in 1..={max}, got {0}", max = crate::MAX_TIERS)]
    InvalidTierCount(usize),

    /// No tier at or above the target has a free block.
    #[error("no free block at or above the requested size class")]
    Exhausted,

    /// A released offset does not name a link-word-addressable arena block.
    #[error("block offset {0} is not inside the arena")]
    InvalidBlock(usize),

    /// A free-list link word left the arena; the chain is damaged.
    #[error("free list for tier {tier} is corrupt")]
    CorruptFreeList { tier: usize },
}
