//! # tierpart-core
//!
//! Tiered memory-partition allocator with geometric size classes over a
//! caller-supplied arena.
//!
//! A [`TieredPartition`] slices its arena into striped rows, threads one
//! intrusive free list per tier, and serves fixed-size blocks by popping the
//! home tier's head. When the home tier is empty it borrows one block from
//! the nearest larger non-empty tier and splits it exactly once. Releases
//! scan the home tier and every larger tier except the top for a physically
//! adjacent free neighbor and absorb it instead of growing the lists.
//!
//! All block addressing is by byte offset into the arena; free-list links
//! live in the first pointer-sized word of each free block's own storage.
//! The crate contains no `unsafe` code.

mod arena;
mod tier;

pub mod error;
pub mod partition;
pub mod snapshot;
pub mod trace;

pub use error::PartitionError;
pub use partition::{TierQuery, TieredPartition};
pub use snapshot::{PartitionSnapshot, TierSnapshot};
pub use tier::MAX_TIERS;
pub use trace::{TraceLevel, TraceRecord};
