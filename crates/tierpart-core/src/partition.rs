//! The tiered memory partition.
//!
//! One [`TieredPartition`] owns a contiguous arena and a directory of K
//! size classes laid out in striped rows: each row holds exactly one block
//! of every tier, so row `r`'s tier-`i` block sits at
//! `r × row_stride + granularity × (2^i − 1)`. Striping keeps a whole row
//! recombinable as one unit; the addressing scheme is relied on by the
//! split and merge paths and must not be reordered.
//!
//! Allocation serves the smallest tier whose blocks fit, borrowing and
//! splitting from the nearest larger tier when the home tier is empty.
//! Release scans for an address-adjacent free neighbor and merges with it,
//! otherwise reinserting at the home tier's head.
//!
//! All mutation happens under one `parking_lot::Mutex`; the guard is
//! dropped on every exit path, including early failure returns.

use parking_lot::Mutex;

use crate::arena::{Arena, LINK_WORD, NIL};
use crate::error::PartitionError;
use crate::snapshot::{PartitionSnapshot, TierSnapshot};
use crate::tier::{MAX_TIERS, TierDirectory, classify};
use crate::trace::{TraceLevel, TraceLog, TraceRecord};

/// Read-only view of one tier for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierQuery {
    /// Bytes per block in this tier.
    pub block_size: usize,
    /// Blocks currently on the tier's free list.
    pub free_count: usize,
}

/// A free neighbor located during the release scan.
struct Neighbor {
    /// Offset of the node preceding the match, or [`NIL`] when the match is
    /// the list head.
    prev: usize,
    /// Offset of the matching adjacent free block.
    offset: usize,
}

struct PartitionState {
    arena: Arena,
    dir: TierDirectory,
    granularity: usize,
    trace: TraceLog,
}

/// A tiered splitting/coalescing memory partition.
///
/// Created once over a caller-provided arena; [`allocate`] and [`release`]
/// may then be called from any number of threads. Block identities are
/// arena byte offsets, valid for the life of the partition.
///
/// [`allocate`]: TieredPartition::allocate
/// [`release`]: TieredPartition::release
pub struct TieredPartition {
    inner: Mutex<PartitionState>,
}

impl TieredPartition {
    /// Builds a partition with the full [`MAX_TIERS`] tier directory.
    ///
    /// See [`TieredPartition::with_tiers`] for the layout contract.
    pub fn create(
        arena: Vec<u8>,
        nblks: usize,
        granularity: usize,
    ) -> Result<Self, PartitionError> {
        Self::with_tiers(arena, nblks, granularity, MAX_TIERS)
    }

    /// Builds a partition with `tier_count` size classes over `arena`.
    ///
    /// The arena is partitioned into `nblks − 1` striped rows, each holding
    /// one block of every tier, and every tier's free list is threaded
    /// through the rows in row order. Each tier therefore starts with
    /// `nblks − 1` free blocks, the number of entries actually threaded,
    /// which keeps `free_count` equal to the chain length from the first
    /// snapshot onward.
    ///
    /// Fails without retaining any state when the arena is empty or too
    /// small for the row layout, `nblks < 2`, the granularity cannot hold a
    /// link word, or `tier_count` is out of range.
    pub fn with_tiers(
        arena: Vec<u8>,
        nblks: usize,
        granularity: usize,
        tier_count: usize,
    ) -> Result<Self, PartitionError> {
        if arena.is_empty() {
            return Err(PartitionError::InvalidArena);
        }
        if nblks < 2 {
            return Err(PartitionError::InvalidBlockCount(nblks));
        }
        if granularity < LINK_WORD {
            return Err(PartitionError::InvalidGranularity(granularity));
        }
        if tier_count == 0 || tier_count > MAX_TIERS {
            return Err(PartitionError::InvalidTierCount(tier_count));
        }

        let rows = nblks - 1;
        let row_stride = Self::row_stride(granularity, tier_count)
            .ok_or(PartitionError::InvalidGranularity(granularity))?;
        let required = row_stride.saturating_mul(rows);
        if arena.len() < required {
            return Err(PartitionError::ArenaTooSmall {
                required,
                actual: arena.len(),
            });
        }

        let mut state = PartitionState {
            arena: Arena::new(arena),
            dir: TierDirectory::new(tier_count, granularity),
            granularity,
            trace: TraceLog::new(),
        };

        for index in 0..tier_count {
            // Row-local offset: the sum of all smaller tier sizes.
            let base = granularity * ((1usize << index) - 1);
            for row in 0..rows {
                let offset = row * row_stride + base;
                let next = if row + 1 < rows {
                    offset + row_stride
                } else {
                    NIL
                };
                let linked = state.arena.set_link(offset, next);
                debug_assert!(linked, "layout offsets were validated against arena size");
            }
            let tier = state.dir.get_mut(index);
            tier.free_head = base;
            tier.free_tail = (rows - 1) * row_stride + base;
            tier.free_count = rows;
        }

        state.trace.record(
            TraceLevel::Info,
            "create",
            "layout",
            None,
            None,
            Some(row_stride),
            "success",
        );

        Ok(Self {
            inner: Mutex::new(state),
        })
    }

    /// Arena bytes needed for `nblks` blocks per tier at `granularity`, or
    /// `None` when the parameters overflow or are out of range.
    pub fn required_bytes(nblks: usize, granularity: usize, tier_count: usize) -> Option<usize> {
        if nblks < 2 || tier_count == 0 || tier_count > MAX_TIERS {
            return None;
        }
        Self::row_stride(granularity, tier_count)?.checked_mul(nblks - 1)
    }

    fn row_stride(granularity: usize, tier_count: usize) -> Option<usize> {
        granularity.checked_mul((1usize << tier_count) - 1)
    }

    /// Allocates a block of at least `size` bytes, returning its arena
    /// offset.
    ///
    /// `granularity` must be the value the partition was laid out with; it
    /// classifies the request exactly as layout did. When the home tier is
    /// empty, the first larger non-empty tier is borrowed from: its head
    /// block is returned whole, and one next-lower-tier block's worth of
    /// spare capacity is carved out at `offset + lower_block_size` and
    /// appended to that lower tier. The split never cascades further down,
    /// so a caller borrowing from two or more tiers above receives the
    /// larger tier's block size.
    ///
    /// Fails with [`PartitionError::Exhausted`] when no tier at or above
    /// the target has a free block; tier state is left untouched.
    pub fn allocate(&self, size: usize, granularity: usize) -> Result<usize, PartitionError> {
        let mut state = self.inner.lock();
        state.allocate(size, granularity)
    }

    /// Returns a block to the partition.
    ///
    /// `size` is the originally requested byte size (it names the home
    /// tier, not the block's physical tier). Starting at the home tier and
    /// moving upward, each tier's free list is scanned for a block
    /// physically adjacent to the released one; the first match is unlinked
    /// from its list and the pair is treated as merged. The combined span
    /// is *not* reinserted into the next tier up, so merged memory stays
    /// unreachable until the partition is rebuilt. With no match anywhere,
    /// the block is pushed onto its home tier's free-list head.
    ///
    /// Double-freeing or releasing an offset the partition never handed out
    /// is caller misuse and is not detected; the only guard is that the
    /// offset must name an in-arena link word.
    pub fn release(
        &self,
        size: usize,
        granularity: usize,
        block: usize,
    ) -> Result<(), PartitionError> {
        let mut state = self.inner.lock();
        state.release(size, granularity, block)
    }

    /// Number of size classes in the directory.
    pub fn tier_count(&self) -> usize {
        self.inner.lock().dir.len()
    }

    /// The base granularity the partition was laid out with.
    pub fn granularity(&self) -> usize {
        self.inner.lock().granularity
    }

    /// Block size and free count for one tier, or `None` out of range.
    pub fn query(&self, tier: usize) -> Option<TierQuery> {
        let state = self.inner.lock();
        if tier >= state.dir.len() {
            return None;
        }
        let desc = state.dir.get(tier);
        Some(TierQuery {
            block_size: desc.block_size,
            free_count: desc.free_count,
        })
    }

    /// Captures a consistent snapshot of every tier and its free chain.
    ///
    /// Taken under the partition lock, so it never observes a torn state.
    /// Chain walks are bounded by each tier's `free_count` and truncate on
    /// a malformed link, so the snapshot terminates even over a damaged
    /// chain.
    pub fn snapshot(&self) -> PartitionSnapshot {
        self.inner.lock().snapshot()
    }

    /// Copies the lifecycle trace accumulated so far.
    pub fn trace(&self) -> Vec<TraceRecord> {
        self.inner.lock().trace.records().to_vec()
    }

    /// Drains the lifecycle trace.
    pub fn drain_trace(&self) -> Vec<TraceRecord> {
        self.inner.lock().trace.drain()
    }
}

impl PartitionState {
    fn allocate(&mut self, size: usize, granularity: usize) -> Result<usize, PartitionError> {
        let target = classify(size, granularity, self.dir.len());

        if self.dir.get(target).free_count > 0 {
            let offset = self.pop_head(target)?;
            self.trace.record(
                TraceLevel::Trace,
                "allocate",
                "pop",
                Some(target),
                Some(offset),
                Some(self.dir.get(target).block_size),
                "success",
            );
            return Ok(offset);
        }

        // Home tier is empty: borrow from the nearest larger tier and carve
        // one next-lower-tier block out of the borrowed span.
        for upper in target + 1..self.dir.len() {
            if self.dir.get(upper).free_count == 0 {
                continue;
            }
            let offset = self.pop_head(upper)?;
            let lower = upper - 1;
            let spare = offset + self.dir.get(lower).block_size;
            self.push_tail(lower, spare)?;
            self.trace.record(
                TraceLevel::Debug,
                "allocate",
                "split",
                Some(upper),
                Some(offset),
                Some(self.dir.get(upper).block_size),
                "success",
            );
            return Ok(offset);
        }

        self.trace.record(
            TraceLevel::Warn,
            "allocate",
            "exhausted",
            Some(target),
            None,
            None,
            "denied",
        );
        Err(PartitionError::Exhausted)
    }

    fn release(
        &mut self,
        size: usize,
        granularity: usize,
        block: usize,
    ) -> Result<(), PartitionError> {
        if !self.arena.holds_link(block) {
            return Err(PartitionError::InvalidBlock(block));
        }
        let home = classify(size, granularity, self.dir.len());

        // Scan home..=K-2 for an address-adjacent free neighbor. The top
        // tier has nothing above it to merge toward and is never scanned.
        for tier in home..self.dir.len().saturating_sub(1) {
            let Some(neighbor) = self.find_adjacent(tier, block)? else {
                continue;
            };
            self.unlink(tier, neighbor.prev, neighbor.offset)?;
            self.trace.record(
                TraceLevel::Debug,
                "release",
                "merge",
                Some(tier),
                Some(neighbor.offset),
                Some(self.dir.get(tier).block_size),
                "merged",
            );
            return Ok(());
        }

        self.push_head(home, block)?;
        self.trace.record(
            TraceLevel::Trace,
            "release",
            "insert",
            Some(home),
            Some(block),
            Some(self.dir.get(home).block_size),
            "success",
        );
        Ok(())
    }

    /// Pops a tier's free-list head. The caller has checked `free_count > 0`.
    fn pop_head(&mut self, tier: usize) -> Result<usize, PartitionError> {
        let head = self.dir.get(tier).free_head;
        let next = self
            .arena
            .link_at(head)
            .ok_or(PartitionError::CorruptFreeList { tier })?;
        let desc = self.dir.get_mut(tier);
        desc.free_head = next;
        desc.free_count -= 1;
        if desc.free_count == 0 {
            // The popped block's former link is the terminator; adopting it
            // marks the tier correctly empty.
            desc.free_tail = next;
        }
        Ok(head)
    }

    /// Appends `offset` as a tier's new free-list tail.
    fn push_tail(&mut self, tier: usize, offset: usize) -> Result<(), PartitionError> {
        if !self.arena.set_link(offset, NIL) {
            return Err(PartitionError::CorruptFreeList { tier });
        }
        let old_tail = self.dir.get(tier).free_tail;
        if self.dir.get(tier).free_count == 0 {
            let desc = self.dir.get_mut(tier);
            desc.free_head = offset;
            desc.free_tail = offset;
        } else {
            if !self.arena.set_link(old_tail, offset) {
                return Err(PartitionError::CorruptFreeList { tier });
            }
            self.dir.get_mut(tier).free_tail = offset;
        }
        self.dir.get_mut(tier).free_count += 1;
        Ok(())
    }

    /// Pushes `block` as a tier's new free-list head.
    fn push_head(&mut self, tier: usize, block: usize) -> Result<(), PartitionError> {
        let old_head = self.dir.get(tier).free_head;
        if !self.arena.set_link(block, old_head) {
            return Err(PartitionError::InvalidBlock(block));
        }
        let desc = self.dir.get_mut(tier);
        if desc.free_count == 0 {
            desc.free_tail = block;
        }
        desc.free_head = block;
        desc.free_count += 1;
        Ok(())
    }

    /// Walks one tier's free list looking for a block physically adjacent
    /// to `block` at that tier's block size. The walk visits at most
    /// `free_count` nodes, so a damaged chain cannot loop it.
    fn find_adjacent(&self, tier: usize, block: usize) -> Result<Option<Neighbor>, PartitionError> {
        let desc = self.dir.get(tier);
        let block_size = desc.block_size;
        let mut prev = NIL;
        let mut cur = desc.free_head;
        for _ in 0..desc.free_count {
            if cur == NIL {
                return Err(PartitionError::CorruptFreeList { tier });
            }
            let follows = cur.checked_add(block_size) == Some(block);
            let precedes = block.checked_add(block_size) == Some(cur);
            if follows || precedes {
                return Ok(Some(Neighbor { prev, offset: cur }));
            }
            if cur == desc.free_tail {
                break;
            }
            prev = cur;
            cur = self
                .arena
                .link_at(cur)
                .ok_or(PartitionError::CorruptFreeList { tier })?;
        }
        Ok(None)
    }

    /// Unlinks `cur` from a tier's free list, `prev` being its predecessor
    /// or [`NIL`] when `cur` is the head.
    fn unlink(&mut self, tier: usize, prev: usize, cur: usize) -> Result<(), PartitionError> {
        let next = self
            .arena
            .link_at(cur)
            .ok_or(PartitionError::CorruptFreeList { tier })?;
        let desc = self.dir.get_mut(tier);
        desc.free_count -= 1;
        if desc.free_count == 0 {
            desc.free_head = NIL;
            desc.free_tail = NIL;
            return Ok(());
        }
        if cur == desc.free_head {
            desc.free_head = next;
            return Ok(());
        }
        if cur == desc.free_tail {
            desc.free_tail = prev;
            if !self.arena.set_link(prev, NIL) {
                return Err(PartitionError::CorruptFreeList { tier });
            }
            return Ok(());
        }
        if !self.arena.set_link(prev, next) {
            return Err(PartitionError::CorruptFreeList { tier });
        }
        Ok(())
    }

    fn snapshot(&self) -> PartitionSnapshot {
        let tiers = self
            .dir
            .iter()
            .enumerate()
            .map(|(index, desc)| {
                let mut free_blocks = Vec::with_capacity(desc.free_count);
                let mut cur = desc.free_head;
                for _ in 0..desc.free_count {
                    if cur == NIL {
                        break;
                    }
                    free_blocks.push(cur);
                    if cur == desc.free_tail {
                        break;
                    }
                    match self.arena.link_at(cur) {
                        Some(next) => cur = next,
                        None => break,
                    }
                }
                TierSnapshot {
                    tier: index,
                    block_size: desc.block_size,
                    free_count: desc.free_count,
                    free_blocks,
                }
            })
            .collect();
        PartitionSnapshot {
            granularity: self.granularity,
            arena_len: self.arena.len(),
            tiers,
        }
    }
}
