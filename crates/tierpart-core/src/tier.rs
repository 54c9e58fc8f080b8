//! Tier (size-class) directory.
//!
//! One descriptor per size class. Tier `i` serves blocks of
//! `granularity × 2^i` bytes; tier `i+1`'s block size is exactly double
//! tier `i`'s. The directory is the authoritative state every other
//! component reads and mutates; nothing outside the allocate/release/layout
//! protocol touches the list pointers.

use crate::arena::NIL;

/// Maximum number of tiers a partition can carry.
///
/// Block sizes span `granularity × 2^0` through `granularity × 2^10`.
pub const MAX_TIERS: usize = 11;

/// Descriptor for a single size class.
#[derive(Debug, Clone)]
pub(crate) struct TierDesc {
    /// Bytes per block in this tier. Immutable after layout.
    pub(crate) block_size: usize,
    /// Number of blocks currently on this tier's free list. Must equal the
    /// chain length from `free_head` to `free_tail` at all times.
    pub(crate) free_count: usize,
    /// Arena offset of the first free block, or [`NIL`] when empty.
    pub(crate) free_head: usize,
    /// Arena offset of the last free block (its link word is always
    /// [`NIL`]), or [`NIL`] when empty.
    pub(crate) free_tail: usize,
}

/// The fixed table of size-class descriptors for one partition.
pub(crate) struct TierDirectory {
    tiers: Vec<TierDesc>,
}

impl TierDirectory {
    /// Builds `tier_count` empty descriptors with geometrically doubling
    /// block sizes.
    pub(crate) fn new(tier_count: usize, granularity: usize) -> Self {
        let tiers = (0..tier_count)
            .map(|i| TierDesc {
                block_size: granularity << i,
                free_count: 0,
                free_head: NIL,
                free_tail: NIL,
            })
            .collect();
        Self { tiers }
    }

    pub(crate) fn len(&self) -> usize {
        self.tiers.len()
    }

    pub(crate) fn get(&self, index: usize) -> &TierDesc {
        &self.tiers[index]
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut TierDesc {
        &mut self.tiers[index]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TierDesc> {
        self.tiers.iter()
    }
}

/// Computes the home tier for a requested byte size: the smallest `i` with
/// `granularity × 2^i >= size`.
///
/// Sizes above the top tier's capacity clamp to the top tier; callers must
/// not request more than `granularity × 2^(tier_count-1)` bytes.
pub(crate) fn classify(size: usize, granularity: usize, tier_count: usize) -> usize {
    let mut capacity = granularity;
    for index in 0..tier_count {
        if capacity >= size {
            return index;
        }
        capacity = capacity.saturating_mul(2);
    }
    tier_count - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_minimum_sizes_map_to_tier_zero() {
        assert_eq!(classify(0, 16, 11), 0);
        assert_eq!(classify(1, 16, 11), 0);
        assert_eq!(classify(16, 16, 11), 0);
    }

    #[test]
    fn classify_exact_boundaries() {
        assert_eq!(classify(32, 16, 11), 1);
        assert_eq!(classify(64, 16, 11), 2);
        assert_eq!(classify(16 << 10, 16, 11), 10);
    }

    #[test]
    fn classify_rounds_up_between_boundaries() {
        assert_eq!(classify(17, 16, 11), 1);
        assert_eq!(classify(33, 16, 11), 2);
        assert_eq!(classify(100, 16, 11), 3);
    }

    #[test]
    fn classify_clamps_oversize_to_top_tier() {
        assert_eq!(classify(usize::MAX, 16, 11), 10);
        assert_eq!(classify(1024, 16, 3), 2);
    }

    #[test]
    fn directory_block_sizes_double_per_tier() {
        let dir = TierDirectory::new(MAX_TIERS, 16);
        for i in 1..dir.len() {
            assert_eq!(dir.get(i).block_size, dir.get(i - 1).block_size * 2);
        }
        assert_eq!(dir.get(0).block_size, 16);
        assert_eq!(dir.get(10).block_size, 16 * 1024);
    }

    #[test]
    fn directory_starts_empty() {
        let dir = TierDirectory::new(3, 16);
        for tier in dir.iter() {
            assert_eq!(tier.free_count, 0);
            assert_eq!(tier.free_head, NIL);
            assert_eq!(tier.free_tail, NIL);
        }
    }
}
