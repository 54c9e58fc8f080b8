//! Index-addressed arena storage.
//!
//! The partition owns one contiguous byte buffer for its whole lifetime.
//! Free-list linkage is stored *inside* the blocks themselves: while a block
//! sits on a free list, the first pointer-sized word of its storage holds
//! the arena offset of the next free block in the same tier (little-endian),
//! or [`NIL`] for the terminator. No metadata lives outside the buffer.
//!
//! Offsets replace raw addresses so the whole crate stays free of `unsafe`;
//! every link access is bounds-checked here and nowhere else.

/// Size of one embedded link word, in bytes.
pub(crate) const LINK_WORD: usize = size_of::<usize>();

/// Terminator sentinel for free-list chains.
///
/// Offset 0 names a real block (the first block of the first row), so the
/// conventional null cannot terminate a chain here.
pub(crate) const NIL: usize = usize::MAX;

/// The raw memory region handed to the layout builder, fixed in size for
/// the life of the partition.
pub(crate) struct Arena {
    bytes: Box<[u8]>,
}

impl Arena {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Total arena size in bytes.
    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether `offset` can hold a link word entirely inside the arena.
    pub(crate) fn holds_link(&self, offset: usize) -> bool {
        offset != NIL
            && offset
                .checked_add(LINK_WORD)
                .is_some_and(|end| end <= self.bytes.len())
    }

    /// Reads the embedded link word at `offset`.
    ///
    /// Returns `None` when the word does not lie inside the arena, which a
    /// well-formed chain never produces.
    pub(crate) fn link_at(&self, offset: usize) -> Option<usize> {
        let end = offset.checked_add(LINK_WORD)?;
        let word = self.bytes.get(offset..end)?;
        let word: [u8; LINK_WORD] = word.try_into().ok()?;
        Some(usize::from_le_bytes(word))
    }

    /// Writes the embedded link word at `offset`.
    ///
    /// Returns `false` (and writes nothing) when the word would fall outside
    /// the arena.
    pub(crate) fn set_link(&mut self, offset: usize, next: usize) -> bool {
        let Some(end) = offset.checked_add(LINK_WORD) else {
            return false;
        };
        let Some(word) = self.bytes.get_mut(offset..end) else {
            return false;
        };
        word.copy_from_slice(&next.to_le_bytes());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_round_trip() {
        let mut arena = Arena::new(vec![0u8; 64]);
        assert!(arena.set_link(0, 48));
        assert!(arena.set_link(48, NIL));
        assert_eq!(arena.link_at(0), Some(48));
        assert_eq!(arena.link_at(48), Some(NIL));
    }

    #[test]
    fn out_of_range_link_is_rejected() {
        let mut arena = Arena::new(vec![0u8; 16]);
        assert!(!arena.set_link(9, 0), "link word would straddle the end");
        assert!(!arena.set_link(NIL, 0));
        assert_eq!(arena.link_at(16), None);
        assert_eq!(arena.link_at(NIL), None);
    }

    #[test]
    fn holds_link_matches_accessors() {
        let arena = Arena::new(vec![0u8; 32]);
        assert!(arena.holds_link(0));
        assert!(arena.holds_link(32 - LINK_WORD));
        assert!(!arena.holds_link(32 - LINK_WORD + 1));
        assert!(!arena.holds_link(NIL));
    }
}
