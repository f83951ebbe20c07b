//! Entries of the row hash index and the slab slots that hold them.

use core::ops::Range;

/// Byte ranges of one row change inside the event buffer.
///
/// The before image is always present. The after image is only present for
/// update events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowPositionEntry {
    bi_start: usize,
    bi_end: usize,
    after: Option<(usize, usize)>,
}

impl RowPositionEntry {
    pub(super) const fn new(bi_start: usize, bi_end: usize, after: Option<(usize, usize)>) -> Self {
        Self {
            bi_start,
            bi_end,
            after,
        }
    }

    /// Offset of the first byte of the before image.
    #[must_use]
    pub const fn bi_start(&self) -> usize {
        self.bi_start
    }

    /// Offset one past the last byte of the before image.
    #[must_use]
    pub const fn bi_end(&self) -> usize {
        self.bi_end
    }

    /// Offset of the first byte of the after image, if any.
    #[must_use]
    pub fn ai_start(&self) -> Option<usize> {
        self.after.map(|(start, _)| start)
    }

    /// Offset one past the last byte of the after image, if any.
    #[must_use]
    pub fn ai_end(&self) -> Option<usize> {
        self.after.map(|(_, end)| end)
    }

    /// Range of the before image.
    #[must_use]
    pub const fn before(&self) -> Range<usize> {
        self.bi_start..self.bi_end
    }

    /// Range of the after image, if any.
    #[must_use]
    pub fn after(&self) -> Option<Range<usize>> {
        self.after.map(|(start, end)| start..end)
    }
}

/// Handle to an entry owned by a [`RowHashIndex`](super::RowHashIndex).
///
/// Handles stay cheap to copy; a handle whose entry has been deleted is
/// detected through the slot generation and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    pub(super) slot: usize,
    pub(super) generation: u32,
}

impl EntryId {
    /// Position of the entry in the index's slab.
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }
}

/// Chain links of an entry that has been put into the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Link {
    pub(super) key: u32,
    pub(super) prev: Option<usize>,
    pub(super) next: Option<usize>,
}

/// One slab slot. Freed slots bump their generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Slot {
    pub(super) generation: u32,
    pub(super) entry: Option<RowPositionEntry>,
    pub(super) link: Option<Link>,
}

impl Slot {
    pub(super) const fn occupied(entry: RowPositionEntry, generation: u32) -> Self {
        Self {
            generation,
            entry: Some(entry),
            link: None,
        }
    }

    /// Empties the slot so that outstanding handles go stale.
    pub(super) fn release(&mut self) {
        self.entry = None;
        self.link = None;
        self.generation = self.generation.wrapping_add(1);
    }
}
