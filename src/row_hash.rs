//! Hash index over raw row images.
//!
//! When the applier cannot locate a target row through an index it buffers
//! the row changes of an event and looks them up by value instead. The
//! [`RowHashIndex`] keys each buffered change by a CRC-32 over the values of
//! selected columns, chaining changes whose keys collide or repeat in the
//! order they were put.
//!
//! The index borrows the event buffer the entries point into, so the buffer
//! cannot be released while entries are alive. Entries live in a slab owned
//! by the index and are addressed by [`EntryId`] handles. A lookup returns a
//! [`RowCursor`] that owns its position in the chain; cursors cannot be
//! cloned, so each lookup walks its chain exactly once. A cursor only
//! advances on the index that returned it.
//!
//! # Example
//!
//! ```rust
//! use binlog_rowmatch_rs::{ColumnBitmap, RowHashIndex, RowImage, TableDef};
//!
//! // One INT column that may be NULL.
//! let table = TableDef::new(&[3], &[], &[0x01], 0)?;
//! let present = ColumnBitmap::all(1);
//! // Two row images: null bitmap byte then a 4-byte value.
//! let rows = [0x00, 7, 0, 0, 0, 0x00, 7, 0, 0, 0];
//!
//! let mut index = RowHashIndex::new(&table, &rows);
//! index.init()?;
//! for start in [0, 5] {
//!     let entry = index.make_entry_before_only(start, start + 5)?;
//!     index.put_row(entry, &present, &present)?;
//! }
//!
//! let probe = RowImage::new(&table, &present, &rows[..5])?;
//! let mut cursor = index.get(&probe, &present)?.expect("key was put");
//! let mut visited = 1;
//! while index.next(&mut cursor)?.is_some() {
//!     visited += 1;
//! }
//! assert_eq!(visited, 2);
//! index.deinit();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod entry;

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap as IndexMapRaw;

pub use entry::{EntryId, RowPositionEntry};
use entry::{Link, Slot};

use alloc::vec::Vec;

use crate::bitmap::ColumnBitmap;
use crate::errors::Error;
use crate::row_image::RowImage;
use crate::table_def::TableDef;

/// `IndexMap` alias using hashbrown's default hasher for `no_std` compatibility.
type IndexMap<K, V> = IndexMapRaw<K, V, hashbrown::DefaultHashBuilder>;

/// Number of distinct keys reserved by [`RowHashIndex::init`].
const INITIAL_KEYS: usize = 256;

/// Source of the identities that tie cursors to their index.
static NEXT_INDEX_ID: AtomicUsize = AtomicUsize::new(0);

/// Marker hashed before a column holding NULL.
const NULL_MARKER: u8 = 1;
/// Marker hashed before a column holding a value.
const VALUE_MARKER: u8 = 0;

/// Lifecycle of a [`RowHashIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexState {
    /// Created but not yet initialized.
    Uninitialized,
    /// Accepting entries and lookups.
    Ready,
    /// Every entry and all storage have been released.
    TornDown,
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexState::Uninitialized => f.write_str("uninitialized"),
            IndexState::Ready => f.write_str("ready"),
            IndexState::TornDown => f.write_str("torn down"),
        }
    }
}

/// Errors reported by [`RowHashIndex`].
///
/// [`HashIndexError::AllocationFailed`] is the only resource failure; every
/// other variant reports misuse and leaves the index unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashIndexError {
    /// Memory for an entry or for the hash storage could not be obtained.
    #[error("Allocation failed")]
    AllocationFailed,
    /// The operation is not allowed in the current state.
    #[error("Operation not allowed while the index is {0}")]
    InvalidState(IndexState),
    /// An entry offset lies outside the event buffer.
    #[error("Range {start}..{end} lies outside the {len}-byte row buffer")]
    InvalidRange {
        /// Start offset.
        start: usize,
        /// End offset.
        end: usize,
        /// Length of the event buffer.
        len: usize,
    },
    /// The entry is already in a chain.
    #[error("Entry in slot {0} was already put into the index")]
    AlreadyInserted(usize),
    /// The entry was deleted or its slot has been reused.
    #[error("Entry in slot {0} is not live")]
    StaleEntry(usize),
    /// The cursor already reported the end of its chain.
    #[error("Cursor already reached the end of its chain")]
    CursorExhausted,
    /// The cursor was returned by another index.
    #[error("Cursor belongs to another index")]
    ForeignCursor,
    /// The row image was built on a table definition other than the index's.
    #[error("Row image does not use the table definition of the index")]
    TableMismatch,
    /// A row image could not be walked.
    #[error(transparent)]
    Row(Error),
}

impl From<alloc::collections::TryReserveError> for HashIndexError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        HashIndexError::AllocationFailed
    }
}

impl From<indexmap::TryReserveError> for HashIndexError {
    fn from(_: indexmap::TryReserveError) -> Self {
        HashIndexError::AllocationFailed
    }
}

impl From<Error> for HashIndexError {
    fn from(error: Error) -> Self {
        match error {
            Error::AllocationFailed(_) => HashIndexError::AllocationFailed,
            other => HashIndexError::Row(other),
        }
    }
}

/// Position of a lookup inside a chain.
///
/// Returned by [`RowHashIndex::get`] and advanced by [`RowHashIndex::next`].
#[derive(Debug, PartialEq, Eq)]
pub struct RowCursor {
    index: usize,
    key: u32,
    current: EntryId,
    exhausted: bool,
}

impl RowCursor {
    /// The entry the cursor is on.
    #[must_use]
    pub fn entry(&self) -> EntryId {
        self.current
    }

    /// The key shared by every entry of the chain.
    #[must_use]
    pub fn key(&self) -> u32 {
        self.key
    }

    /// Whether [`RowHashIndex::next`] already reported the end of the chain.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// First and last slot of a chain, and its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chain {
    head: usize,
    tail: usize,
    len: usize,
}

/// Computes the key of `image` over the columns set in `mask`.
///
/// Columns of the mask missing from the image are skipped. Each included
/// column contributes a NULL marker, followed by its raw value bytes when
/// it is not NULL.
///
/// # Errors
///
/// Returns the first error met while walking the image.
pub fn row_key(image: &RowImage<'_>, mask: &ColumnBitmap) -> Result<u32, Error> {
    let last = image.present_columns().ones().filter(|&c| mask.get(c)).last();
    let mut hasher = crc32fast::Hasher::new();
    let Some(last) = last else {
        return Ok(hasher.finalize());
    };
    for field in image.fields() {
        let field = field?;
        if mask.get(field.column) {
            match field.value {
                None => hasher.update(&[NULL_MARKER]),
                Some(value) => {
                    hasher.update(&[VALUE_MARKER]);
                    hasher.update(value);
                }
            }
        }
        if field.column == last {
            break;
        }
    }
    Ok(hasher.finalize())
}

/// Hash index over the row images of one event buffer.
#[derive(Debug)]
pub struct RowHashIndex<'buf> {
    id: usize,
    table: &'buf TableDef,
    rows: &'buf [u8],
    state: IndexState,
    chains: IndexMap<u32, Chain>,
    slots: Vec<Slot>,
    free: Vec<usize>,
    len: usize,
}

impl<'buf> RowHashIndex<'buf> {
    /// Creates an uninitialized index over `rows`, sized with `table`.
    #[must_use]
    pub fn new(table: &'buf TableDef, rows: &'buf [u8]) -> Self {
        Self {
            id: NEXT_INDEX_ID.fetch_add(1, Ordering::Relaxed),
            table,
            rows,
            state: IndexState::Uninitialized,
            chains: IndexMap::default(),
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Reserves the hash storage and makes the index ready.
    ///
    /// # Errors
    ///
    /// * [`HashIndexError::InvalidState`] unless the index is uninitialized.
    /// * [`HashIndexError::AllocationFailed`] if storage cannot be reserved.
    pub fn init(&mut self) -> Result<(), HashIndexError> {
        if self.state != IndexState::Uninitialized {
            return Err(HashIndexError::InvalidState(self.state));
        }
        self.chains.try_reserve(INITIAL_KEYS)?;
        self.state = IndexState::Ready;
        tracing::debug!(
            columns = self.table.column_count(),
            buffer = self.rows.len(),
            "row hash index initialized"
        );
        Ok(())
    }

    /// Releases every entry and all storage.
    ///
    /// Entries that were already deleted are not touched twice. Calling it
    /// again, or before [`RowHashIndex::init`], is harmless.
    pub fn deinit(&mut self) {
        if self.state == IndexState::TornDown {
            return;
        }
        tracing::debug!(
            remaining = self.len,
            slots = self.slots.len(),
            "row hash index torn down"
        );
        self.chains = IndexMap::default();
        self.slots = Vec::new();
        self.free = Vec::new();
        self.len = 0;
        self.state = IndexState::TornDown;
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> IndexState {
        self.state
    }

    /// The table definition used to walk row images.
    #[must_use]
    pub fn table(&self) -> &'buf TableDef {
        self.table
    }

    /// The event buffer entries point into.
    #[must_use]
    pub fn rows(&self) -> &'buf [u8] {
        self.rows
    }

    /// Number of entries currently put into the index.
    #[must_use]
    pub fn size(&self) -> usize {
        self.len
    }

    /// Returns true when no entry is in the index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distinct keys that currently have a chain.
    ///
    /// Keys come in the order they were first put until a chain is emptied;
    /// the last key then takes the place of the removed one.
    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.chains.keys().copied()
    }

    /// Number of entries chained under `key`.
    #[must_use]
    pub fn chain_len(&self, key: u32) -> usize {
        self.chains.get(&key).map_or(0, |chain| chain.len)
    }

    fn ensure_ready(&self) -> Result<(), HashIndexError> {
        if self.state == IndexState::Ready {
            Ok(())
        } else {
            Err(HashIndexError::InvalidState(self.state))
        }
    }

    fn check_table(&self, image: &RowImage<'_>) -> Result<(), HashIndexError> {
        let table = image.table();
        if core::ptr::eq(table, self.table) || table == self.table {
            Ok(())
        } else {
            Err(HashIndexError::TableMismatch)
        }
    }

    fn check_range(&self, start: usize, end: usize) -> Result<(), HashIndexError> {
        if start <= end && end <= self.rows.len() {
            Ok(())
        } else {
            Err(HashIndexError::InvalidRange {
                start,
                end,
                len: self.rows.len(),
            })
        }
    }

    fn slot(&self, id: EntryId) -> Result<&Slot, HashIndexError> {
        self.slots
            .get(id.slot)
            .filter(|slot| slot.generation == id.generation && slot.entry.is_some())
            .ok_or(HashIndexError::StaleEntry(id.slot))
    }

    fn id_of(&self, slot: usize) -> EntryId {
        EntryId {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn set_next(&mut self, slot: usize, next: Option<usize>) {
        if let Some(link) = self.slots[slot].link.as_mut() {
            link.next = next;
        }
    }

    fn set_prev(&mut self, slot: usize, prev: Option<usize>) {
        if let Some(link) = self.slots[slot].link.as_mut() {
            link.prev = prev;
        }
    }

    /// Allocates an entry for a before image and an after image.
    ///
    /// The entry is not put into the index.
    ///
    /// # Errors
    ///
    /// * [`HashIndexError::InvalidState`] unless the index is ready.
    /// * [`HashIndexError::InvalidRange`] if a range lies outside the buffer.
    /// * [`HashIndexError::AllocationFailed`] if the slab cannot grow.
    pub fn make_entry(
        &mut self,
        bi_start: usize,
        bi_end: usize,
        ai_start: usize,
        ai_end: usize,
    ) -> Result<EntryId, HashIndexError> {
        self.check_range(ai_start, ai_end)?;
        self.allocate(bi_start, bi_end, Some((ai_start, ai_end)))
    }

    /// Allocates an entry for a before image only, as for delete events.
    ///
    /// # Errors
    ///
    /// Same as [`RowHashIndex::make_entry`].
    pub fn make_entry_before_only(
        &mut self,
        bi_start: usize,
        bi_end: usize,
    ) -> Result<EntryId, HashIndexError> {
        self.allocate(bi_start, bi_end, None)
    }

    fn allocate(
        &mut self,
        bi_start: usize,
        bi_end: usize,
        after: Option<(usize, usize)>,
    ) -> Result<EntryId, HashIndexError> {
        self.ensure_ready()?;
        self.check_range(bi_start, bi_end)?;
        let entry = RowPositionEntry::new(bi_start, bi_end, after);

        if let Some(slot) = self.free.pop() {
            let generation = self.slots[slot].generation;
            self.slots[slot] = Slot::occupied(entry, generation);
            return Ok(EntryId { slot, generation });
        }

        self.slots.try_reserve(1)?;
        // Keep room for every slot on the free list so `del` never allocates.
        self.free.try_reserve(self.slots.len() + 1 - self.free.len())?;
        let slot = self.slots.len();
        self.slots.push(Slot::occupied(entry, 0));
        Ok(EntryId { slot, generation: 0 })
    }

    /// The entry behind `id`.
    ///
    /// # Errors
    ///
    /// [`HashIndexError::StaleEntry`] if the entry was deleted.
    pub fn entry(&self, id: EntryId) -> Result<&RowPositionEntry, HashIndexError> {
        self.slot(id)?
            .entry
            .as_ref()
            .ok_or(HashIndexError::StaleEntry(id.slot))
    }

    /// The before image of `id`, borrowed from the event buffer.
    ///
    /// # Errors
    ///
    /// [`HashIndexError::StaleEntry`] if the entry was deleted.
    pub fn before_image(&self, id: EntryId) -> Result<&'buf [u8], HashIndexError> {
        let range = self.entry(id)?.before();
        Ok(&self.rows[range])
    }

    /// The after image of `id`, if the entry has one.
    ///
    /// # Errors
    ///
    /// [`HashIndexError::StaleEntry`] if the entry was deleted.
    pub fn after_image(&self, id: EntryId) -> Result<Option<&'buf [u8]>, HashIndexError> {
        let rows = self.rows;
        Ok(self.entry(id)?.after().map(|range| &rows[range]))
    }

    /// Puts `id` into the chain for the key of `image` restricted to `mask`.
    ///
    /// Repeated keys are expected: the entry is appended to the chain.
    ///
    /// # Errors
    ///
    /// * [`HashIndexError::InvalidState`] unless the index is ready.
    /// * [`HashIndexError::StaleEntry`] if the entry was deleted.
    /// * [`HashIndexError::AlreadyInserted`] if the entry is already in a chain.
    /// * [`HashIndexError::TableMismatch`] if `image` was built on another
    ///   table definition.
    /// * [`HashIndexError::Row`] if the image cannot be walked.
    /// * [`HashIndexError::AllocationFailed`] if the hash storage cannot grow.
    pub fn put(
        &mut self,
        image: &RowImage<'_>,
        mask: &ColumnBitmap,
        id: EntryId,
    ) -> Result<(), HashIndexError> {
        self.ensure_ready()?;
        self.check_table(image)?;
        if self.slot(id)?.link.is_some() {
            return Err(HashIndexError::AlreadyInserted(id.slot));
        }
        let key = row_key(image, mask)?;
        self.chains.try_reserve(1)?;

        let prev = match self.chains.get_mut(&key) {
            Some(chain) => {
                let tail = chain.tail;
                chain.tail = id.slot;
                chain.len += 1;
                Some(tail)
            }
            None => {
                self.chains.insert(
                    key,
                    Chain {
                        head: id.slot,
                        tail: id.slot,
                        len: 1,
                    },
                );
                None
            }
        };
        if let Some(tail) = prev {
            self.set_next(tail, Some(id.slot));
        }
        self.slots[id.slot].link = Some(Link {
            key,
            prev,
            next: None,
        });
        self.len += 1;
        tracing::trace!(key, slot = id.slot, size = self.len, "put row");
        Ok(())
    }

    /// Puts `id` keyed by its own before image.
    ///
    /// `present` lists the columns included in the image.
    ///
    /// # Errors
    ///
    /// Same as [`RowHashIndex::put`].
    pub fn put_row(
        &mut self,
        id: EntryId,
        present: &ColumnBitmap,
        mask: &ColumnBitmap,
    ) -> Result<(), HashIndexError> {
        self.ensure_ready()?;
        let data = self.before_image(id)?;
        let image = RowImage::new(self.table, present, data)?;
        self.put(&image, mask, id)
    }

    /// Looks up the chain for the key of `image` restricted to `mask`.
    ///
    /// The returned cursor is on the first entry of the chain. Entries of a
    /// chain share a key, not necessarily their values, so callers compare
    /// the rows themselves.
    ///
    /// # Errors
    ///
    /// * [`HashIndexError::InvalidState`] unless the index is ready.
    /// * [`HashIndexError::TableMismatch`] if `image` was built on another
    ///   table definition.
    /// * [`HashIndexError::Row`] if the image cannot be walked.
    pub fn get(
        &self,
        image: &RowImage<'_>,
        mask: &ColumnBitmap,
    ) -> Result<Option<RowCursor>, HashIndexError> {
        self.ensure_ready()?;
        self.check_table(image)?;
        let key = row_key(image, mask)?;
        let cursor = self.chains.get(&key).map(|chain| RowCursor {
            index: self.id,
            key,
            current: self.id_of(chain.head),
            exhausted: false,
        });
        tracing::trace!(key, found = cursor.is_some(), "get row");
        Ok(cursor)
    }

    /// Advances `cursor` to the next entry of its chain.
    ///
    /// Returns `Ok(None)` at the end of the chain and marks the cursor
    /// exhausted without moving it.
    ///
    /// # Errors
    ///
    /// * [`HashIndexError::InvalidState`] unless the index is ready.
    /// * [`HashIndexError::ForeignCursor`] if another index returned the cursor.
    /// * [`HashIndexError::CursorExhausted`] if the end was already reported.
    /// * [`HashIndexError::StaleEntry`] if the cursor's entry was deleted.
    ///
    /// The cursor is left unchanged on error.
    pub fn next(&self, cursor: &mut RowCursor) -> Result<Option<EntryId>, HashIndexError> {
        self.ensure_ready()?;
        if cursor.index != self.id {
            return Err(HashIndexError::ForeignCursor);
        }
        if cursor.exhausted {
            return Err(HashIndexError::CursorExhausted);
        }
        let link = self
            .slot(cursor.current)?
            .link
            .ok_or(HashIndexError::StaleEntry(cursor.current.slot))?;
        if let Some(next) = link.next {
            cursor.current = self.id_of(next);
            Ok(Some(cursor.current))
        } else {
            cursor.exhausted = true;
            Ok(None)
        }
    }

    /// Removes `id` from its chain, if any, and frees it.
    ///
    /// Entries that were made but never put are freed as well.
    ///
    /// # Errors
    ///
    /// * [`HashIndexError::InvalidState`] unless the index is ready.
    /// * [`HashIndexError::StaleEntry`] if the entry was already deleted.
    pub fn del(&mut self, id: EntryId) -> Result<(), HashIndexError> {
        self.ensure_ready()?;
        let link = self.slot(id)?.link;

        if let Some(Link { key, prev, next }) = link {
            if let Some(prev) = prev {
                self.set_next(prev, next);
            }
            if let Some(next) = next {
                self.set_prev(next, prev);
            }
            let emptied = match self.chains.get_mut(&key) {
                Some(chain) => {
                    chain.len -= 1;
                    if chain.head == id.slot {
                        if let Some(next) = next {
                            chain.head = next;
                        }
                    }
                    if chain.tail == id.slot {
                        if let Some(prev) = prev {
                            chain.tail = prev;
                        }
                    }
                    chain.len == 0
                }
                None => false,
            };
            if emptied {
                self.chains.swap_remove(&key);
            }
            self.len -= 1;
            tracing::trace!(key, slot = id.slot, size = self.len, "deleted row");
        }

        self.slots[id.slot].release();
        self.free.push(id.slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_table() -> TableDef {
        // INT, INT
        TableDef::new(&[3, 3], &[], &[0x03], 0).unwrap()
    }

    /// Encodes rows of two INT columns, both present, none NULL.
    fn buffer(rows: &[(u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        for (a, b) in rows {
            out.push(0x00);
            out.extend_from_slice(&a.to_le_bytes());
            out.extend_from_slice(&b.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_states() {
        let table = int_table();
        let rows = buffer(&[(1, 2)]);
        let mut index = RowHashIndex::new(&table, &rows);
        assert_eq!(index.state(), IndexState::Uninitialized);
        assert_eq!(
            index.make_entry_before_only(0, 9),
            Err(HashIndexError::InvalidState(IndexState::Uninitialized))
        );
        index.init().unwrap();
        assert_eq!(
            index.init(),
            Err(HashIndexError::InvalidState(IndexState::Ready))
        );
        index.deinit();
        index.deinit();
        assert_eq!(index.state(), IndexState::TornDown);
        assert_eq!(
            index.make_entry_before_only(0, 9),
            Err(HashIndexError::InvalidState(IndexState::TornDown))
        );
    }

    #[test]
    fn test_invalid_ranges() {
        let table = int_table();
        let rows = buffer(&[(1, 2)]);
        let mut index = RowHashIndex::new(&table, &rows);
        index.init().unwrap();
        assert_eq!(
            index.make_entry_before_only(0, 10),
            Err(HashIndexError::InvalidRange {
                start: 0,
                end: 10,
                len: 9
            })
        );
        assert!(matches!(
            index.make_entry(0, 9, 5, 4),
            Err(HashIndexError::InvalidRange { .. })
        ));
        assert!(index.make_entry(0, 9, 9, 9).is_ok());
    }

    #[test]
    fn test_mask_selects_key_columns() {
        let table = int_table();
        let rows = buffer(&[(1, 2), (1, 3), (4, 2)]);
        let present = ColumnBitmap::all(2);
        let first = ColumnBitmap::from_columns(2, &[0]);
        let (table, present_ref, rows) = (&table, &present, &rows);
        let image = move |i: usize| RowImage::new(table, present_ref, &rows[i * 9..]).unwrap();

        let k0 = row_key(&image(0), &first).unwrap();
        assert_eq!(k0, row_key(&image(1), &first).unwrap());
        assert_ne!(k0, row_key(&image(2), &first).unwrap());
        assert_ne!(
            row_key(&image(0), &present).unwrap(),
            row_key(&image(1), &present).unwrap()
        );
    }

    #[test]
    fn test_null_differs_from_value() {
        let table = int_table();
        let present = ColumnBitmap::all(2);
        // First column NULL, second 0.
        let with_null = [0x01, 0, 0, 0, 0];
        let with_zero = [0x00, 0, 0, 0, 0, 0, 0, 0, 0];
        let a = RowImage::new(&table, &present, &with_null).unwrap();
        let b = RowImage::new(&table, &present, &with_zero).unwrap();
        assert_ne!(row_key(&a, &present).unwrap(), row_key(&b, &present).unwrap());
    }

    #[test]
    fn test_reused_slot_rejects_old_handle() {
        let table = int_table();
        let rows = buffer(&[(1, 2)]);
        let mut index = RowHashIndex::new(&table, &rows);
        index.init().unwrap();
        let old = index.make_entry_before_only(0, 9).unwrap();
        index.del(old).unwrap();
        let new = index.make_entry_before_only(0, 9).unwrap();
        assert_eq!(new.slot(), old.slot());
        assert_eq!(index.entry(old), Err(HashIndexError::StaleEntry(old.slot())));
        assert_eq!(index.del(old), Err(HashIndexError::StaleEntry(old.slot())));
        assert!(index.entry(new).is_ok());
    }

    #[test]
    fn test_put_twice_is_rejected() {
        let table = int_table();
        let rows = buffer(&[(1, 2)]);
        let present = ColumnBitmap::all(2);
        let mut index = RowHashIndex::new(&table, &rows);
        index.init().unwrap();
        let id = index.make_entry_before_only(0, 9).unwrap();
        index.put_row(id, &present, &present).unwrap();
        assert_eq!(
            index.put_row(id, &present, &present),
            Err(HashIndexError::AlreadyInserted(id.slot()))
        );
        assert_eq!(index.size(), 1);
    }

    #[test]
    fn test_delete_middle_of_chain() {
        let table = int_table();
        let rows = buffer(&[(5, 5), (5, 5), (5, 5)]);
        let present = ColumnBitmap::all(2);
        let mut index = RowHashIndex::new(&table, &rows);
        index.init().unwrap();
        let ids: Vec<EntryId> = (0..3)
            .map(|i| {
                let id = index.make_entry_before_only(i * 9, i * 9 + 9).unwrap();
                index.put_row(id, &present, &present).unwrap();
                id
            })
            .collect();

        index.del(ids[1]).unwrap();
        let probe = RowImage::new(&table, &present, &rows).unwrap();
        let mut cursor = index.get(&probe, &present).unwrap().unwrap();
        assert_eq!(cursor.entry(), ids[0]);
        assert_eq!(index.next(&mut cursor), Ok(Some(ids[2])));
        assert_eq!(index.next(&mut cursor), Ok(None));
        assert_eq!(index.chain_len(cursor.key()), 2);

        index.del(ids[0]).unwrap();
        let cursor = index.get(&probe, &present).unwrap().unwrap();
        assert_eq!(cursor.entry(), ids[2]);
    }

    #[test]
    fn test_keys_after_emptying_a_chain() {
        let table = int_table();
        let rows = buffer(&[(1, 1), (2, 2), (3, 3)]);
        let present = ColumnBitmap::all(2);
        let mut index = RowHashIndex::new(&table, &rows);
        index.init().unwrap();
        let ids: Vec<EntryId> = (0..3)
            .map(|i| {
                let id = index.make_entry_before_only(i * 9, i * 9 + 9).unwrap();
                index.put_row(id, &present, &present).unwrap();
                id
            })
            .collect();
        let before: Vec<u32> = index.keys().collect();
        assert_eq!(before.len(), 3);

        index.del(ids[0]).unwrap();
        let after: Vec<u32> = index.keys().collect();
        assert_eq!(after, [before[2], before[1]]);
        assert_eq!(index.chain_len(before[0]), 0);
    }

    #[test]
    fn test_image_of_another_table_is_rejected() {
        let table = int_table();
        // Same bytes read as TINYINT, INT would produce a different key.
        let tiny = TableDef::new(&[1, 3], &[], &[0x03], 0).unwrap();
        let rows = buffer(&[(7, 8)]);
        let present = ColumnBitmap::all(2);
        let mut index = RowHashIndex::new(&table, &rows);
        index.init().unwrap();
        let id = index.make_entry_before_only(0, 9).unwrap();

        let foreign = RowImage::new(&tiny, &present, &rows).unwrap();
        assert_eq!(
            index.put(&foreign, &present, id),
            Err(HashIndexError::TableMismatch)
        );
        assert!(index.is_empty());
        assert_eq!(
            index.get(&foreign, &present).unwrap_err(),
            HashIndexError::TableMismatch
        );

        // An equal definition held elsewhere is accepted.
        let copy = table.clone();
        let own = RowImage::new(&copy, &present, &rows).unwrap();
        index.put(&own, &present, id).unwrap();
        assert_eq!(index.get(&own, &present).unwrap().unwrap().entry(), id);
    }

    #[test]
    fn test_cursor_only_advances_on_its_index() {
        let table = int_table();
        let rows = buffer(&[(1, 1), (1, 1)]);
        let present = ColumnBitmap::all(2);
        let mut first = RowHashIndex::new(&table, &rows);
        let mut second = RowHashIndex::new(&table, &rows);
        for index in [&mut first, &mut second] {
            index.init().unwrap();
            for i in 0..2 {
                let id = index.make_entry_before_only(i * 9, i * 9 + 9).unwrap();
                index.put_row(id, &present, &present).unwrap();
            }
        }

        let probe = RowImage::new(&table, &present, &rows).unwrap();
        let mut cursor = first.get(&probe, &present).unwrap().unwrap();
        let start = cursor.entry();
        // Both indexes hold the same slots and generations.
        assert_eq!(second.next(&mut cursor), Err(HashIndexError::ForeignCursor));
        assert_eq!(cursor.entry(), start);
        assert!(!cursor.is_exhausted());
        assert!(first.next(&mut cursor).unwrap().is_some());
    }

    #[test]
    fn test_keys_in_first_put_order() {
        let table = int_table();
        let rows = buffer(&[(1, 1), (2, 2), (1, 1)]);
        let present = ColumnBitmap::all(2);
        let mut index = RowHashIndex::new(&table, &rows);
        index.init().unwrap();
        for i in 0..3 {
            let id = index.make_entry_before_only(i * 9, i * 9 + 9).unwrap();
            index.put_row(id, &present, &present).unwrap();
        }
        let keys: Vec<u32> = index.keys().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(index.chain_len(keys[0]), 2);
        assert_eq!(index.chain_len(keys[1]), 1);
    }
}
