//! Column bitmaps as carried by binlog events.
//!
//! Bits are counted from the least significant bit of the first byte, so
//! column `i` lives in byte `i / 8` under mask `1 << (i % 8)`. The same layout
//! is used for the null-capability bitmap of a table map, the per-row null
//! markers of a row image, the set of columns present in a rows event and
//! the column masks handed to the row hash index.

use alloc::vec;
use alloc::vec::Vec;

/// A fixed-length bitmap with one bit per column.
#[derive(Clone, Default, PartialEq, Eq, Debug, Hash)]
pub struct ColumnBitmap {
    bytes: Vec<u8>,
    len: usize,
}

/// Number of bytes needed to hold `bits` bits.
#[inline]
#[must_use]
pub const fn bytes_for(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Tests bit `i` of an LSB-first byte bitmap.
///
/// # Panics
///
/// Panics if `i / 8` is past the end of `bytes`.
#[inline]
#[must_use]
pub fn bit_is_set(bytes: &[u8], i: usize) -> bool {
    let mask = 1u8 << (i % 8);
    bytes[i / 8] & mask == mask
}

impl ColumnBitmap {
    /// Creates a bitmap of `len` columns with every bit clear.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; bytes_for(len)],
            len,
        }
    }

    /// Creates a bitmap of `len` columns with every bit set.
    #[must_use]
    pub fn all(len: usize) -> Self {
        let mut bitmap = Self::new(len);
        bitmap.set_all();
        bitmap
    }

    /// Creates a bitmap of `len` columns with the given columns set.
    ///
    /// # Panics
    ///
    /// Panics if any index is not below `len`.
    #[must_use]
    pub fn from_columns(len: usize, columns: &[usize]) -> Self {
        let mut bitmap = Self::new(len);
        for &column in columns {
            bitmap.set(column, true);
        }
        bitmap
    }

    /// Copies a wire bitmap of `len` columns.
    ///
    /// Returns `None` if `bytes` holds fewer than `len` bits. Bits past `len`
    /// in the last byte are cleared.
    #[must_use]
    pub fn from_bytes(bytes: &[u8], len: usize) -> Option<Self> {
        let needed = bytes_for(len);
        let mut owned = bytes.get(..needed)?.to_vec();
        if len % 8 != 0 {
            if let Some(last) = owned.last_mut() {
                *last &= (1u8 << (len % 8)) - 1;
            }
        }
        Some(Self { bytes: owned, len })
    }

    /// Number of columns covered by the bitmap.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the bitmap covers no columns at all.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The underlying LSB-first bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Sets or clears bit `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    pub fn set(&mut self, i: usize, val: bool) {
        assert!(i < self.len, "bit {i} out of range for bitmap of {} bits", self.len);
        if val {
            self.bytes[i / 8] |= 1 << (i % 8);
        } else {
            self.bytes[i / 8] &= !(1 << (i % 8));
        }
    }

    /// Reads bit `i`; bits past the end read as clear.
    #[inline]
    #[must_use]
    pub fn get(&self, i: usize) -> bool {
        i < self.len && bit_is_set(&self.bytes, i)
    }

    /// Sets every bit.
    pub fn set_all(&mut self) {
        self.bytes.fill(u8::MAX);
        if self.len % 8 != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last = (1u8 << (self.len % 8)) - 1;
            }
        }
    }

    /// Clears every bit.
    pub fn clear_all(&mut self) {
        self.bytes.fill(0);
    }

    /// Number of set bits.
    #[must_use]
    pub fn count(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Returns true if at least one bit is set.
    #[must_use]
    pub fn any(&self) -> bool {
        self.bytes.iter().any(|b| *b != 0)
    }

    /// Iterates over the indices of the set bits in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&i| bit_is_set(&self.bytes, i))
    }
}
