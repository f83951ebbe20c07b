//! Table definitions decoded from table map events.
//!
//! A [`TableDef`] is the replica's view of the primary's table: one type
//! code per column, the metadata needed to size and convert each column,
//! and the bitmap of columns that may hold NULL. It is built once per table
//! map event and never mutated; a new table map for the same table replaces
//! it wholesale.

use alloc::vec::Vec;

use crate::bitmap::{bit_is_set, bytes_for};
use crate::column_type::{
    ColumnType, FieldType, datetime2_binary_length, decimal_binary_size, string_max_length,
    time2_binary_length, timestamp2_binary_length,
};
use crate::errors::Error;

/// Column types, metadata and null capabilities of a replicated table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableDef {
    /// Raw type codes, one per column, aliases unresolved.
    types: Vec<FieldType>,
    /// Decoded metadata, one slot per column (0 when the type has none).
    metadata: Vec<u16>,
    /// Whether the event carried a metadata array at all.
    has_metadata: bool,
    /// Null-capability bitmap, `ceil(columns / 8)` bytes.
    null_bits: Vec<u8>,
    /// Table flags, stored but not interpreted.
    flags: u16,
}

/// Reads `n` little-endian bytes from the start of `data` as an unsigned length.
fn read_length(data: &[u8], n: usize, column: usize) -> Result<usize, Error> {
    let bytes = data.get(..n).ok_or(Error::TruncatedValue {
        column,
        needed: n,
        available: data.len(),
    })?;
    Ok(bytes
        .iter()
        .rev()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b)))
}

/// Decodes the per-column metadata array of a table map.
fn decode_metadata(types: &[FieldType], raw: &[u8]) -> Result<Vec<u16>, Error> {
    let mut metadata = Vec::new();
    metadata.try_reserve_exact(types.len())?;

    let mut pos = 0;
    for (column, &field_type) in types.iter().enumerate() {
        let needed = field_type.metadata_len();
        let bytes = raw.get(pos..pos + needed).ok_or(Error::MetadataTruncated {
            column,
            needed,
            available: raw.len().saturating_sub(pos),
        })?;
        pos += needed;

        let value = match (field_type, bytes) {
            (_, [b]) => u16::from(*b),
            // Bit length and byte length, low byte first.
            (FieldType::Bit, [bits, whole]) => u16::from(*bits) | (u16::from(*whole) << 8),
            // Maximum length, little-endian.
            (FieldType::VarChar | FieldType::VarString, [lo, hi]) => u16::from_le_bytes([*lo, *hi]),
            // Real type and length, or precision and scale: high byte first.
            (_, [hi, lo]) => u16::from_be_bytes([*hi, *lo]),
            _ => 0,
        };
        metadata.push(value);
    }
    Ok(metadata)
}

impl TableDef {
    /// Decodes a table definition.
    ///
    /// # Arguments
    ///
    /// * `types` - One type code per column.
    /// * `metadata` - The packed metadata array; empty when the event carries none.
    /// * `null_bitmap` - Null-capability bits, at least `ceil(types.len() / 8)` bytes.
    /// * `flags` - Table flags from the event.
    ///
    /// # Errors
    ///
    /// Returns an error if memory cannot be reserved, if a non-empty metadata
    /// array is shorter than the column types require, or if the null bitmap
    /// is too short.
    pub fn new(types: &[u8], metadata: &[u8], null_bitmap: &[u8], flags: u16) -> Result<Self, Error> {
        let columns = types.len();
        let null_len = bytes_for(columns);
        if null_bitmap.len() < null_len {
            return Err(Error::NullBitmapTruncated {
                columns,
                actual: null_bitmap.len(),
            });
        }

        let mut decoded_types = Vec::new();
        decoded_types.try_reserve_exact(columns)?;
        decoded_types.extend(types.iter().copied().map(FieldType::from));

        let has_metadata = !metadata.is_empty();
        let field_metadata = if has_metadata {
            decode_metadata(&decoded_types, metadata)?
        } else {
            let mut zeros = Vec::new();
            zeros.try_reserve_exact(columns)?;
            zeros.resize(columns, 0);
            zeros
        };

        let mut null_bits = Vec::new();
        null_bits.try_reserve_exact(null_len)?;
        null_bits.extend_from_slice(&null_bitmap[..null_len]);

        tracing::debug!(columns, has_metadata, flags, "decoded table definition");

        Ok(Self {
            types: decoded_types,
            metadata: field_metadata,
            has_metadata,
            null_bits,
            flags,
        })
    }

    /// Number of columns there is type data for.
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.types.len()
    }

    /// Table flags as carried by the event.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Returns true if the event carried a metadata array.
    #[inline]
    #[must_use]
    pub fn has_metadata(&self) -> bool {
        self.has_metadata
    }

    #[inline]
    fn check_index(&self, index: usize) {
        assert!(
            index < self.types.len(),
            "column index {index} out of bounds for table with {} columns",
            self.types.len()
        );
    }

    /// The type code exactly as sent, aliases unresolved.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.column_count()`.
    #[must_use]
    pub fn raw_type(&self, index: usize) -> FieldType {
        self.check_index(index);
        self.types[index]
    }

    /// The real type of a column.
    ///
    /// A `STRING` code whose metadata marks it as ENUM or SET is reported as
    /// such, and the legacy `DATE` code is reported as `NEWDATE`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.column_count()`.
    #[must_use]
    pub fn column_type(&self, index: usize) -> FieldType {
        self.check_index(index);
        ColumnType::new(self.types[index], self.metadata[index]).normalized_type()
    }

    /// The normalized type of a column together with its metadata.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.column_count()`.
    #[must_use]
    pub fn column(&self, index: usize) -> ColumnType {
        ColumnType::new(self.column_type(index), self.field_metadata(index))
    }

    /// Checked variant of [`TableDef::column`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnIndexOutOfBounds`] for an index past the last column.
    pub fn try_column(&self, index: usize) -> Result<ColumnType, Error> {
        if index < self.column_count() {
            Ok(self.column(index))
        } else {
            Err(Error::ColumnIndexOutOfBounds(index, self.column_count()))
        }
    }

    /// Iterates over the normalized column types.
    pub fn columns(&self) -> impl ExactSizeIterator<Item = ColumnType> + '_ {
        (0..self.column_count()).map(|i| self.column(i))
    }

    /// Extra metadata of a column, or 0 when the event carried none.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.column_count()`.
    #[must_use]
    pub fn field_metadata(&self, index: usize) -> u16 {
        self.check_index(index);
        if self.has_metadata {
            self.metadata[index]
        } else {
            0
        }
    }

    /// Whether the column may be NULL on the primary.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.column_count()`.
    #[must_use]
    pub fn maybe_null(&self, index: usize) -> bool {
        self.check_index(index);
        bit_is_set(&self.null_bits, index)
    }

    /// Number of bytes the value of column `index` occupies at the start of `data`.
    ///
    /// `data` must start at a present, non-NULL value: checking the null
    /// capability and the row's own null bits is up to the caller.
    ///
    /// # Errors
    ///
    /// * [`Error::TruncatedValue`] if the length prefix or the value itself
    ///   extends past the end of `data`.
    /// * [`Error::UnsupportedFieldType`] for unknown type codes and blobs
    ///   with an invalid pack length.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.column_count()`.
    pub fn calc_field_size(&self, index: usize, data: &[u8]) -> Result<usize, Error> {
        let field_type = self.column_type(index);
        let metadata = self.metadata[index];
        let unsupported = || Error::UnsupportedFieldType {
            column: index,
            code: self.types[index].code(),
            metadata,
        };

        let length = match field_type {
            FieldType::NewDecimal => {
                let [precision, scale] = metadata.to_be_bytes();
                decimal_binary_size(precision, scale)
            }
            FieldType::Decimal | FieldType::Float | FieldType::Double => usize::from(metadata),
            FieldType::Set | FieldType::Enum => usize::from(metadata & 0xff),
            FieldType::String => {
                let prefix = if string_max_length(metadata) > 255 { 2 } else { 1 };
                prefix + read_length(data, prefix, index)?
            }
            FieldType::Year | FieldType::Tiny => 1,
            FieldType::Short => 2,
            FieldType::Int24 => 3,
            FieldType::Long => 4,
            FieldType::LongLong => 8,
            FieldType::Null => 0,
            FieldType::NewDate | FieldType::Date | FieldType::Time => 3,
            FieldType::Time2 => time2_binary_length(metadata),
            FieldType::Timestamp => 4,
            FieldType::Timestamp2 => timestamp2_binary_length(metadata),
            FieldType::DateTime => 8,
            FieldType::DateTime2 => datetime2_binary_length(metadata),
            FieldType::Bit => {
                let bytes = usize::from(metadata >> 8);
                let bits = metadata & 0xff;
                bytes + usize::from(bits > 0)
            }
            FieldType::VarChar | FieldType::VarString => {
                let prefix = if metadata > 255 { 2 } else { 1 };
                prefix + read_length(data, prefix, index)?
            }
            FieldType::TinyBlob
            | FieldType::MediumBlob
            | FieldType::LongBlob
            | FieldType::Blob
            | FieldType::Geometry
            | FieldType::Json => {
                let prefix = usize::from(metadata);
                if !(1..=4).contains(&prefix) {
                    return Err(unsupported());
                }
                prefix + read_length(data, prefix, index)?
            }
            FieldType::Unknown(_) => return Err(unsupported()),
        };

        if length > data.len() {
            return Err(Error::TruncatedValue {
                column: index,
                needed: length,
                available: data.len(),
            });
        }
        Ok(length)
    }
}
