//! Submodule defining the errors used across the crate.

use alloc::collections::TryReserveError;

/// Errors that can occur while decoding table definitions, walking row
/// images or staging conversion tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The provided index is out of bounds for the number of columns in the table.
    #[error("Column index {0} out of bounds for table with {1} columns")]
    ColumnIndexOutOfBounds(usize, usize),

    /// The metadata array ended before every column that needs metadata was decoded.
    #[error("Field metadata truncated at column {column}: needed {needed} bytes, {available} left")]
    MetadataTruncated {
        /// Column whose metadata could not be read.
        column: usize,
        /// Bytes the column type requires.
        needed: usize,
        /// Bytes left in the metadata array.
        available: usize,
    },

    /// The null-capability bitmap is shorter than one bit per column.
    #[error("Null bitmap of {actual} bytes is too short for {columns} columns")]
    NullBitmapTruncated {
        /// Number of columns in the table definition.
        columns: usize,
        /// Length of the supplied bitmap.
        actual: usize,
    },

    /// A value in a row image extends past the end of the buffer.
    #[error("Value of column {column} truncated: needed {needed} bytes, {available} left")]
    TruncatedValue {
        /// Column being measured.
        column: usize,
        /// Bytes the value claims to occupy.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// The field size of this column type cannot be computed.
    #[error("Unsupported field type {code} (metadata {metadata:#06x}) at column {column}")]
    UnsupportedFieldType {
        /// Column index.
        column: usize,
        /// Wire type code.
        code: u8,
        /// Field metadata.
        metadata: u16,
    },

    /// The column type cannot be staged in a conversion table.
    #[error("Cannot create conversion field for column {column} of type {code}")]
    UnsupportedConversion {
        /// Column index.
        column: usize,
        /// Wire type code.
        code: u8,
    },

    /// Memory for a temporary structure could not be obtained.
    #[error("Allocation failed: {0}")]
    AllocationFailed(#[from] TryReserveError),
}
