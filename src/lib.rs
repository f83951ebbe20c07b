#![doc = include_str!("../README.md")]
#![no_std]
#![deny(clippy::mod_module_files)]

extern crate alloc;

pub mod bitmap;
pub mod column_type;
pub mod compat;
pub mod errors;
pub mod mapped_table;
pub mod row_hash;
pub mod row_image;
pub mod schema;
pub mod table_def;
pub mod table_map;
#[cfg(feature = "testing")]
pub mod testing;

// Re-export main types
pub use bitmap::ColumnBitmap;
pub use column_type::{ColumnType, FieldType};
pub use compat::{
    Compatibility, ConversionColumn, ConversionKind, ConversionPolicy, ConversionSpec,
    ConversionTable, FieldConversion, Incompatibility, PolicyParseError, conversion_order,
};
pub use mapped_table::MappedTable;
pub use row_hash::{
    EntryId, HashIndexError, IndexState, RowCursor, RowHashIndex, RowPositionEntry, row_key,
};
pub use row_image::{Field, Fields, RowImage};
pub use schema::{ColumnDefinition, SimpleTable, TargetTable};
pub use table_def::TableDef;
pub use table_map::{ParseError, TableMapEvent};

// Re-export errors
pub use errors::Error;
