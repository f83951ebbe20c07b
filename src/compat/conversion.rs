//! Conversion tables.
//!
//! When the primary's columns differ from the replica's but can be
//! converted, row values are first unpacked into a staging table shaped
//! like the primary's columns and then converted field by field into the
//! live table. [`ConversionTable`] describes that staging table. It is a
//! plain value built from the decoded table map and a snapshot of the live
//! schema, and it is never part of the live schema itself.

use alloc::string::String;
use alloc::vec::Vec;

use crate::column_type::{ColumnType, FieldType, max_display_length};
use crate::errors::Error;
use crate::schema::TargetTable;
use crate::table_def::TableDef;

/// Direction of a column conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    /// The replica column can hold every value of the primary column.
    NonLossy,
    /// Values may be truncated or rounded.
    Lossy,
}

/// One column whose primary representation differs from the replica's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldConversion {
    /// Column index.
    pub column: usize,
    /// Normalized type on the primary.
    pub source: ColumnType,
    /// Normalized type on the replica.
    pub target: ColumnType,
    /// Whether the conversion may lose information.
    pub kind: ConversionKind,
}

/// A staging column of a [`ConversionTable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversionColumn {
    /// Column index, shared by the table map and the live table.
    pub index: usize,
    /// Normalized type and metadata as sent by the primary.
    pub column_type: ColumnType,
    /// Maximum display length of the staged value.
    pub max_length: u32,
    /// Precision of a `DECIMAL`.
    pub precision: Option<u8>,
    /// Digits after the decimal point of a `DECIMAL`.
    pub decimals: Option<u8>,
    /// Pack length of ENUM, SET and blob values.
    pub pack_length: Option<u8>,
    /// Character set borrowed from the live column.
    pub charset: Option<u16>,
    /// Signedness borrowed from the live column.
    pub unsigned: bool,
    /// Staging fields always accept NULL.
    pub nullable: bool,
}

/// Virtual table used to stage rows that need conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversionTable {
    /// Name of the live table the rows are converted into.
    pub target: String,
    /// One staging column per column shared by the two schemas.
    pub columns: Vec<ConversionColumn>,
}

/// Everything the applier needs to convert rows of one table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversionSpec {
    /// One slot per shared column; `None` where no conversion is needed.
    pub conversions: Vec<Option<FieldConversion>>,
    /// The staging table.
    pub table: ConversionTable,
}

impl ConversionSpec {
    /// Iterates over the columns that need converting.
    pub fn converted_columns(&self) -> impl Iterator<Item = &FieldConversion> {
        self.conversions.iter().flatten()
    }

    /// The conversion for `column`, if it needs one.
    #[must_use]
    pub fn conversion(&self, column: usize) -> Option<&FieldConversion> {
        self.conversions.get(column).and_then(Option::as_ref)
    }
}

/// Display length of a `DECIMAL(precision, scale)`: digits, point and sign.
fn decimal_display_length(precision: u8, scale: u8, unsigned: bool) -> u32 {
    let precision = u32::from(precision.min(65));
    precision + u32::from(scale > 0) + u32::from(!unsigned && precision > 0)
}

impl TableDef {
    /// Builds the staging table for rows of this table map.
    ///
    /// Columns correspond one to one with the table map's columns, up to
    /// the number of columns the live table has. Facts the table map does
    /// not carry, such as character sets and signedness, are borrowed from
    /// the live column at the same position.
    ///
    /// # Errors
    ///
    /// * [`Error::UnsupportedConversion`] for old-style `DECIMAL` columns and
    ///   unknown type codes, which cannot be staged.
    /// * [`Error::ColumnIndexOutOfBounds`] if the live table reports fewer
    ///   column definitions than its column count.
    /// * [`Error::AllocationFailed`] if the column vector cannot be allocated.
    pub fn create_conversion_table(&self, target: &impl TargetTable) -> Result<ConversionTable, Error> {
        let shared = self.column_count().min(target.number_of_columns());
        let mut columns = Vec::new();
        columns.try_reserve_exact(shared)?;

        for index in 0..shared {
            let live = target
                .column(index)
                .ok_or(Error::ColumnIndexOutOfBounds(index, target.number_of_columns()))?;
            let column_type = self.column(index);
            let metadata = column_type.metadata;
            let field_type = column_type.field_type;

            let [high, low] = metadata.to_be_bytes();
            let mut max_length = max_display_length(field_type, metadata);
            let mut precision = None;
            let mut decimals = None;
            let mut pack_length = None;

            match field_type {
                FieldType::Enum | FieldType::Set => {
                    pack_length = Some(low);
                }
                FieldType::NewDecimal => {
                    precision = Some(high);
                    decimals = Some(low);
                    max_length = decimal_display_length(high, low, live.unsigned);
                }
                FieldType::TinyBlob
                | FieldType::MediumBlob
                | FieldType::LongBlob
                | FieldType::Blob
                | FieldType::Geometry
                | FieldType::Json => {
                    pack_length = Some(low);
                }
                FieldType::Decimal | FieldType::Unknown(_) => {
                    tracing::warn!(
                        table = target.name(),
                        column = index,
                        code = field_type.code(),
                        "column type cannot be staged in a conversion table"
                    );
                    return Err(Error::UnsupportedConversion {
                        column: index,
                        code: self.raw_type(index).code(),
                    });
                }
                _ => {}
            }

            let carries_text =
                field_type.is_string() || matches!(field_type, FieldType::Enum | FieldType::Set);
            let numeric = field_type.is_integer() || field_type.is_real();

            columns.push(ConversionColumn {
                index,
                column_type,
                max_length,
                precision,
                decimals,
                pack_length,
                charset: if carries_text { live.charset } else { None },
                unsigned: numeric && live.unsigned,
                nullable: true,
            });
        }

        tracing::debug!(
            table = target.name(),
            columns = columns.len(),
            "created conversion table"
        );

        Ok(ConversionTable {
            target: String::from(target.name()),
            columns,
        })
    }
}
