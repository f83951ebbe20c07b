//! Schema compatibility between a table map and a live table.
//!
//! A table map is compatible with a live table when, for every column the
//! two have in common, the primary's type either equals the replica's or
//! converts into it under the configured [`ConversionPolicy`]. Either side
//! may have extra trailing columns, which lets columns be added or dropped
//! on one side of the replication stream.
//!
//! Each column pair gets a conversion order:
//!
//! | Order | Meaning | Needs |
//! |-------|---------|-------|
//! | `Equal` | same type and size | nothing |
//! | `Less` | replica column is wider | `ALL_NON_LOSSY` |
//! | `Greater` | replica column is narrower | `ALL_LOSSY` |
//!
//! Pairs outside the integer, decimal/float and string families never
//! convert.

mod conversion;
mod policy;

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;

pub use conversion::{
    ConversionColumn, ConversionKind, ConversionSpec, ConversionTable, FieldConversion,
};
pub use policy::{ConversionPolicy, PolicyParseError};

use crate::column_type::{ColumnType, FieldType, max_display_length};
use crate::errors::Error;
use crate::schema::TargetTable;
use crate::table_def::TableDef;

/// Diagnostics for the first column that cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Incompatibility {
    /// Offending column index.
    pub column: usize,
    /// SQL type of the column on the primary.
    pub source_type: String,
    /// SQL type of the column on the replica.
    pub target_type: String,
}

impl core::fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Column {} cannot be converted from type '{}' to type '{}'",
            self.column, self.source_type, self.target_type
        )
    }
}

/// Outcome of comparing a table map with a live table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Compatibility {
    /// Every shared column has the same type on both sides.
    Compatible,
    /// Some shared columns need converting; rows must be staged.
    CompatibleWithConversion(ConversionSpec),
    /// A shared column cannot be converted under the policy.
    Incompatible(Incompatibility),
}

impl Compatibility {
    /// Returns true unless the schemas are incompatible.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        !matches!(self, Compatibility::Incompatible(_))
    }

    /// The conversion spec, when one is needed.
    #[must_use]
    pub fn conversion(&self) -> Option<&ConversionSpec> {
        match self {
            Compatibility::CompatibleWithConversion(spec) => Some(spec),
            _ => None,
        }
    }
}

/// Orders two values the way conversions are ranked.
#[inline]
fn order_of(source: u32, target: u32) -> Ordering {
    source.cmp(&target)
}

/// Order between two columns of the same (normalized) type.
fn same_type_order(source: ColumnType, target: ColumnType) -> Ordering {
    let (s, t) = (source.metadata, target.metadata);
    match source.field_type {
        FieldType::NewDecimal => {
            let (s_precision, s_scale) = (s >> 8, s & 0xff);
            let (t_precision, t_scale) = (t >> 8, t & 0xff);
            let s_integral = s_precision.saturating_sub(s_scale);
            let t_integral = t_precision.saturating_sub(t_scale);
            if s_integral == t_integral && s_scale == t_scale {
                Ordering::Equal
            } else if s_integral <= t_integral && s_scale <= t_scale {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        FieldType::Timestamp2 | FieldType::DateTime2 | FieldType::Time2 => {
            order_of(u32::from(s), u32::from(t))
        }
        FieldType::String
        | FieldType::VarChar
        | FieldType::VarString
        | FieldType::Enum
        | FieldType::Set
        | FieldType::Bit
        | FieldType::TinyBlob
        | FieldType::MediumBlob
        | FieldType::LongBlob
        | FieldType::Blob
        | FieldType::Geometry
        | FieldType::Json => order_of(
            max_display_length(source.field_type, s),
            max_display_length(target.field_type, t),
        ),
        _ => Ordering::Equal,
    }
}

/// Conversion order from a primary column to a replica column.
///
/// Both types must be normalized. Returns `None` when no conversion exists.
#[must_use]
pub fn conversion_order(source: ColumnType, target: ColumnType) -> Option<Ordering> {
    let (s, t) = (source.field_type, target.field_type);
    if s == t {
        // Metadata is only absent in old events or for types that need none.
        if source.metadata == 0 {
            return Some(Ordering::Equal);
        }
        return Some(same_type_order(source, target));
    }

    let display = |c: ColumnType| max_display_length(c.field_type, c.metadata);

    if s.is_integer() && t.is_integer() {
        return Some(order_of(display(source), display(target)));
    }

    if s.is_real() && t.is_real() {
        if t == FieldType::NewDecimal || matches!(s, FieldType::NewDecimal | FieldType::Decimal) {
            return Some(Ordering::Greater);
        }
        return match order_of(display(source), display(target)) {
            Ordering::Equal => Some(Ordering::Greater),
            order => Some(order),
        };
    }

    if s.is_string() && t.is_string() {
        // Different string types of the same length still need converting.
        return match order_of(display(source), display(target)) {
            Ordering::Equal => Some(Ordering::Less),
            order => Some(order),
        };
    }

    // Old temporal encodings upgrade to their fractional-second forms.
    let legacy_temporal = matches!(
        (s, t),
        (FieldType::Timestamp, FieldType::Timestamp2)
            | (FieldType::Time, FieldType::Time2)
            | (FieldType::DateTime, FieldType::DateTime2)
    );
    if legacy_temporal && source.metadata == 0 {
        return Some(Ordering::Less);
    }

    None
}

impl TableDef {
    /// Decides whether rows described by this table map can be applied to `target`.
    ///
    /// Only the columns both sides have are compared; the first column that
    /// cannot be converted under `policy` stops the check and is reported.
    /// When some columns need converting, the staging table is built with
    /// [`TableDef::create_conversion_table`].
    ///
    /// # Errors
    ///
    /// Returns an error only when the live table reports fewer column
    /// definitions than its column count, or when the conversion table
    /// cannot be created. Incompatible schemas are a normal outcome, see
    /// [`Compatibility::Incompatible`].
    pub fn compatible_with(
        &self,
        target: &impl TargetTable,
        policy: ConversionPolicy,
    ) -> Result<Compatibility, Error> {
        let shared = self.column_count().min(target.number_of_columns());
        let mut conversions = Vec::new();
        conversions.try_reserve_exact(shared)?;
        let mut needs_conversion = false;

        for column in 0..shared {
            let live = target
                .column(column)
                .ok_or(Error::ColumnIndexOutOfBounds(column, target.number_of_columns()))?;
            let source = self.column(column);
            let target_type = live.column_type.normalized();

            let allowed = conversion_order(source, target_type).filter(|&order| policy.allows(order));
            let Some(order) = allowed else {
                let incompatibility = Incompatibility {
                    column,
                    source_type: source.to_string(),
                    target_type: target_type.to_string(),
                };
                tracing::warn!(
                    table = target.name(),
                    column,
                    source_type = %incompatibility.source_type,
                    target_type = %incompatibility.target_type,
                    %policy,
                    "column cannot be converted"
                );
                return Ok(Compatibility::Incompatible(incompatibility));
            };

            let conversion = match order {
                Ordering::Equal => None,
                Ordering::Less | Ordering::Greater => {
                    needs_conversion = true;
                    Some(FieldConversion {
                        column,
                        source,
                        target: target_type,
                        kind: if order == Ordering::Less {
                            ConversionKind::NonLossy
                        } else {
                            ConversionKind::Lossy
                        },
                    })
                }
            };
            conversions.push(conversion);
        }

        if !needs_conversion {
            return Ok(Compatibility::Compatible);
        }

        let table = self.create_conversion_table(target)?;
        Ok(Compatibility::CompatibleWithConversion(ConversionSpec {
            conversions,
            table,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(field_type: FieldType, metadata: u16) -> ColumnType {
        ColumnType::new(field_type, metadata)
    }

    #[test]
    fn test_integer_orders() {
        let int = col(FieldType::Long, 0);
        let bigint = col(FieldType::LongLong, 0);
        assert_eq!(conversion_order(int, bigint), Some(Ordering::Less));
        assert_eq!(conversion_order(bigint, int), Some(Ordering::Greater));
        assert_eq!(conversion_order(int, int), Some(Ordering::Equal));
    }

    #[test]
    fn test_real_orders() {
        let float = col(FieldType::Float, 4);
        let double = col(FieldType::Double, 8);
        let decimal = ColumnType::decimal(10, 2);
        assert_eq!(conversion_order(float, double), Some(Ordering::Less));
        assert_eq!(conversion_order(double, float), Some(Ordering::Greater));
        assert_eq!(conversion_order(double, decimal), Some(Ordering::Greater));
        assert_eq!(conversion_order(decimal, double), Some(Ordering::Greater));
    }

    #[test]
    fn test_decimal_same_type() {
        let narrow = ColumnType::decimal(10, 2);
        let wide = ColumnType::decimal(12, 4);
        let shifted = ColumnType::decimal(10, 4);
        assert_eq!(conversion_order(narrow, wide), Some(Ordering::Less));
        assert_eq!(conversion_order(wide, narrow), Some(Ordering::Greater));
        // Fewer integral digits on the replica loses data.
        assert_eq!(conversion_order(narrow, shifted), Some(Ordering::Greater));
        assert_eq!(conversion_order(narrow, narrow), Some(Ordering::Equal));
    }

    #[test]
    fn test_string_orders() {
        let short = ColumnType::varchar(10);
        let long = ColumnType::varchar(20);
        assert_eq!(conversion_order(short, long), Some(Ordering::Less));
        assert_eq!(conversion_order(long, short), Some(Ordering::Greater));
        // CHAR(10) to VARCHAR(10): same length, different types.
        assert_eq!(
            conversion_order(ColumnType::char(10).normalized(), short),
            Some(Ordering::Less)
        );
        assert_eq!(conversion_order(short, ColumnType::blob(2)), Some(Ordering::Less));
    }

    #[test]
    fn test_unconvertible_pairs() {
        let int = col(FieldType::Long, 0);
        assert_eq!(conversion_order(int, ColumnType::varchar(10)), None);
        assert_eq!(conversion_order(col(FieldType::Bit, 0x0100), int), None);
        assert_eq!(
            conversion_order(col(FieldType::NewDate, 0), col(FieldType::DateTime, 0)),
            None
        );
        assert_eq!(
            conversion_order(
                ColumnType::enumeration(1).normalized(),
                ColumnType::set(1).normalized()
            ),
            None
        );
    }

    #[test]
    fn test_legacy_temporal_upgrade() {
        assert_eq!(
            conversion_order(col(FieldType::DateTime, 0), col(FieldType::DateTime2, 0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            conversion_order(col(FieldType::DateTime2, 0), col(FieldType::DateTime, 0)),
            None
        );
    }

    #[test]
    fn test_missing_metadata_counts_as_equal() {
        assert_eq!(
            conversion_order(col(FieldType::VarChar, 0), ColumnType::varchar(5)),
            Some(Ordering::Equal)
        );
    }
}
