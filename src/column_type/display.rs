//! SQL spelling of column types, used in compatibility diagnostics.

use core::fmt;

use super::{ColumnType, FieldType, lengths::string_max_length};

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Decimal | FieldType::NewDecimal => "decimal",
            FieldType::Tiny => "tinyint",
            FieldType::Short => "smallint",
            FieldType::Long => "int",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Null => "null",
            FieldType::Timestamp | FieldType::Timestamp2 => "timestamp",
            FieldType::LongLong => "bigint",
            FieldType::Int24 => "mediumint",
            FieldType::Date | FieldType::NewDate => "date",
            FieldType::Time | FieldType::Time2 => "time",
            FieldType::DateTime | FieldType::DateTime2 => "datetime",
            FieldType::Year => "year",
            FieldType::VarChar | FieldType::VarString => "varchar",
            FieldType::Bit => "bit",
            FieldType::Json => "json",
            FieldType::Enum => "enum",
            FieldType::Set => "set",
            FieldType::TinyBlob => "tinyblob",
            FieldType::MediumBlob => "mediumblob",
            FieldType::LongBlob => "longblob",
            FieldType::Blob => "blob",
            FieldType::String => "char",
            FieldType::Geometry => "geometry",
            FieldType::Unknown(code) => return write!(f, "<unknown type {code}>"),
        };
        f.write_str(name)
    }
}

impl fmt::Display for ColumnType {
    /// Renders the normalized type the way it would read in `CREATE TABLE`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.metadata;
        match self.normalized_type() {
            FieldType::NewDecimal => write!(f, "decimal({},{})", metadata >> 8, metadata & 0xff),
            FieldType::VarChar | FieldType::VarString => write!(f, "varchar({metadata})"),
            FieldType::String => write!(f, "char({})", string_max_length(metadata)),
            FieldType::Bit => write!(f, "bit({})", 8 * (metadata >> 8) + (metadata & 0xff)),
            FieldType::Blob => match metadata {
                1 => f.write_str("tinyblob"),
                3 => f.write_str("mediumblob"),
                4 => f.write_str("longblob"),
                _ => f.write_str("blob"),
            },
            t @ (FieldType::Timestamp2 | FieldType::DateTime2 | FieldType::Time2)
                if metadata > 0 =>
            {
                write!(f, "{t}({metadata})")
            }
            other => write!(f, "{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ColumnType::plain(FieldType::Long).to_string(), "int");
        assert_eq!(ColumnType::varchar(32).to_string(), "varchar(32)");
        assert_eq!(ColumnType::char(300).to_string(), "char(300)");
        assert_eq!(ColumnType::decimal(10, 2).to_string(), "decimal(10,2)");
        assert_eq!(ColumnType::enumeration(1).to_string(), "enum");
        assert_eq!(ColumnType::blob(3).to_string(), "mediumblob");
        assert_eq!(ColumnType::new(FieldType::DateTime2, 3).to_string(), "datetime(3)");
        assert_eq!(ColumnType::new(FieldType::DateTime2, 0).to_string(), "datetime");
        assert_eq!(ColumnType::plain(FieldType::Date).to_string(), "date");
        assert_eq!(FieldType::Unknown(99).to_string(), "<unknown type 99>");
    }
}
