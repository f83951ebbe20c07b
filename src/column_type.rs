//! Column type codes and their per-column metadata.
//!
//! A table map event describes every column with a one-byte type code and,
//! for some codes, up to two bytes of extra metadata. A few codes are legacy
//! aliases: a fixed `STRING` column carries its real type (ENUM, SET or
//! CHAR) in the high metadata byte, and the pre-5.0 `DATE` code always
//! means the newer 3-byte date. [`ColumnType::normalized`] resolves these
//! aliases without touching the stored value.

mod display;
mod lengths;

pub use lengths::{
    datetime2_binary_length, decimal_binary_size, max_display_length, string_max_length,
    time2_binary_length, timestamp2_binary_length,
};

/// Wire type codes of binlog columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "testing", derive(arbitrary::Arbitrary))]
pub enum FieldType {
    /// Pre-5.0 packed decimal (code 0).
    Decimal,
    /// 1-byte integer (code 1).
    Tiny,
    /// 2-byte integer (code 2).
    Short,
    /// 4-byte integer (code 3).
    Long,
    /// Single-precision float (code 4).
    Float,
    /// Double-precision float (code 5).
    Double,
    /// Column that is always NULL (code 6).
    Null,
    /// 4-byte timestamp (code 7).
    Timestamp,
    /// 8-byte integer (code 8).
    LongLong,
    /// 3-byte integer (code 9).
    Int24,
    /// Legacy date (code 10).
    Date,
    /// 3-byte time (code 11).
    Time,
    /// 8-byte datetime (code 12).
    DateTime,
    /// 1-byte year (code 13).
    Year,
    /// 3-byte date (code 14).
    NewDate,
    /// Variable-length string (code 15).
    VarChar,
    /// Bit field (code 16).
    Bit,
    /// Timestamp with fractional seconds (code 17).
    Timestamp2,
    /// Datetime with fractional seconds (code 18).
    DateTime2,
    /// Time with fractional seconds (code 19).
    Time2,
    /// JSON document (code 245).
    Json,
    /// Binary packed decimal (code 246).
    NewDecimal,
    /// Enumeration (code 247).
    Enum,
    /// Set (code 248).
    Set,
    /// Tiny blob (code 249).
    TinyBlob,
    /// Medium blob (code 250).
    MediumBlob,
    /// Long blob (code 251).
    LongBlob,
    /// Blob of any pack length (code 252).
    Blob,
    /// Old variable-length string (code 253).
    VarString,
    /// Fixed-length string, also used for ENUM and SET (code 254).
    String,
    /// Spatial value (code 255).
    Geometry,
    /// Any code this crate does not know.
    Unknown(u8),
}

impl From<u8> for FieldType {
    fn from(code: u8) -> Self {
        match code {
            0 => FieldType::Decimal,
            1 => FieldType::Tiny,
            2 => FieldType::Short,
            3 => FieldType::Long,
            4 => FieldType::Float,
            5 => FieldType::Double,
            6 => FieldType::Null,
            7 => FieldType::Timestamp,
            8 => FieldType::LongLong,
            9 => FieldType::Int24,
            10 => FieldType::Date,
            11 => FieldType::Time,
            12 => FieldType::DateTime,
            13 => FieldType::Year,
            14 => FieldType::NewDate,
            15 => FieldType::VarChar,
            16 => FieldType::Bit,
            17 => FieldType::Timestamp2,
            18 => FieldType::DateTime2,
            19 => FieldType::Time2,
            245 => FieldType::Json,
            246 => FieldType::NewDecimal,
            247 => FieldType::Enum,
            248 => FieldType::Set,
            249 => FieldType::TinyBlob,
            250 => FieldType::MediumBlob,
            251 => FieldType::LongBlob,
            252 => FieldType::Blob,
            253 => FieldType::VarString,
            254 => FieldType::String,
            255 => FieldType::Geometry,
            other => FieldType::Unknown(other),
        }
    }
}

impl From<FieldType> for u8 {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Decimal => 0,
            FieldType::Tiny => 1,
            FieldType::Short => 2,
            FieldType::Long => 3,
            FieldType::Float => 4,
            FieldType::Double => 5,
            FieldType::Null => 6,
            FieldType::Timestamp => 7,
            FieldType::LongLong => 8,
            FieldType::Int24 => 9,
            FieldType::Date => 10,
            FieldType::Time => 11,
            FieldType::DateTime => 12,
            FieldType::Year => 13,
            FieldType::NewDate => 14,
            FieldType::VarChar => 15,
            FieldType::Bit => 16,
            FieldType::Timestamp2 => 17,
            FieldType::DateTime2 => 18,
            FieldType::Time2 => 19,
            FieldType::Json => 245,
            FieldType::NewDecimal => 246,
            FieldType::Enum => 247,
            FieldType::Set => 248,
            FieldType::TinyBlob => 249,
            FieldType::MediumBlob => 250,
            FieldType::LongBlob => 251,
            FieldType::Blob => 252,
            FieldType::VarString => 253,
            FieldType::String => 254,
            FieldType::Geometry => 255,
            FieldType::Unknown(code) => code,
        }
    }
}

impl FieldType {
    /// The one-byte wire code.
    #[inline]
    #[must_use]
    pub fn code(self) -> u8 {
        u8::from(self)
    }

    /// Number of metadata bytes a table map carries for this type.
    #[must_use]
    pub fn metadata_len(self) -> usize {
        match self {
            FieldType::TinyBlob
            | FieldType::Blob
            | FieldType::MediumBlob
            | FieldType::LongBlob
            | FieldType::Double
            | FieldType::Float
            | FieldType::Geometry
            | FieldType::Json
            | FieldType::Timestamp2
            | FieldType::DateTime2
            | FieldType::Time2 => 1,
            FieldType::Set
            | FieldType::Enum
            | FieldType::String
            | FieldType::Bit
            | FieldType::VarChar
            | FieldType::VarString
            | FieldType::NewDecimal => 2,
            _ => 0,
        }
    }

    /// Integer types that convert among themselves by display width.
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Tiny
                | FieldType::Short
                | FieldType::Int24
                | FieldType::Long
                | FieldType::LongLong
        )
    }

    /// Decimal and floating point types.
    #[must_use]
    pub fn is_real(self) -> bool {
        matches!(
            self,
            FieldType::Decimal | FieldType::NewDecimal | FieldType::Float | FieldType::Double
        )
    }

    /// Character and binary string types, blobs included.
    #[must_use]
    pub fn is_string(self) -> bool {
        matches!(
            self,
            FieldType::TinyBlob
                | FieldType::MediumBlob
                | FieldType::LongBlob
                | FieldType::Blob
                | FieldType::String
                | FieldType::VarString
                | FieldType::VarChar
        )
    }

    /// Blob-like types whose length prefix width is given by the metadata.
    #[must_use]
    pub fn is_blob(self) -> bool {
        matches!(
            self,
            FieldType::TinyBlob
                | FieldType::MediumBlob
                | FieldType::LongBlob
                | FieldType::Blob
                | FieldType::Geometry
                | FieldType::Json
        )
    }
}

/// A column type as read from a table map: the type code plus its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "testing", derive(arbitrary::Arbitrary))]
pub struct ColumnType {
    /// Type code, possibly a legacy alias.
    pub field_type: FieldType,
    /// Extra metadata; 0 when the type has none.
    pub metadata: u16,
}

impl ColumnType {
    /// Creates a column type from a code and its metadata.
    #[must_use]
    pub const fn new(field_type: FieldType, metadata: u16) -> Self {
        Self {
            field_type,
            metadata,
        }
    }

    /// Creates a column type with no metadata.
    #[must_use]
    pub const fn plain(field_type: FieldType) -> Self {
        Self::new(field_type, 0)
    }

    /// Shorthand for `VARCHAR(max_length)`.
    #[must_use]
    pub const fn varchar(max_length: u16) -> Self {
        Self::new(FieldType::VarChar, max_length)
    }

    /// Shorthand for `CHAR(length)` as encoded in a table map.
    ///
    /// Lengths above 255 keep their two high bits in the high metadata byte.
    #[must_use]
    pub const fn char(length: u16) -> Self {
        let high = 0xfe ^ ((length & 0x300) >> 4);
        Self::new(FieldType::String, (high << 8) | (length & 0xff))
    }

    /// Shorthand for a BLOB/TEXT column whose length prefix is `pack_length` bytes.
    #[must_use]
    pub const fn blob(pack_length: u8) -> Self {
        Self::new(FieldType::Blob, pack_length as u16)
    }

    /// Shorthand for `DECIMAL(precision, scale)`.
    #[must_use]
    pub const fn decimal(precision: u8, scale: u8) -> Self {
        Self::new(FieldType::NewDecimal, ((precision as u16) << 8) | scale as u16)
    }

    /// ENUM with a `pack_length`-byte index, as encoded in a table map.
    #[must_use]
    pub const fn enumeration(pack_length: u8) -> Self {
        Self::new(FieldType::String, (247u16 << 8) | pack_length as u16)
    }

    /// SET with a `pack_length`-byte bitmask, as encoded in a table map.
    #[must_use]
    pub const fn set(pack_length: u8) -> Self {
        Self::new(FieldType::String, (248u16 << 8) | pack_length as u16)
    }

    /// The real type behind any legacy alias.
    ///
    /// `STRING` becomes ENUM or SET when its high metadata byte says so,
    /// and `DATE` always becomes `NEWDATE`. Every other type is returned
    /// unchanged.
    #[must_use]
    pub fn normalized_type(self) -> FieldType {
        match self.field_type {
            FieldType::String => match FieldType::from(self.metadata.to_be_bytes()[0]) {
                real @ (FieldType::Enum | FieldType::Set) => real,
                _ => FieldType::String,
            },
            FieldType::Date => FieldType::NewDate,
            other => other,
        }
    }

    /// The same column with its type code normalized and metadata kept.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::new(self.normalized_type(), self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip_for_known_types() {
        for code in (0u8..=19).chain(245..=255) {
            let field_type = FieldType::from(code);
            assert!(!matches!(field_type, FieldType::Unknown(_)), "code {code}");
            assert_eq!(field_type.code(), code);
        }
        assert_eq!(FieldType::from(100), FieldType::Unknown(100));
        assert_eq!(FieldType::Unknown(100).code(), 100);
    }

    #[test]
    fn test_string_aliases() {
        assert_eq!(ColumnType::enumeration(1).normalized_type(), FieldType::Enum);
        assert_eq!(ColumnType::set(2).normalized_type(), FieldType::Set);
        assert_eq!(ColumnType::char(10).normalized_type(), FieldType::String);
        assert_eq!(ColumnType::char(300).normalized_type(), FieldType::String);
        // A high byte that is neither ENUM nor SET leaves the type alone.
        let other = ColumnType::new(FieldType::String, (246u16 << 8) | 3);
        assert_eq!(other.normalized_type(), FieldType::String);
    }

    #[test]
    fn test_date_alias() {
        assert_eq!(
            ColumnType::plain(FieldType::Date).normalized_type(),
            FieldType::NewDate
        );
        assert_eq!(
            ColumnType::new(FieldType::Date, 7).normalized(),
            ColumnType::new(FieldType::NewDate, 7)
        );
    }

    #[test]
    fn test_char_metadata_layout() {
        assert_eq!(ColumnType::char(10).metadata, 0xfe0a);
        // 300 = 0x12c: high bits 0x100 are folded into the type byte.
        assert_eq!(ColumnType::char(300).metadata, 0xee2c);
        assert_eq!(string_max_length(ColumnType::char(300).metadata), 300);
        assert_eq!(string_max_length(ColumnType::char(10).metadata), 10);
    }
}
