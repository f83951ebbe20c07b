//! Parser for the body of a table map event.
//!
//! The common event header and checksum are stripped by the caller; what
//! remains is the post-header followed by the body:
//!
//! ```text
//! Post-header:
//! ├── Table id (6 bytes LE, 4 bytes when the post-header is 6 bytes long)
//! └── Flags (2 bytes LE)
//!
//! Body:
//! ├── Database name length (1 byte), name, NUL
//! ├── Table name length (1 byte), name, NUL
//! ├── Column count (packed integer)
//! ├── Column types (1 byte per column)
//! ├── Metadata length (packed integer), metadata
//! └── Null bitmap (ceil(columns / 8) bytes)
//! ```
//!
//! Anything after the null bitmap (optional metadata added by later server
//! versions) is ignored.

mod packed;

use alloc::string::String;

use crate::bitmap::bytes_for;
use crate::errors::Error;
use crate::table_def::TableDef;

use packed::decode_packed;

/// Default post-header length of a table map event.
pub const TABLE_MAP_POST_HEADER_LEN: usize = 8;

/// Errors that can occur while parsing a table map body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Unexpected end of input.
    #[error("Unexpected end of input at position {0}")]
    UnexpectedEof(usize),

    /// Invalid packed integer marker.
    #[error("Invalid packed integer marker 0x{0:02x} at position {1}")]
    InvalidPackedInteger(u8, usize),

    /// Unsupported post-header length.
    #[error("Unsupported post-header length {0}")]
    InvalidPostHeaderLength(usize),

    /// Invalid UTF-8 in a schema or table name.
    #[error("Invalid UTF-8 in name at position {0}")]
    InvalidName(usize),

    /// Name not followed by its NUL terminator.
    #[error("Name not null-terminated at position {0}")]
    UnterminatedName(usize),

    /// The decoded columns do not form a valid table definition.
    #[error(transparent)]
    Definition(#[from] Error),
}

/// A decoded table map event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapEvent {
    /// Identifier the following rows events refer to.
    pub table_id: u64,
    /// Event flags from the post-header.
    pub flags: u16,
    /// Schema name.
    pub database: String,
    /// Table name.
    pub table: String,
    /// Column types, metadata and null capabilities.
    pub table_def: TableDef,
}

/// Byte cursor over an event body, tracking the position for error reports.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let bytes = self
            .pos
            .checked_add(n)
            .and_then(|end| self.data.get(self.pos..end))
            .ok_or(ParseError::UnexpectedEof(self.pos))?;
        self.pos += n;
        Ok(bytes)
    }

    fn uint_le(&mut self, n: usize) -> Result<u64, ParseError> {
        Ok(self
            .take(n)?
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    fn u16_le(&mut self) -> Result<u16, ParseError> {
        let start = self.pos;
        let bytes: [u8; 2] = self
            .take(2)?
            .try_into()
            .map_err(|_| ParseError::UnexpectedEof(start))?;
        Ok(u16::from_le_bytes(bytes))
    }

    fn packed(&mut self) -> Result<usize, ParseError> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let Some(&marker) = rest.first() else {
            return Err(ParseError::UnexpectedEof(self.pos));
        };
        let (value, consumed) = match decode_packed(rest) {
            Some(decoded) => decoded,
            None if matches!(marker, 251 | 255) => {
                return Err(ParseError::InvalidPackedInteger(marker, self.pos));
            }
            None => return Err(ParseError::UnexpectedEof(self.pos)),
        };
        let value = usize::try_from(value).map_err(|_| ParseError::UnexpectedEof(self.pos))?;
        self.pos += consumed;
        Ok(value)
    }

    fn name(&mut self) -> Result<String, ParseError> {
        let len = usize::from(self.take(1)?[0]);
        let start = self.pos;
        let bytes = self.take(len)?;
        let name = core::str::from_utf8(bytes).map_err(|_| ParseError::InvalidName(start))?;
        let terminator = self.pos;
        if self.take(1)? != [0] {
            return Err(ParseError::UnterminatedName(terminator));
        }
        Ok(String::from(name))
    }
}

impl TableMapEvent {
    /// Parse a table map body with the default 8-byte post-header.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the body is truncated or malformed.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        Self::parse_with_post_header_len(data, TABLE_MAP_POST_HEADER_LEN)
    }

    /// Parse a table map body whose post-header is `post_header_len` bytes long.
    ///
    /// Servers older than 5.1 used a 6-byte post-header with a 4-byte table id.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the body is truncated or malformed, or if
    /// the post-header length is neither 6 nor 8.
    pub fn parse_with_post_header_len(data: &[u8], post_header_len: usize) -> Result<Self, ParseError> {
        let id_len = match post_header_len {
            6 => 4,
            8 => 6,
            other => return Err(ParseError::InvalidPostHeaderLength(other)),
        };

        let mut reader = Reader { data, pos: 0 };
        let table_id = reader.uint_le(id_len)?;
        let flags = reader.u16_le()?;
        let database = reader.name()?;
        let table = reader.name()?;

        let columns = reader.packed()?;
        let types = reader.take(columns)?;
        let metadata_len = reader.packed()?;
        let metadata = reader.take(metadata_len)?;
        let null_bitmap = reader.take(bytes_for(columns))?;

        let table_def = TableDef::new(types, metadata, null_bitmap, flags)?;

        tracing::debug!(
            table_id,
            database = %database,
            table = %table,
            columns,
            "parsed table map"
        );

        Ok(Self {
            table_id,
            flags,
            database,
            table,
            table_def,
        })
    }
}

impl TryFrom<&[u8]> for TableMapEvent {
    type Error = ParseError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Self::parse(data)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;
    use crate::column_type::FieldType;

    fn body(columns: &[u8], metadata: &[u8], nulls: &[u8]) -> Vec<u8> {
        let mut out = vec![0x2a, 0, 0, 0, 0, 0, 0x01, 0x00];
        out.extend([4]);
        out.extend(b"shop\0");
        out.extend([6]);
        out.extend(b"orders\0");
        out.push(u8::try_from(columns.len()).unwrap());
        out.extend(columns);
        out.push(u8::try_from(metadata.len()).unwrap());
        out.extend(metadata);
        out.extend(nulls);
        out
    }

    #[test]
    fn test_parse_table_map() {
        let data = body(&[3, 15, 252], &[0x20, 0x00, 2], &[0b110]);
        let event = TableMapEvent::parse(&data).unwrap();
        assert_eq!(event.table_id, 42);
        assert_eq!(event.flags, 1);
        assert_eq!(event.database, "shop");
        assert_eq!(event.table, "orders");
        assert_eq!(event.table_def.column_count(), 3);
        assert_eq!(event.table_def.column_type(1), FieldType::VarChar);
        assert_eq!(event.table_def.field_metadata(1), 32);
        assert_eq!(event.table_def.field_metadata(2), 2);
        assert!(!event.table_def.maybe_null(0));
        assert!(event.table_def.maybe_null(2));
    }

    #[test]
    fn test_parse_short_post_header() {
        let mut data = body(&[3], &[], &[0]);
        data.drain(4..6);
        let event = TableMapEvent::parse_with_post_header_len(&data, 6).unwrap();
        assert_eq!(event.table_id, 42);
        assert_eq!(event.flags, 1);
        assert!(!event.table_def.has_metadata());
    }

    #[test]
    fn test_truncated_body() {
        let data = body(&[3, 15], &[0x20, 0x00], &[0]);
        for cut in 0..data.len() {
            assert!(
                TableMapEvent::parse(&data[..cut]).is_err(),
                "prefix of {cut} bytes parsed"
            );
        }
    }

    #[test]
    fn test_truncated_flags_report_their_offset() {
        let data = body(&[3], &[], &[0]);
        assert_eq!(
            TableMapEvent::parse(&data[..7]),
            Err(ParseError::UnexpectedEof(6))
        );
        let mut wide = data;
        wide[6..8].copy_from_slice(&0x8001u16.to_le_bytes());
        assert_eq!(TableMapEvent::parse(&wide).unwrap().flags, 0x8001);
    }

    #[test]
    fn test_invalid_names_and_markers() {
        let mut data = body(&[3], &[], &[0]);
        data[13] = 1; // replace NUL after "shop"
        assert_eq!(TableMapEvent::parse(&data), Err(ParseError::UnterminatedName(13)));

        let mut data = body(&[3], &[], &[0]);
        data[9] = 0xff;
        assert_eq!(TableMapEvent::parse(&data), Err(ParseError::InvalidName(9)));

        let mut data = body(&[3], &[], &[0]);
        data[22] = 251;
        assert_eq!(
            TableMapEvent::parse(&data),
            Err(ParseError::InvalidPackedInteger(251, 22))
        );
        assert_eq!(
            TableMapEvent::parse_with_post_header_len(&data, 7),
            Err(ParseError::InvalidPostHeaderLength(7))
        );
    }
}
