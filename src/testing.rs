//! Fuzzing helpers.
//!
//! This module is gated behind the `testing` feature.
//!
//! # Provided helpers
//!
//! - [`TableMapInput`]: an `arbitrary` table map description and its wire encoding
//! - [`fuzz_table_map`]: parse untrusted table map bodies and check invariants
//! - [`fuzz_row_hash`]: buffer untrusted row images in a [`RowHashIndex`] and
//!   check lookups, traversal and teardown
//!
//! The fuzz entry points never panic on malformed input; they panic only
//! when an invariant is broken.

use alloc::string::String;
use alloc::vec::Vec;

use arbitrary::{Arbitrary, Unstructured};

use crate::bitmap::ColumnBitmap;
use crate::column_type::{ColumnType, FieldType};
use crate::compat::{Compatibility, ConversionPolicy};
use crate::row_hash::{EntryId, RowHashIndex};
use crate::row_image::RowImage;
use crate::schema::{ColumnDefinition, SimpleTable};
use crate::table_def::TableDef;
use crate::table_map::{ParseError, TableMapEvent};

/// Longest name the fuzzers generate.
const MAX_NAME: usize = 64;

/// Most row images buffered by [`fuzz_row_hash`].
const MAX_ROWS: usize = 64;

/// A table map event described field by field.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub struct TableMapInput {
    /// Table id; only the low 48 bits are encoded.
    pub table_id: u64,
    /// Event flags.
    pub flags: u16,
    /// Schema name.
    pub database: String,
    /// Table name.
    pub table: String,
    /// Column types with their metadata.
    pub columns: Vec<ColumnType>,
    /// Null capability per column; missing entries mean NOT NULL.
    pub nullable: Vec<bool>,
}

/// Keeps at most [`MAX_NAME`] ASCII alphanumeric characters.
fn sanitize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_NAME)
        .collect()
}

/// Appends a packed integer.
fn push_packed(out: &mut Vec<u8>, value: usize) {
    let value = u64::try_from(value).unwrap_or(u64::MAX);
    if value < 251 {
        out.push(value.to_le_bytes()[0]);
    } else if value < 1 << 16 {
        out.push(252);
        out.extend_from_slice(&value.to_le_bytes()[..2]);
    } else if value < 1 << 24 {
        out.push(253);
        out.extend_from_slice(&value.to_le_bytes()[..3]);
    } else {
        out.push(254);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Appends the metadata bytes a table map carries for `column`.
fn push_metadata(out: &mut Vec<u8>, column: ColumnType) {
    let field_type = FieldType::from(column.field_type.code());
    let metadata = column.metadata;
    match (field_type, field_type.metadata_len()) {
        (_, 1) => out.push(metadata.to_le_bytes()[0]),
        (FieldType::Bit | FieldType::VarChar | FieldType::VarString, 2) => {
            out.extend_from_slice(&metadata.to_le_bytes());
        }
        (_, 2) => out.extend_from_slice(&metadata.to_be_bytes()),
        _ => {}
    }
}

/// The metadata value a table map round trip yields for `column`.
fn expected_metadata(column: ColumnType) -> u16 {
    match FieldType::from(column.field_type.code()).metadata_len() {
        1 => column.metadata & 0xff,
        2 => column.metadata,
        _ => 0,
    }
}

impl TableMapInput {
    /// Schema name as it is encoded.
    #[must_use]
    pub fn encoded_database(&self) -> String {
        sanitize(&self.database)
    }

    /// Table name as it is encoded.
    #[must_use]
    pub fn encoded_table(&self) -> String {
        sanitize(&self.table)
    }

    /// Encodes the event body with an 8-byte post-header.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.table_id.to_le_bytes()[..6]);
        out.extend_from_slice(&self.flags.to_le_bytes());
        for name in [self.encoded_database(), self.encoded_table()] {
            out.push(u8::try_from(name.len()).unwrap_or(u8::MAX));
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }

        push_packed(&mut out, self.columns.len());
        out.extend(self.columns.iter().map(|c| c.field_type.code()));

        let mut metadata = Vec::new();
        for &column in &self.columns {
            push_metadata(&mut metadata, column);
        }
        push_packed(&mut out, metadata.len());
        out.extend_from_slice(&metadata);

        let mut nulls = ColumnBitmap::new(self.columns.len());
        for (i, _) in self
            .nullable
            .iter()
            .take(self.columns.len())
            .enumerate()
            .filter(|(_, nullable)| **nullable)
        {
            nulls.set(i, true);
        }
        out.extend_from_slice(nulls.as_bytes());
        out
    }

    /// Encodes the event and decodes its table definition.
    ///
    /// # Errors
    ///
    /// Returns the error of [`TableMapEvent::parse`].
    pub fn table_def(&self) -> Result<TableDef, ParseError> {
        TableMapEvent::parse(&self.encode()).map(|event| event.table_def)
    }
}

/// A live table with exactly the columns of `table_def`.
#[must_use]
pub fn mirror_table(table_def: &TableDef) -> SimpleTable {
    let columns = table_def
        .columns()
        .enumerate()
        .map(|(i, column_type)| {
            ColumnDefinition::new(alloc::format!("c{i}"), column_type)
                .nullable(table_def.maybe_null(i))
        })
        .collect();
    SimpleTable::new("mirror", columns)
}

/// Checks invariants that must hold for every decodable table map.
fn check_table_def(table_def: &TableDef) {
    for i in 0..table_def.column_count() {
        let column = table_def.column(i);
        assert_eq!(column.normalized(), column);
        if !table_def.has_metadata() {
            assert_eq!(table_def.field_metadata(i), 0);
        }
    }

    let mirror = mirror_table(table_def);
    for policy in [
        ConversionPolicy::STRICT,
        ConversionPolicy::WIDEN_ONLY,
        ConversionPolicy::PERMISSIVE,
    ] {
        let verdict = table_def.compatible_with(&mirror, policy);
        assert_eq!(verdict, Ok(Compatibility::Compatible), "policy {policy}");
    }
}

/// Parses `data` as a table map body, then as an [`arbitrary`] table map
/// description whose encoding must parse back to the same columns.
///
/// # Panics
///
/// Panics if a decoded table map breaks an invariant.
pub fn fuzz_table_map(data: &[u8]) {
    for post_header_len in [6, 8] {
        if let Ok(event) = TableMapEvent::parse_with_post_header_len(data, post_header_len) {
            check_table_def(&event.table_def);
        }
    }

    let mut u = Unstructured::new(data);
    let Ok(input) = TableMapInput::arbitrary(&mut u) else {
        return;
    };
    let body = input.encode();
    let event = match TableMapEvent::parse(&body) {
        Ok(event) => event,
        Err(err) => panic!("encoded table map failed to parse: {err}"),
    };

    assert_eq!(event.table_id, input.table_id & 0xffff_ffff_ffff);
    assert_eq!(event.flags, input.flags);
    assert_eq!(event.database, input.encoded_database());
    assert_eq!(event.table, input.encoded_table());

    let table_def = &event.table_def;
    assert_eq!(table_def.column_count(), input.columns.len());
    for (i, &column) in input.columns.iter().enumerate() {
        assert_eq!(table_def.raw_type(i).code(), column.field_type.code());
        if table_def.has_metadata() {
            assert_eq!(table_def.field_metadata(i), expected_metadata(column));
        }
        let nullable = input.nullable.get(i).copied().unwrap_or(false);
        assert_eq!(table_def.maybe_null(i), nullable);
    }
    check_table_def(table_def);
}

/// Splits `rows` into consecutive row images, buffers them in a hash index,
/// and checks that every image finds itself, that chains are walked once,
/// and that teardown releases everything.
///
/// # Panics
///
/// Panics if the index breaks an invariant.
pub fn fuzz_row_hash(data: &[u8]) {
    let mut u = Unstructured::new(data);
    let Ok(input) = TableMapInput::arbitrary(&mut u) else {
        return;
    };
    let Ok(mask_bits) = Vec::<bool>::arbitrary(&mut u) else {
        return;
    };
    let rows = u.take_rest();
    let Ok(table_def) = input.table_def() else {
        return;
    };

    let columns = table_def.column_count();
    let present = ColumnBitmap::all(columns);
    let mut mask = ColumnBitmap::new(columns);
    for (i, _) in mask_bits
        .iter()
        .take(columns)
        .enumerate()
        .filter(|(_, bit)| **bit)
    {
        mask.set(i, true);
    }

    let mut index = RowHashIndex::new(&table_def, rows);
    if index.init().is_err() {
        return;
    }

    let mut ids: Vec<EntryId> = Vec::new();
    let mut start = 0;
    while ids.len() < MAX_ROWS && start < rows.len() {
        let Ok(image) = RowImage::new(&table_def, &present, &rows[start..]) else {
            break;
        };
        let Ok(len) = image.encoded_len() else {
            break;
        };
        if len == 0 {
            break;
        }
        let Ok(id) = index.make_entry_before_only(start, start + len) else {
            break;
        };
        if index.put_row(id, &present, &mask).is_err() {
            break;
        }
        ids.push(id);
        start += len;
    }
    assert_eq!(index.size(), ids.len());

    for &id in &ids {
        let Ok(before) = index.before_image(id) else {
            panic!("live entry has no before image");
        };
        let Ok(image) = RowImage::new(&table_def, &present, before) else {
            panic!("buffered image no longer walks");
        };
        let Ok(Some(mut cursor)) = index.get(&image, &mask) else {
            panic!("buffered image not found");
        };
        let mut found = cursor.entry() == id;
        let mut visited = 1;
        while let Ok(Some(next)) = index.next(&mut cursor) {
            found |= next == id;
            visited += 1;
        }
        assert!(found, "entry missing from its chain");
        assert!(visited <= ids.len());
        assert!(cursor.is_exhausted());
        assert!(index.next(&mut cursor).is_err());
    }

    // Delete every other entry, then tear down with the rest still in place.
    for &id in ids.iter().step_by(2) {
        assert!(index.del(id).is_ok());
        assert!(index.del(id).is_err());
    }
    assert_eq!(index.size(), ids.len() / 2);
    index.deinit();
    assert!(index.is_empty());
    assert_eq!(index.size(), 0);
}
