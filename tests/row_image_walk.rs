//! Walking row images column by column.

use binlog_rowmatch_rs::{ColumnBitmap, ColumnType, Error, Field, RowImage, TableDef};

/// `(id BIGINT, code CHAR(3), amount DECIMAL(6,2), note BLOB)`.
fn orders() -> TableDef {
    let [char_high, char_low] = ColumnType::char(3).metadata.to_be_bytes();
    TableDef::new(
        &[8, 254, 246, 252],
        &[char_high, char_low, 6, 2, 1],
        &[0b1110],
        0,
    )
    .unwrap()
}

#[test]
fn test_fields_skip_nulls_and_absent_columns() {
    let table = orders();
    // All columns present; `amount` is NULL.
    let image = hex::decode(concat!(
        "04",               // null bitmap: third present column
        "0700000000000000", // id = 7
        "03455552",         // code = "EUR"
        "026869",           // note = "hi"
    ))
    .unwrap();
    let present = ColumnBitmap::all(4);
    let row = RowImage::new(&table, &present, &image).unwrap();
    let fields: Vec<Field<'_>> = row.fields().collect::<Result<_, _>>().unwrap();
    assert_eq!(
        fields,
        [
            Field {
                column: 0,
                value: Some(&image[1..9])
            },
            Field {
                column: 1,
                value: Some(&image[9..13])
            },
            Field {
                column: 2,
                value: None
            },
            Field {
                column: 3,
                value: Some(&image[13..16])
            },
        ]
    );
    assert_eq!(row.encoded_len(), Ok(image.len()));
}

#[test]
fn test_partial_images_use_one_null_bit_per_present_column() {
    let table = orders();
    let present = ColumnBitmap::from_columns(4, &[0, 2]);
    // Two present columns: id, amount (DECIMAL(6,2) is 3 bytes).
    let image = hex::decode(concat!("00", "2a00000000000000", "8004d2")).unwrap();
    let row = RowImage::new(&table, &present, &image).unwrap();
    let columns: Vec<usize> = row.fields().map(|f| f.unwrap().column).collect();
    assert_eq!(columns, [0, 2]);
    assert_eq!(row.as_bytes(), Ok(image.as_slice()));
}

#[test]
fn test_consecutive_images_split_by_encoded_length() {
    let table = orders();
    let present = ColumnBitmap::from_columns(4, &[0, 1]);
    let event = hex::decode(concat!(
        "00", "0100000000000000", "03414141", // (1, "AAA")
        "02", "0200000000000000",             // (2, NULL)
        "00", "0300000000000000", "0142",     // (3, "B")
    ))
    .unwrap();

    let mut ids = Vec::new();
    let mut rest = event.as_slice();
    while !rest.is_empty() {
        let row = RowImage::new(&table, &present, rest).unwrap();
        let bytes = row.as_bytes().unwrap();
        let id = row.fields().next().unwrap().unwrap().value.unwrap();
        ids.push(id[0]);
        rest = &rest[bytes.len()..];
    }
    assert_eq!(ids, [1, 2, 3]);
}

#[test]
fn test_walk_errors() {
    let table = orders();
    let present = ColumnBitmap::all(4);

    assert_eq!(
        RowImage::new(&table, &present, &[]).unwrap_err(),
        Error::NullBitmapTruncated {
            columns: 4,
            actual: 0
        }
    );

    let too_wide = ColumnBitmap::all(5);
    assert_eq!(
        RowImage::new(&table, &too_wide, &[0]).unwrap_err(),
        Error::ColumnIndexOutOfBounds(4, 4)
    );

    // `code` claims 3 bytes but only one follows.
    let image = hex::decode("00010000000000000003ff").unwrap();
    let row = RowImage::new(&table, &present, &image).unwrap();
    let mut fields = row.fields();
    assert!(fields.next().unwrap().is_ok());
    assert!(matches!(
        fields.next(),
        Some(Err(Error::TruncatedValue { column: 1, .. }))
    ));
    assert!(fields.next().is_none());
    assert!(row.encoded_len().is_err());
}
