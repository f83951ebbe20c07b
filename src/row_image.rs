//! Walking raw row images.
//!
//! A rows event stores each row image as a null bitmap with one bit per
//! *present* column, followed by the values of the present, non-NULL
//! columns in column order. Values carry no type tags: locating column `i`
//! means sizing every value before it with [`TableDef::calc_field_size`].

use crate::bitmap::{ColumnBitmap, bit_is_set, bytes_for};
use crate::errors::Error;
use crate::table_def::TableDef;

/// One raw row image, borrowed from an event buffer.
#[derive(Debug, Clone, Copy)]
pub struct RowImage<'a> {
    table: &'a TableDef,
    present: &'a ColumnBitmap,
    data: &'a [u8],
    null_bits: &'a [u8],
    values: &'a [u8],
}

/// A column value located inside a row image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// Column index in the table definition.
    pub column: usize,
    /// Encoded value bytes, or `None` when the row holds NULL.
    pub value: Option<&'a [u8]>,
}

impl<'a> RowImage<'a> {
    /// Wraps the row image at the start of `data`.
    ///
    /// `present` lists the columns included in the image; it may not be
    /// wider than the table. `data` may extend past the end of the image,
    /// see [`RowImage::encoded_len`].
    ///
    /// # Errors
    ///
    /// * [`Error::ColumnIndexOutOfBounds`] if `present` covers more columns than `table`.
    /// * [`Error::NullBitmapTruncated`] if `data` is shorter than the row's null bitmap.
    pub fn new(table: &'a TableDef, present: &'a ColumnBitmap, data: &'a [u8]) -> Result<Self, Error> {
        if present.len() > table.column_count() {
            return Err(Error::ColumnIndexOutOfBounds(
                present.len() - 1,
                table.column_count(),
            ));
        }
        let null_len = bytes_for(present.count());
        if data.len() < null_len {
            return Err(Error::NullBitmapTruncated {
                columns: present.count(),
                actual: data.len(),
            });
        }
        let (null_bits, values) = data.split_at(null_len);
        Ok(Self {
            table,
            present,
            data,
            null_bits,
            values,
        })
    }

    /// The table definition used to size values.
    #[must_use]
    pub fn table(&self) -> &'a TableDef {
        self.table
    }

    /// The columns included in this image.
    #[must_use]
    pub fn present_columns(&self) -> &'a ColumnBitmap {
        self.present
    }

    /// Iterates over the present columns in order.
    pub fn fields(&self) -> Fields<'a> {
        Fields {
            image: *self,
            column: 0,
            null_index: 0,
            pos: 0,
            failed: false,
        }
    }

    /// Total encoded length of the image, null bitmap included.
    ///
    /// # Errors
    ///
    /// Returns the first error met while sizing a value.
    pub fn encoded_len(&self) -> Result<usize, Error> {
        let mut fields = self.fields();
        for field in fields.by_ref() {
            field?;
        }
        Ok(self.null_bits.len() + fields.pos)
    }

    /// The encoded bytes of the image, null bitmap included.
    ///
    /// # Errors
    ///
    /// Returns the first error met while sizing a value.
    pub fn as_bytes(&self) -> Result<&'a [u8], Error> {
        let len = self.encoded_len()?;
        Ok(&self.data[..len])
    }
}

/// Iterator over the fields of a [`RowImage`].
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    image: RowImage<'a>,
    column: usize,
    null_index: usize,
    pos: usize,
    failed: bool,
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<Field<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let present = self.image.present;
        while self.column < present.len() && !present.get(self.column) {
            self.column += 1;
        }
        if self.column >= present.len() {
            return None;
        }

        let column = self.column;
        self.column += 1;
        let is_null = bit_is_set(self.image.null_bits, self.null_index);
        self.null_index += 1;
        if is_null {
            return Some(Ok(Field {
                column,
                value: None,
            }));
        }

        let rest = &self.image.values[self.pos..];
        match self.image.table.calc_field_size(column, rest) {
            Ok(len) => {
                self.pos += len;
                Some(Ok(Field {
                    column,
                    value: Some(&rest[..len]),
                }))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
