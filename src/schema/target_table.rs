//! Live table schema traits.
use core::fmt::Debug;

use alloc::string::String;

use crate::column_type::ColumnType;

/// A column of a live table on the replica.
///
/// The type is described with the same codes and metadata encoding a table
/// map uses, so the replica's column and the primary's column can be
/// compared directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Type code and metadata.
    pub column_type: ColumnType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether a numeric column is unsigned.
    pub unsigned: bool,
    /// Collation/character set id for string columns, `None` for binary data.
    pub charset: Option<u16>,
}

impl ColumnDefinition {
    /// Creates a nullable, signed column without a character set.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            unsigned: false,
            charset: None,
        }
    }

    /// Sets whether the column accepts NULL.
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Marks a numeric column as unsigned.
    #[must_use]
    pub fn unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = unsigned;
        self
    }

    /// Sets the character set of a string column.
    #[must_use]
    pub fn charset(mut self, charset: u16) -> Self {
        self.charset = Some(charset);
        self
    }
}

/// A live table schema the applier writes into.
///
/// The compatibility checker only needs ordered column definitions, so
/// implementors can wrap whatever catalog representation they hold.
pub trait TargetTable: Debug {
    /// The table name.
    fn name(&self) -> &str;

    /// The number of columns in the table.
    fn number_of_columns(&self) -> usize;

    /// The definition of the column at `index`, or `None` past the last column.
    fn column(&self, index: usize) -> Option<&ColumnDefinition>;
}

impl<T: TargetTable> TargetTable for &T {
    #[inline]
    fn name(&self) -> &str {
        T::name(self)
    }

    #[inline]
    fn number_of_columns(&self) -> usize {
        T::number_of_columns(self)
    }

    #[inline]
    fn column(&self, index: usize) -> Option<&ColumnDefinition> {
        T::column(self, index)
    }
}
