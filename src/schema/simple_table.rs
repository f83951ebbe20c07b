//! Simple in-memory live table schema.
//!
//! This module provides [`SimpleTable`], a [`TargetTable`] holding its
//! column definitions in a vector. It is what tests and small appliers use
//! when they do not have a catalog of their own.
//!
//! # Example
//!
//! ```rust
//! use binlog_rowmatch_rs::{ColumnDefinition, ColumnType, FieldType, SimpleTable, TargetTable};
//!
//! let table = SimpleTable::new(
//!     "users",
//!     vec![
//!         ColumnDefinition::new("id", ColumnType::plain(FieldType::Long)).nullable(false),
//!         ColumnDefinition::new("name", ColumnType::varchar(64)).charset(33),
//!     ],
//! );
//! assert_eq!(table.name(), "users");
//! assert_eq!(table.number_of_columns(), 2);
//! assert_eq!(table.column_index("name"), Some(1));
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use super::{ColumnDefinition, TargetTable};

/// A live table schema with its column definitions in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleTable {
    /// The table name.
    name: String,
    /// Column definitions in order.
    columns: Vec<ColumnDefinition>,
}

impl SimpleTable {
    /// Create a new simple table schema.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Get the column definitions.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Get the column index by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

impl TargetTable for SimpleTable {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn number_of_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    fn column(&self, index: usize) -> Option<&ColumnDefinition> {
        self.columns.get(index)
    }
}
