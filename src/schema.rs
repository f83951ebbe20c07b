//! Schema traits for the replica's live tables.
mod simple_table;
mod target_table;

pub use simple_table::SimpleTable;
pub use target_table::{ColumnDefinition, TargetTable};
