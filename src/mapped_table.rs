//! Per-table replication context.
//!
//! A [`MappedTable`] is what the applier keeps for each table a table map
//! event announced: the decoded [`TableDef`] and, once rows arrive, the
//! compatibility verdict against the live table. The verdict, and the
//! conversion table it may hold, is computed on the first check and reused
//! while the policy and the live columns it was reached against stay the
//! same.

use alloc::string::String;
use alloc::vec::Vec;

use crate::compat::{Compatibility, ConversionPolicy};
use crate::errors::Error;
use crate::schema::{ColumnDefinition, TargetTable};
use crate::table_def::TableDef;
use crate::table_map::TableMapEvent;

/// A verdict, the policy it was reached under and the live columns it
/// compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Verdict {
    policy: ConversionPolicy,
    target: String,
    columns: Vec<ColumnDefinition>,
    compatibility: Compatibility,
}

impl Verdict {
    /// Whether this verdict was reached against the current state of `target`.
    fn matches(&self, target: &impl TargetTable, policy: ConversionPolicy, shared: usize) -> bool {
        self.policy == policy
            && self.target == target.name()
            && self.columns.len() == shared
            && self
                .columns
                .iter()
                .enumerate()
                .all(|(i, column)| target.column(i) == Some(column))
    }
}

/// The decoded table map of one table and its cached compatibility verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedTable {
    table_id: u64,
    database: String,
    table: String,
    table_def: TableDef,
    verdict: Option<Verdict>,
}

impl MappedTable {
    /// Creates a context for a table definition that came without names.
    #[must_use]
    pub fn new(table_id: u64, table_def: TableDef) -> Self {
        Self {
            table_id,
            database: String::new(),
            table: String::new(),
            table_def,
            verdict: None,
        }
    }

    /// The table id rows events refer to.
    #[must_use]
    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    /// Schema name, empty when unknown.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Table name, empty when unknown.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The decoded table definition.
    #[must_use]
    pub fn table_def(&self) -> &TableDef {
        &self.table_def
    }

    /// Number of columns compared against `target`.
    fn shared_columns(&self, target: &impl TargetTable) -> usize {
        self.table_def.column_count().min(target.number_of_columns())
    }

    /// The cached verdict, if the table was last checked against `target`
    /// as it is now, under `policy`.
    #[must_use]
    pub fn cached(
        &self,
        target: &impl TargetTable,
        policy: ConversionPolicy,
    ) -> Option<&Compatibility> {
        let shared = self.shared_columns(target);
        self.verdict
            .as_ref()
            .filter(|verdict| verdict.matches(target, policy, shared))
            .map(|verdict| &verdict.compatibility)
    }

    /// Checks the table definition against `target`, reusing the verdict of
    /// an earlier check under the same policy against the same live columns.
    ///
    /// A different table name, or any change to the compared column
    /// definitions, recomputes the verdict.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`TableDef::compatible_with`] and
    /// [`Error::AllocationFailed`] if the live columns cannot be recorded;
    /// nothing is cached in either case.
    pub fn check(
        &mut self,
        target: &impl TargetTable,
        policy: ConversionPolicy,
    ) -> Result<&Compatibility, Error> {
        let shared = self.shared_columns(target);
        let verdict = match self.verdict.take() {
            Some(verdict) if verdict.matches(target, policy, shared) => verdict,
            _ => {
                let compatibility = self.table_def.compatible_with(target, policy)?;
                let mut columns = Vec::new();
                columns.try_reserve_exact(shared)?;
                for i in 0..shared {
                    let column = target
                        .column(i)
                        .ok_or(Error::ColumnIndexOutOfBounds(i, target.number_of_columns()))?;
                    columns.push(column.clone());
                }
                tracing::debug!(
                    table_id = self.table_id,
                    target = target.name(),
                    %policy,
                    compatible = compatibility.is_compatible(),
                    needs_conversion = compatibility.conversion().is_some(),
                    "checked table map against live table"
                );
                Verdict {
                    policy,
                    target: String::from(target.name()),
                    columns,
                    compatibility,
                }
            }
        };
        Ok(&self.verdict.insert(verdict).compatibility)
    }

    /// Forgets the cached verdict.
    pub fn invalidate(&mut self) {
        self.verdict = None;
    }
}

impl From<TableMapEvent> for MappedTable {
    fn from(event: TableMapEvent) -> Self {
        Self {
            table_id: event.table_id,
            database: event.database,
            table: event.table,
            table_def: event.table_def,
            verdict: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use core::cell::Cell;

    use super::*;
    use crate::column_type::{ColumnType, FieldType};
    use crate::schema::{ColumnDefinition, SimpleTable};

    /// A live table that counts how often its columns are read.
    #[derive(Debug)]
    struct CountingTable {
        inner: SimpleTable,
        reads: Cell<usize>,
    }

    impl TargetTable for CountingTable {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn number_of_columns(&self) -> usize {
            self.inner.number_of_columns()
        }

        fn column(&self, index: usize) -> Option<&ColumnDefinition> {
            self.reads.set(self.reads.get() + 1);
            self.inner.column(index)
        }
    }

    fn bigint_table() -> CountingTable {
        CountingTable {
            inner: SimpleTable::new(
                "t",
                vec![ColumnDefinition::new("a", ColumnType::plain(FieldType::LongLong))],
            ),
            reads: Cell::new(0),
        }
    }

    fn int_def() -> TableDef {
        TableDef::new(&[3], &[], &[0x01], 0).unwrap()
    }

    #[test]
    fn test_verdict_is_computed_once() {
        // INT on the primary, BIGINT on the replica.
        let mut mapped = MappedTable::new(9, int_def());
        let live = bigint_table();

        let first = mapped.check(&live, ConversionPolicy::WIDEN_ONLY).unwrap().clone();
        let reads = live.reads.get();
        assert!(reads > 1);
        assert!(first.conversion().is_some());

        let second = mapped.check(&live, ConversionPolicy::WIDEN_ONLY).unwrap();
        assert_eq!(second, &first);
        // Only the recorded column is compared; nothing is recomputed.
        assert_eq!(live.reads.get(), reads + 1);
    }

    #[test]
    fn test_new_policy_or_invalidate_recomputes() {
        let mut mapped = MappedTable::new(9, int_def());
        let live = bigint_table();

        assert!(mapped.check(&live, ConversionPolicy::WIDEN_ONLY).unwrap().is_compatible());
        assert!(!mapped.check(&live, ConversionPolicy::STRICT).unwrap().is_compatible());
        assert!(mapped.cached(&live, ConversionPolicy::WIDEN_ONLY).is_none());
        assert!(mapped.cached(&live, ConversionPolicy::STRICT).is_some());

        mapped.invalidate();
        assert!(mapped.cached(&live, ConversionPolicy::STRICT).is_none());
    }

    #[test]
    fn test_other_live_table_recomputes() {
        let mut mapped = MappedTable::new(9, int_def());
        let ints = SimpleTable::new(
            "a",
            vec![ColumnDefinition::new("x", ColumnType::plain(FieldType::Long))],
        );
        let strings = SimpleTable::new(
            "b",
            vec![ColumnDefinition::new("x", ColumnType::varchar(10))],
        );

        assert_eq!(
            mapped.check(&ints, ConversionPolicy::STRICT),
            Ok(&Compatibility::Compatible)
        );
        let verdict = mapped.check(&strings, ConversionPolicy::STRICT).unwrap();
        let Compatibility::Incompatible(incompatibility) = verdict else {
            panic!("expected incompatible, got {verdict:?}");
        };
        assert_eq!(incompatibility.target_type, "varchar(10)");
        assert!(mapped.cached(&ints, ConversionPolicy::STRICT).is_none());
        assert!(mapped.cached(&strings, ConversionPolicy::STRICT).is_some());
    }

    #[test]
    fn test_altered_live_columns_recompute() {
        let mut mapped = MappedTable::new(9, int_def());
        let before = SimpleTable::new(
            "t",
            vec![ColumnDefinition::new("x", ColumnType::plain(FieldType::Long))],
        );
        // Same name, column widened by a schema change on the replica.
        let after = SimpleTable::new(
            "t",
            vec![ColumnDefinition::new("x", ColumnType::plain(FieldType::LongLong))],
        );

        assert!(mapped.check(&before, ConversionPolicy::STRICT).unwrap().is_compatible());
        assert!(!mapped.check(&after, ConversionPolicy::STRICT).unwrap().is_compatible());

        // Columns past the compared range do not matter.
        let extended = before.clone().with_column(ColumnDefinition::new("y", ColumnType::blob(2)));
        assert!(mapped.check(&before, ConversionPolicy::STRICT).unwrap().is_compatible());
        assert!(mapped.cached(&extended, ConversionPolicy::STRICT).is_some());
    }

    #[test]
    fn test_from_event_keeps_names() {
        let event = TableMapEvent {
            table_id: 42,
            flags: 0,
            database: String::from("shop"),
            table: String::from("orders"),
            table_def: TableDef::new(&[3], &[], &[0], 0).unwrap(),
        };
        let mapped = MappedTable::from(event);
        assert_eq!(mapped.table_id(), 42);
        assert_eq!(mapped.database(), "shop");
        assert_eq!(mapped.table(), "orders");
        assert_eq!(mapped.table_def().column_count(), 1);
    }
}
