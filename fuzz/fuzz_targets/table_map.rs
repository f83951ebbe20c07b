//! Table map fuzzer.
//!
//! Feeds arbitrary bytes to the table map parser and checks that every
//! decoded table definition is compatible with a live table of its own
//! columns, and that generated table maps parse back field for field.

use binlog_rowmatch_rs::testing::fuzz_table_map;
use honggfuzz::fuzz;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            fuzz_table_map(data);
        });
    }
}
