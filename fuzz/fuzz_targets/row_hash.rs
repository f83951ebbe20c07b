//! Row hash index fuzzer.
//!
//! Buffers arbitrary row images in a hash index and checks that each one
//! is found again, that chains end exactly once, and that teardown after
//! partial deletion leaves the index empty.

use binlog_rowmatch_rs::testing::fuzz_row_hash;
use honggfuzz::fuzz;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            fuzz_row_hash(data);
        });
    }
}
