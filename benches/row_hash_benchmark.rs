//! Benchmark measuring the row hash index on synthetic rows events.
//!
//! Each event holds `n` row images of `(id BIGINT, name VARCHAR(32), score INT)`
//! with random values. Two workloads are measured:
//! - **put**: make and put an entry for every image
//! - **get**: look every image up again and walk its chain
//!
//! Keys cover either the `id` column alone or the whole row.

use binlog_rowmatch_rs::{ColumnBitmap, RowHashIndex, RowImage, TableDef};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

const SIZES: [usize; 3] = [100, 1_000, 10_000];

fn table() -> TableDef {
    TableDef::new(&[8, 15, 3], &[32, 0], &[0b110], 0).unwrap()
}

/// Encodes `n` random rows and returns the buffer and image ranges.
fn rows_event(n: usize, rng: &mut StdRng) -> (Vec<u8>, Vec<(usize, usize)>) {
    let mut buffer = Vec::new();
    let mut ranges = Vec::with_capacity(n);
    for _ in 0..n {
        let start = buffer.len();
        let null_name = rng.random_range(0..10) == 0;
        buffer.push(if null_name { 0b010 } else { 0 });
        buffer.extend_from_slice(&rng.random_range(0..n as u64).to_le_bytes());
        if !null_name {
            let len = rng.random_range(1..=32u8);
            buffer.push(len);
            buffer.extend((0..len).map(|_| rng.random_range(b'a'..=b'z')));
        }
        buffer.extend_from_slice(&rng.random_range(0..1000i32).to_le_bytes());
        ranges.push((start, buffer.len()));
    }
    (buffer, ranges)
}

fn fill<'buf>(
    table: &'buf TableDef,
    buffer: &'buf [u8],
    ranges: &[(usize, usize)],
    mask: &ColumnBitmap,
) -> RowHashIndex<'buf> {
    let present = ColumnBitmap::all(3);
    let mut index = RowHashIndex::new(table, buffer);
    index.init().unwrap();
    for &(start, end) in ranges {
        let id = index.make_entry_before_only(start, end).unwrap();
        index.put_row(id, &present, mask).unwrap();
    }
    index
}

fn bench_put(c: &mut Criterion) {
    let table = table();
    let mut rng = StdRng::seed_from_u64(42);
    let mut group = c.benchmark_group("row_hash/put");
    for n in SIZES {
        let (buffer, ranges) = rows_event(n, &mut rng);
        for (name, mask) in [
            ("id", ColumnBitmap::from_columns(3, &[0])),
            ("row", ColumnBitmap::all(3)),
        ] {
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, _| {
                b.iter_batched(
                    || (),
                    |()| fill(&table, &buffer, &ranges, &mask),
                    BatchSize::SmallInput,
                );
            });
        }
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let table = table();
    let present = ColumnBitmap::all(3);
    let mut rng = StdRng::seed_from_u64(7);
    let mut group = c.benchmark_group("row_hash/get");
    for n in SIZES {
        let (buffer, ranges) = rows_event(n, &mut rng);
        for (name, mask) in [
            ("id", ColumnBitmap::from_columns(3, &[0])),
            ("row", ColumnBitmap::all(3)),
        ] {
            let index = fill(&table, &buffer, &ranges, &mask);
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, _| {
                b.iter(|| {
                    let mut visited = 0usize;
                    for &(start, _) in &ranges {
                        let image = RowImage::new(&table, &present, &buffer[start..]).unwrap();
                        if let Some(mut cursor) = index.get(&image, &mask).unwrap() {
                            visited += 1;
                            while index.next(&mut cursor).unwrap().is_some() {
                                visited += 1;
                            }
                        }
                    }
                    visited
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_put, bench_get);
criterion_main!(benches);
