//! Benchmarks for sheetflow read and write throughput.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sheetflow::persist::{Backend, MemoryTable};
use sheetflow::{ParseType, PersistenceType, PipelineOptions};
use std::io::Cursor;

/// Creates a workbook of sample rows.
fn create_test_xlsx(rows: usize) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    sheetflow::write_sample_rows(&mut out, rows, 100).unwrap();
    out.into_inner()
}

/// Benchmark a full import per parse type.
fn bench_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("import");

    for row_count in [100, 1_000, 10_000].iter() {
        let data = create_test_xlsx(*row_count);
        group.throughput(Throughput::Elements(*row_count as u64));

        for parse_type in [ParseType::EventDriven, ParseType::WholeDocument] {
            let options = PipelineOptions::new().with_parse_type(parse_type);
            group.bench_with_input(
                BenchmarkId::new(parse_type.to_string(), row_count),
                &data,
                |b, data| {
                    b.iter(|| {
                        let mut table = MemoryTable::new();
                        let _ = sheetflow::import_reader(
                            Cursor::new(black_box(data.as_slice())),
                            &options,
                            Backend::select(PersistenceType::BulkStatement, &mut table),
                        );
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark the windowed writer at different window sizes.
fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    for window in [10, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(5_000));
        group.bench_with_input(BenchmarkId::new("window", window), window, |b, &window| {
            b.iter(|| {
                let mut out = Cursor::new(Vec::new());
                let _ = sheetflow::write_sample_rows(&mut out, black_box(5_000), window);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_import, bench_write);
criterion_main!(benches);
