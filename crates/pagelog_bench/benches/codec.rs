//! Record codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pagelog_bench::utils::generate_records;
use pagelog_codec::{decode_records, encode_record, CanonicalEncoder, RecordIter};

/// Benchmark encoding single records of varying payload size.
fn bench_encode_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_record");

    for size in [16, 256, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let record = generate_records(1, size).remove(0);
            let mut encoder = CanonicalEncoder::with_capacity(size * 2);

            b.iter(|| {
                encoder.clear();
                encode_record(&mut encoder, black_box(&record.as_record_ref())).unwrap();
                black_box(encoder.len());
            });
        });
    }

    group.finish();
}

/// Benchmark decoding a page worth of records.
fn bench_decode_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_page");

    for count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let mut encoder = CanonicalEncoder::new();
            for record in generate_records(count, 64) {
                encode_record(&mut encoder, &record.as_record_ref()).unwrap();
            }
            let bytes = encoder.into_bytes();

            b.iter(|| {
                let records = decode_records(black_box(&bytes)).unwrap();
                black_box(records);
            });
        });
    }

    group.finish();
}

/// Benchmark streaming iteration without collecting.
fn bench_record_iter(c: &mut Criterion) {
    c.bench_function("record_iter_1000", |b| {
        let mut encoder = CanonicalEncoder::new();
        for record in generate_records(1000, 64) {
            encode_record(&mut encoder, &record.as_record_ref()).unwrap();
        }
        let bytes = encoder.into_bytes();

        b.iter(|| {
            let count = RecordIter::new(black_box(&bytes))
                .filter(|record| record.is_ok())
                .count();
            black_box(count);
        });
    });
}

criterion_group!(
    benches,
    bench_encode_record,
    bench_decode_page,
    bench_record_iter,
);

criterion_main!(benches);
