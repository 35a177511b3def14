//! Criterion benchmarks for the wire codec.
//!
//! Run with:
//!   cargo bench --bench varint

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pbwire::varint::{pack, pack64, scan, size64, unpack, unpack64};
use pbwire::{Type, Value};

fn bench_raw_varint(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_varint");

    for &value in &[127u64, 16_383, 1_000_000_000, u64::MAX] {
        let mut out = [0u8; 10];
        let encoded_len = pack64(&mut out, value);
        group.throughput(Throughput::Bytes(encoded_len as u64));

        group.bench_with_input(BenchmarkId::new("pack64", value), &value, |b, &v| {
            let mut dst = [0u8; 10];
            b.iter(|| pack64(&mut dst, v))
        });

        let encoded = out;
        group.bench_with_input(BenchmarkId::new("unpack64", value), &encoded, |b, enc| {
            b.iter(|| unpack64(&enc[..encoded_len]).unwrap())
        });
    }

    group.bench_function("size64_sweep", |b| {
        b.iter(|| {
            let mut total = 0usize;
            let mut v = 1u64;
            while v < u64::MAX / 128 {
                total += size64(v);
                v *= 128;
            }
            total
        })
    });

    group.bench_function("scan_ten_bytes", |b| {
        let bytes = [0x80u8, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        b.iter(|| scan(&bytes))
    });

    group.finish();
}

fn bench_typed_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("typed_codec");

    let cases: &[(&str, Type, Value<'static>)] = &[
        ("uint32", Type::Uint32, Value::Uint32(1_000_000_000)),
        ("sint32", Type::Sint32, Value::Sint32(-1_000_000_000)),
        ("int32_negative", Type::Int32, Value::Int32(-1)),
        ("double", Type::Double, Value::Double(core::f64::consts::PI)),
    ];

    for (name, typ, value) in cases {
        group.bench_function(BenchmarkId::new("pack", name), |b| {
            let mut dst = [0u8; 16];
            b.iter(|| pack(*typ, &mut dst, value))
        });

        let mut encoded = [0u8; 16];
        let n = pack(*typ, &mut encoded, value);
        group.bench_function(BenchmarkId::new("unpack", name), |b| {
            b.iter(|| unpack(*typ, &encoded[..n]).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_raw_varint, bench_typed_codec);
criterion_main!(benches);
