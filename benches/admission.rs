//! Benchmarks for the request hot path
//!
//! This benchmark measures:
//! - Level classification
//! - Uncontended admission and release
//! - Cache lookups at the different TTLs
//! - Row deduplication

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use quote_gate::cache::ResultCache;
use quote_gate::extractor::{dedup_rows, Row};
use quote_gate::load::Thresholds;
use quote_gate::resilience::AdmissionLimiter;
use quote_gate::LoadLevel;
use std::time::Duration;

fn bench_classify(c: &mut Criterion) {
    let thresholds = Thresholds::default();
    let readings = [(12.0, 40.0), (76.0, 40.0), (90.0, 85.0), (71.0, 69.0)];

    c.bench_function("classify_levels", |b| {
        b.iter(|| {
            let mut level = LoadLevel::Normal;
            for (cpu, mem) in readings {
                level = thresholds.classify(black_box(cpu), black_box(mem), level);
            }
            level
        })
    });
}

fn bench_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission");
    let limiter = AdmissionLimiter::new(1);

    group.bench_function("try_acquire_release", |b| {
        b.iter(|| {
            assert!(limiter.try_acquire());
            limiter.release();
        })
    });

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    group.bench_function("admit_uncontended", |b| {
        b.to_async(&rt).iter(|| async {
            let permit = limiter.admit(Duration::from_millis(100)).await.unwrap();
            drop(black_box(permit));
        })
    });
    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_lookup");
    let cache = ResultCache::new();
    cache.store(vec![Row::named("Gold", "2350.10"); 50]);

    group.bench_function("zero_ttl", |b| {
        b.iter(|| cache.lookup(black_box(Duration::ZERO)))
    });
    group.bench_function("hit", |b| {
        b.iter(|| cache.lookup(black_box(Duration::from_secs(3600))))
    });
    group.finish();
}

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_rows");
    let rows: Vec<Row> = (0..200)
        .map(|i| Row::named(format!("Instrument {}", i % 120), format!("{}.00", i % 120)))
        .collect();
    group.throughput(Throughput::Elements(rows.len() as u64));

    group.bench_function("200_rows_40pct_dupes", |b| {
        b.iter(|| dedup_rows(black_box(rows.clone())))
    });
    group.finish();
}

criterion_group!(benches, bench_classify, bench_admission, bench_cache, bench_dedup);
criterion_main!(benches);
