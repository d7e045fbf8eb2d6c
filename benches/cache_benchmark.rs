//! Performance benchmarks for cache-shell
//!
//! This benchmark suite measures:
//! - Key preprocessing
//! - Value encoding and decoding
//! - Keyed store operations over the in-memory backend, per connection mode
//!
//! Run with: cargo bench
//! View results: open target/criterion/report/index.html

use cache_shell::backend::InMemoryConnector;
use cache_shell::key::namespace_key;
use cache_shell::serialization::{decode_value, encode_value};
use cache_shell::{ConnectionMode, ConnectionRegistry, KeyValueStore, NamespacedCache, RegistryConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use std::hint::black_box;
use std::sync::Arc;

fn store(mode: ConnectionMode) -> KeyValueStore<InMemoryConnector> {
    KeyValueStore::new(Arc::new(ConnectionRegistry::new(
        InMemoryConnector::new(),
        RegistryConfig::default().with_mode(mode),
    )))
}

/// JSON document with `entries` children.
fn document(entries: usize) -> Value {
    let children: Vec<Value> = (0..entries)
        .map(|i| json!({ "id": i, "label": format!("node-{}", i), "active": i % 2 == 0 }))
        .collect();
    json!({ "id": "root", "children": children })
}

// ============================================================================
// Group 1: Key and Value Handling
// ============================================================================

fn key_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("keys");

    group.bench_function("namespace_key_known", |b| {
        b.iter(|| namespace_key(black_box("taxonomy"), black_box("Genre-Jazz-Bebop")))
    });

    group.bench_function("namespace_key_unknown", |b| {
        b.iter(|| namespace_key(black_box("sessions"), black_box("Genre-Jazz-Bebop")))
    });

    group.finish();
}

fn encoding_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");

    for entries in [1, 10, 100, 1_000].iter() {
        let value = document(*entries);
        let encoded = encode_value(&value);

        group
            .throughput(Throughput::Bytes(encoded.len() as u64))
            .bench_with_input(BenchmarkId::new("encode", entries), &value, |b, value| {
                b.iter(|| encode_value(black_box(value)))
            });

        group
            .throughput(Throughput::Bytes(encoded.len() as u64))
            .bench_with_input(BenchmarkId::new("decode", entries), &encoded, |b, raw| {
                b.iter(|| decode_value(black_box(raw.clone())))
            });
    }

    group.bench_function("decode_raw_fallback", |b| {
        b.iter(|| decode_value(black_box("plain text, not json".to_string())))
    });

    group.finish();
}

// ============================================================================
// Group 2: Store Operations
// ============================================================================

fn store_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for mode in [ConnectionMode::Shared, ConnectionMode::PerOperation] {
        let label = format!("{:?}", mode);

        group.bench_function(BenchmarkId::new("set", &label), |b| {
            let store = store(mode);
            let value = document(10);

            b.to_async(&rt).iter(|| async {
                store
                    .set(black_box("taxonomy-bench"), black_box(&value), None)
                    .await
                    .expect("Failed to set")
            });
        });

        group.bench_function(BenchmarkId::new("get_hit", &label), |b| {
            let store = store(mode);
            rt.block_on(async {
                store
                    .set("taxonomy-bench", &document(10), None)
                    .await
                    .expect("Failed to set");
            });

            b.to_async(&rt)
                .iter(|| async { store.get(black_box("taxonomy-bench")).await });
        });

        group.bench_function(BenchmarkId::new("get_miss", &label), |b| {
            let store = store(mode);

            b.to_async(&rt)
                .iter(|| async { store.get(black_box("taxonomy-missing")).await });
        });
    }

    group.bench_function("namespaced_save_and_fetch", |b| {
        let cache = NamespacedCache::taxonomy(store(ConnectionMode::Shared));

        b.to_async(&rt).iter(|| async {
            cache
                .save_to_cache("hype", "hypeMan", None)
                .await
                .expect("Failed to save");
            cache.get_from_cache(black_box("hype")).await
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    key_benchmarks,
    encoding_benchmarks,
    store_benchmarks
);
criterion_main!(benches);
