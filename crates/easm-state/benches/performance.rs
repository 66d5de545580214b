//! Performance benchmarks for easm-state operations.
//!
//! Run with: cargo bench --package easm-state

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use easm_state::{path, update_at, Path, Store, StoreOps, Value};
use serde_json::json;

// ============================================================================
// Helper functions to generate test data
// ============================================================================

/// Generate a flat document with N fields
fn generate_flat_doc(num_fields: usize) -> Value {
    let mut obj = serde_json::Map::new();
    for i in 0..num_fields {
        obj.insert(format!("field_{}", i), json!(i));
    }
    Value::from(serde_json::Value::Object(obj))
}

/// Generate a deeply nested document and the path to its leaf
fn generate_nested_doc(depth: usize) -> (Value, Path) {
    let mut current = json!({"value": 42});
    for i in (0..depth).rev() {
        let mut obj = serde_json::Map::new();
        obj.insert(format!("level_{}", i), current);
        current = serde_json::Value::Object(obj);
    }
    let mut leaf = Path::root();
    for i in 0..depth {
        leaf.push(format!("level_{}", i));
    }
    leaf.push("value");
    (Value::from(current), leaf)
}

// ============================================================================
// Benchmark: single update with varying document sizes
// ============================================================================

fn bench_update_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_flat_doc");

    for num_fields in [10, 100, 1000, 10000] {
        group.throughput(Throughput::Elements(1));

        let doc = generate_flat_doc(num_fields);
        let target = path!(format!("field_{}", num_fields / 2));

        group.bench_with_input(
            BenchmarkId::from_parameter(num_fields),
            &num_fields,
            |b, _| {
                b.iter(|| {
                    let result = update_at(black_box(&doc), black_box(&target), Value::from(-1));
                    black_box(result)
                });
            },
        );
    }

    group.finish();
}

fn bench_update_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_nested_doc");

    for depth in [1, 5, 10, 20, 50] {
        let (doc, leaf) = generate_nested_doc(depth);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let result = update_at(black_box(&doc), black_box(&leaf), Value::from(0));
                black_box(result)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: store operations
// ============================================================================

fn bench_store_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_operations");

    group.bench_function("set", |b| {
        let store = Store::manual(json!({"count": 0}));
        let mut n = 0i64;
        b.iter(|| {
            n += 1;
            store.update(path!("count"), black_box(n));
        });
    });

    group.bench_function("push_pop", |b| {
        let store = Store::manual(json!({"items": []}));
        b.iter(|| {
            store.push(path!("items"), black_box(1));
            black_box(store.pop(path!("items")))
        });
    });

    group.bench_function("merge", |b| {
        let store = Store::manual(json!({"obj": {"a": 1}}));
        let mut n = 0i64;
        b.iter(|| {
            n += 1;
            black_box(store.merge(path!("obj"), json!({"b": n})))
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark: flush with many listeners
// ============================================================================

fn bench_flush_listeners(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush_listeners");

    for num_listeners in [10, 100, 1000] {
        group.throughput(Throughput::Elements(num_listeners as u64));

        let store = Store::manual(generate_flat_doc(num_listeners));
        let subs: Vec<_> = (0..num_listeners)
            .map(|i| store.add_listener(path!(format!("field_{}", i)), |v: Option<&Value>| {
                black_box(v);
            }))
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(num_listeners),
            &num_listeners,
            |b, _| {
                let mut n = 0i64;
                b.iter(|| {
                    n += 1;
                    store.update(path!("field_0"), n);
                    black_box(store.flush())
                });
            },
        );

        drop(subs);
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_update_flat,
    bench_update_nested,
    bench_store_operations,
    bench_flush_listeners,
);

criterion_main!(benches);
