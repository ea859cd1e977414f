//! # Entity Allocator Benchmark
//!
//! Create/destroy throughput of the entity database, single-threaded and
//! contended.
//!
//! Run with: `cargo bench --package tessera_core --bench ecs_benchmark`

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::{Database, DestroyedQueue, Entity};

const ENTITY_COUNT: usize = 1_000_000;

/// Benchmark: one `create` call per entity.
fn bench_create_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_single");

    for count in [10_000, 100_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let db = Database::new();
                for _ in 0..count {
                    black_box(db.create());
                }
                db.entity_count()
            });
        });
    }

    group.finish();
}

/// Benchmark: one lock acquisition for the whole batch.
fn bench_create_batch(c: &mut Criterion) {
    c.bench_function("create_batch_1M", |b| {
        b.iter(|| {
            let db = Database::new();
            let mut entities = vec![Entity::NULL; ENTITY_COUNT];
            db.create_into(&mut entities);
            black_box(entities.len())
        });
    });
}

/// Benchmark: steady-state churn through the free list.
fn bench_recycle(c: &mut Criterion) {
    let db = Database::new();
    let mut entities = db.create_many(100_000);

    c.bench_function("destroy_create_100K", |b| {
        b.iter(|| {
            db.destroy_batch(&entities);
            db.create_into(&mut entities);
            black_box(entities[0])
        });
    });
}

/// Benchmark: batch destruction with a queue listener attached.
fn bench_destroy_with_listener(c: &mut Criterion) {
    let db = Database::new();
    let queue = Arc::new(DestroyedQueue::new());
    db.register_listener(queue.clone());
    let mut entities = db.create_many(100_000);

    c.bench_function("destroy_notify_100K", |b| {
        b.iter(|| {
            db.destroy_batch(&entities);
            let drained = queue.drain();
            db.create_into(&mut entities);
            black_box(drained.len())
        });
    });
}

/// Benchmark: lock-free liveness checks.
fn bench_is_alive(c: &mut Criterion) {
    let db = Database::new();
    let entities = db.create_many(ENTITY_COUNT);
    db.destroy_batch(&entities[..ENTITY_COUNT / 2]);

    c.bench_function("is_alive_1M", |b| {
        b.iter(|| entities.iter().filter(|e| db.is_alive(**e)).count());
    });
}

/// Benchmark: several threads creating and destroying concurrently.
fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_churn");

    for threads in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let db = Arc::new(Database::new());
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let db = Arc::clone(&db);
                        thread::spawn(move || {
                            for _ in 0..1_000 {
                                let batch = db.create_many(64);
                                db.destroy_batch(&batch);
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().ok();
                }
                db.entity_count()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_create_single,
    bench_create_batch,
    bench_recycle,
    bench_destroy_with_listener,
    bench_is_alive,
    bench_contended,
);

criterion_main!(benches);
