use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::thread;

// Reference the main crate
extern crate vfile;

use vfile::infrastructure::lwlock::{storage_use, StorageLock};

// Test configuration
const THREADS: usize = 4;
const OPERATIONS_PER_THREAD: usize = 10_000;

// Benchmark a single uncontended acquire/release
pub fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("Uncontended");

    group.bench_function("storage_use", |b| b.iter(|| drop(storage_use())));

    group.bench_function("nested_storage_use", |b| {
        b.iter(|| {
            let _outer = storage_use();
            let _inner = storage_use();
        })
    });

    group.finish();
}

// Benchmark several threads fighting over one lock
pub fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("Contended");

    group.bench_function("StorageLock", |b| {
        b.iter(|| {
            let lock = Arc::new(StorageLock::new());
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let lock = lock.clone();
                    thread::spawn(move || {
                        for _ in 0..OPERATIONS_PER_THREAD {
                            drop(lock.acquire());
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_contended);
criterion_main!(benches);
