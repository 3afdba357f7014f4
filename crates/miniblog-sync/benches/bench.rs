use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::future::join_all;
use miniblog_sync::{AsyncGroup, Group};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::{Duration, Instant},
};
use tokio::runtime::Builder;

// Calls issued per benchmark iteration (per-thread for multi-threaded).
const TOTAL_CALLS: usize = 4096;

/// Benchmarks the bookkeeping cost of a call that never finds a peer.
fn bench_group_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("group/uncontended");
    group.throughput(Throughput::Elements(TOTAL_CALLS as u64));

    group.bench_function(format!("elems/{TOTAL_CALLS}"), |b| {
        b.iter_custom(|iters| {
            let calls: Group<usize, usize> = Group::new();
            let start = Instant::now();

            for _ in 0..iters {
                for key in 0..TOTAL_CALLS {
                    black_box(calls.call(key, || key));
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks many threads hammering the same key with slow-ish work.
fn bench_group_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("group/contended");

    for threads in [2, 4, 8] {
        group.throughput(Throughput::Elements((threads * TOTAL_CALLS) as u64));
        group.bench_function(format!("threads/{threads}/elems/{TOTAL_CALLS}"), |b| {
            b.iter_custom(|iters| {
                let calls = Arc::new(Group::<&'static str, u64>::new());
                let barrier = Arc::new(Barrier::new(threads + 1));
                let mut elapsed = Duration::ZERO;

                for _ in 0..iters {
                    let start = scope(|s| {
                        for _ in 0..threads {
                            let calls = Arc::clone(&calls);
                            let barrier = Arc::clone(&barrier);
                            s.spawn(move || {
                                barrier.wait();
                                for i in 0..TOTAL_CALLS {
                                    black_box(calls.call("hot", || black_box(i as u64)));
                                }
                            });
                        }
                        barrier.wait();
                        Instant::now()
                    });
                    // `scope` joins every thread before returning.
                    elapsed += start.elapsed();
                }

                elapsed
            });
        });
    }

    group.finish();
}

/// Benchmarks concurrent tasks on a multi-threaded Tokio runtime sharing a
/// handful of keys.
fn bench_async_group_tokio(c: &mut Criterion) {
    const TASKS: usize = 64;
    const KEYS: usize = 4;

    let mut group = c.benchmark_group("async_group/tokio");
    group.throughput(Throughput::Elements((TASKS * TOTAL_CALLS / KEYS) as u64));

    group.bench_function(format!("tasks/{TASKS}/keys/{KEYS}"), |b| {
        let rt = Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        b.to_async(&rt).iter_custom(|iters| async move {
            let calls = Arc::new(AsyncGroup::<usize, u64>::new());
            let start = Instant::now();

            for _ in 0..iters {
                let tasks = (0..TASKS).map(|task| {
                    let calls = Arc::clone(&calls);
                    tokio::spawn(async move {
                        for i in 0..TOTAL_CALLS / KEYS {
                            let flight = calls
                                .call(task % KEYS, || async move {
                                    tokio::task::yield_now().await;
                                    i as u64
                                })
                                .await;
                            black_box(flight);
                        }
                    })
                });
                join_all(tasks).await;
            }

            start.elapsed()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_group_uncontended,
    bench_group_contended,
    bench_async_group_tokio
);
criterion_main!(benches);
