//! Benchmark: sweep round latency by sweeper thread count.
//!
//! Sweeps the same heap shape with 0, 1, 2 and 4 sweeper threads to show
//! what parallel sweeping buys over a synchronous round.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rudo_sweep::heap::OBJECT_AREA_SIZE;
use rudo_sweep::{Heap, HeapId, SpaceKind, SweepingCoordinator, TaskQueue, WorkerPool};
use std::hint::black_box;
use std::sync::Arc;

const PAGES: usize = 256;
const OBJECT_SIZE: usize = 64;

/// Fill `PAGES` pages, marking every other object live.
fn populated_heap() -> Arc<Heap> {
    let heap = Arc::new(Heap::new(HeapId(0)));
    for i in 0..PAGES {
        let kind = if i % 2 == 0 {
            SpaceKind::OldData
        } else {
            SpaceKind::OldPointer
        };
        let mut page = heap.new_page(kind);
        let mut live = true;
        while let Some(offset) = page.allocate_raw(OBJECT_SIZE) {
            if live {
                page.mark(offset);
            }
            live = !live;
        }
        heap.add_page(page);
    }
    heap
}

fn bench_sweep_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep_round");
    for threads in [0, 1, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter_batched(
                || {
                    let heap = populated_heap();
                    let coordinator = SweepingCoordinator::new(Arc::clone(&heap), threads);
                    (heap, coordinator)
                },
                |(heap, coordinator)| {
                    coordinator.start_sweeping();
                    let round = coordinator.ensure_sweeping_completed();
                    black_box(round);
                    black_box(heap.available_bytes() <= PAGES * OBJECT_AREA_SIZE);
                    coordinator
                },
                BatchSize::PerIteration,
            );
        });
    }
    group.finish();
}

fn bench_poll_completion(c: &mut Criterion) {
    let heap = populated_heap();
    let coordinator = SweepingCoordinator::new(heap, 4);
    coordinator.start_sweeping();
    coordinator.ensure_sweeping_completed();

    c.bench_function("sweeping_completed_idle", |b| {
        b.iter(|| black_box(coordinator.sweeping_completed()));
    });
}

fn bench_worker_pool_throughput(c: &mut Criterion) {
    c.bench_function("worker_pool_1000_tasks", |b| {
        b.iter(|| {
            let queue = Arc::new(TaskQueue::new());
            let pool = WorkerPool::new(4, Arc::clone(&queue));
            for i in 0..1000u64 {
                let _ = queue.append(Box::new(move || {
                    black_box(i.wrapping_mul(31));
                }));
            }
            drop(pool);
        });
    });
}

criterion_group!(
    benches,
    bench_sweep_round,
    bench_poll_completion,
    bench_worker_pool_throughput
);
criterion_main!(benches);
