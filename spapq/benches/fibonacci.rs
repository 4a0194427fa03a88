//! Recursive-spawn throughput on one, two and four workers.
//!
//! The hook spawns `v - 1` and `v - 2` per task, so the work per seed
//! follows the Fibonacci numbers; throughput is reported in processed
//! tasks.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use spapq::hooks::{expected_fibonacci_tallies, FibonacciHook};
use spapq::{QNetwork, SpapQueue};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

const FIBONACCI_SEED: usize = 30;

fn processed_elements(n: usize) -> u64 {
    expected_fibonacci_tallies(n).iter().map(|&c| c as u64).sum()
}

fn one_worker_network() -> QNetwork {
    QNetwork::builder(vec![0, 1], vec![0])
        .batch_sizes(vec![8])
        .enqueue_frequency(24)
        .channel_buffer_size(8)
        .max_push_attempts(1)
        .build()
}

fn two_worker_network() -> QNetwork {
    QNetwork::builder(vec![0, 2, 4], vec![0, 1, 1, 0])
        .multiplicities(vec![2, 1, 2, 1])
        .batch_sizes(vec![8, 16, 8, 16])
        .enqueue_frequency(24)
        .channel_buffer_size(64)
        .max_push_attempts(2)
        .build()
}

fn four_worker_network() -> QNetwork {
    QNetwork::builder(vec![0, 2, 4, 6, 8], vec![0, 1, 2, 3, 2, 3, 0, 1])
        .multiplicities(vec![2, 2, 1, 1, 2, 2, 1, 1])
        .batch_sizes(vec![8, 8, 16, 16, 8, 8, 16, 16])
        .enqueue_frequency(24)
        .channel_buffer_size(64)
        .max_push_attempts(2)
        .build()
}

fn bench_network(c: &mut Criterion, name: &str, network: QNetwork) {
    let mut group = c.benchmark_group("fibonacci");
    group.throughput(Throughput::Elements(processed_elements(FIBONACCI_SEED)));
    group.sample_size(10);

    let tallies: Arc<Vec<AtomicUsize>> =
        Arc::new((0..=FIBONACCI_SEED).map(|_| AtomicUsize::new(0)).collect());
    let mut queue = SpapQueue::<usize>::new(network);

    group.bench_function(name, |b| {
        b.iter(|| {
            assert!(queue.init_queue(|_| FibonacciHook::new(Arc::clone(&tallies))));
            queue.push_before_processing(FIBONACCI_SEED, 0);
            queue.process_queue();
            queue.wait_process_finish();
        });
    });

    group.finish();
}

fn fibonacci_benches(c: &mut Criterion) {
    bench_network(c, "1-worker", one_worker_network());
    bench_network(c, "2-workers", two_worker_network());
    bench_network(c, "4-workers", four_worker_network());
}

criterion_group!(benches, fibonacci_benches);
criterion_main!(benches);
