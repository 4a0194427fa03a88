//! Raw ring throughput: single-element and batched transfer between two
//! persistent threads.
//!
//! Threads stay alive across criterion iterations; a shared round counter
//! tells them when to run so `thread::spawn` never lands in the measurement.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use spapq_ring::{Consumer, Producer, RingBuffer};
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const ITEMS_PER_ROUND: u64 = 65_536;

struct Coordination {
    round: AtomicU64,
    producer_done: AtomicBool,
    consumer_done: AtomicBool,
    shutdown: AtomicBool,
}

struct Harness {
    shared: Arc<Coordination>,
    current_round: u64,
    producer: Option<JoinHandle<()>>,
    consumer: Option<JoinHandle<()>>,
}

impl Harness {
    fn new(batch: usize) -> Self {
        let shared = Arc::new(Coordination {
            round: AtomicU64::new(0),
            producer_done: AtomicBool::new(false),
            consumer_done: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        });
        let (tx, rx) = RingBuffer::new(1024).split();

        let producer = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || producer_loop(&shared, &tx, batch))
        };
        let consumer = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || consumer_loop(&shared, &rx))
        };

        Self {
            shared,
            current_round: 0,
            producer: Some(producer),
            consumer: Some(consumer),
        }
    }

    fn run_round(&mut self) {
        self.shared.producer_done.store(false, Ordering::Relaxed);
        self.shared.consumer_done.store(false, Ordering::Relaxed);
        self.current_round += 1;
        self.shared.round.store(self.current_round, Ordering::Release);

        while !self.shared.producer_done.load(Ordering::Acquire)
            || !self.shared.consumer_done.load(Ordering::Acquire)
        {
            std::hint::spin_loop();
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.current_round += 1;
        self.shared.round.store(self.current_round, Ordering::Release);
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.consumer.take() {
            let _ = handle.join();
        }
    }
}

fn producer_loop(shared: &Coordination, tx: &Producer<u64>, batch: usize) {
    let mut seen_round = 0;
    let scratch: Vec<u64> = (0..batch as u64).collect();
    loop {
        while shared.round.load(Ordering::Acquire) == seen_round {
            std::hint::spin_loop();
        }
        seen_round += 1;
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }

        if batch <= 1 {
            for i in 0..ITEMS_PER_ROUND {
                while !tx.push(black_box(i)) {
                    std::hint::spin_loop();
                }
            }
        } else {
            let mut sent = 0;
            while sent < ITEMS_PER_ROUND {
                while !tx.push_slice(black_box(&scratch)) {
                    std::hint::spin_loop();
                }
                sent += batch as u64;
            }
        }
        shared.producer_done.store(true, Ordering::Release);
    }
}

fn consumer_loop(shared: &Coordination, rx: &Consumer<u64>) {
    let mut seen_round = 0;
    loop {
        while shared.round.load(Ordering::Acquire) == seen_round {
            std::hint::spin_loop();
        }
        seen_round += 1;
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }

        let mut received = 0;
        while received < ITEMS_PER_ROUND {
            if let Some(value) = rx.pop() {
                black_box(value);
                received += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        shared.consumer_done.store(true, Ordering::Release);
    }
}

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Elements(ITEMS_PER_ROUND));

    for batch in [1usize, 8, 64] {
        let mut harness = Harness::new(batch);
        group.bench_function(format!("transfer/batch-{batch}"), |b| {
            b.iter(|| harness.run_round());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_spsc);
criterion_main!(benches);
