//! Single-source shortest paths over a random geometric graph.
//!
//! The graph links each vertex to its nearest predecessors in a random
//! unit-square embedding, matching the shape of road-network workloads.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spapq::hooks::{CsrGraph, SsspHook, SsspTask};
use spapq::{QNetwork, SpapQueue};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const NUM_VERTICES: u32 = 20_000;
const EDGES_PER_VERTEX: usize = 7;
const SEED: u64 = 1729;

/// Symmetric k-nearest-predecessor graph over random points in the square.
fn geometric_graph(num_vertices: u32, edges_per_vertex: usize, seed: u64) -> CsrGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let xs: Vec<f64> = (0..num_vertices).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let ys: Vec<f64> = (0..num_vertices).map(|_| rng.gen_range(-1.0..1.0)).collect();

    let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); num_vertices as usize];
    for v in 0..num_vertices as usize {
        // max-heap over (distance bits, vertex) keeps the k closest
        // predecessors; non-negative floats order like their bit patterns
        let mut closest: BinaryHeap<(u64, u32)> = BinaryHeap::new();
        for w in 0..v {
            let key = (xs[w] - xs[v]).hypot(ys[w] - ys[v]).to_bits();
            if closest.len() < edges_per_vertex {
                closest.push((key, w as u32));
            } else if closest.peek().is_some_and(|&(top, _)| top > key) {
                closest.pop();
                closest.push((key, w as u32));
            }
        }
        for (_, w) in closest {
            adjacency[w as usize].push(v as u32);
            adjacency[v].push(w);
        }
    }
    for neighbours in &mut adjacency {
        neighbours.sort_unstable();
    }

    let mut source_pointers = Vec::with_capacity(num_vertices as usize + 1);
    let mut edge_targets = Vec::new();
    for neighbours in &adjacency {
        source_pointers.push(edge_targets.len() as u32);
        edge_targets.extend_from_slice(neighbours);
    }
    source_pointers.push(edge_targets.len() as u32);

    CsrGraph {
        source_pointers,
        edge_targets,
    }
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

fn bench_network(c: &mut Criterion, name: &str, network: QNetwork, graph: &Arc<CsrGraph>) {
    let mut group = c.benchmark_group("sssp");
    group.throughput(Throughput::Elements(u64::from(NUM_VERTICES)));
    group.sample_size(10);

    let distances: Arc<Vec<AtomicU32>> = Arc::new(
        (0..graph.num_vertices())
            .map(|_| AtomicU32::new(u32::MAX))
            .collect(),
    );
    let mut queue = SpapQueue::<SsspTask>::new(network);

    group.bench_function(name, |b| {
        b.iter(|| {
            for distance in distances.iter() {
                distance.store(u32::MAX, Ordering::Relaxed);
            }
            assert!(
                queue.init_queue(|_| SsspHook::new(Arc::clone(graph), Arc::clone(&distances)))
            );
            queue.push_before_processing(SsspTask { dist: 0, vertex: 0 }, 0);
            queue.process_queue();
            queue.wait_process_finish();
        });
    });

    group.finish();
}

fn sssp_benches(c: &mut Criterion) {
    let graph = Arc::new(geometric_graph(NUM_VERTICES, EDGES_PER_VERTEX, SEED));
    bench_network(c, "1-worker", one_worker_network(), &graph);
    bench_network(c, "2-workers", two_worker_network(), &graph);
    bench_network(c, "4-workers", four_worker_network(), &graph);
}

criterion_group!(benches, sssp_benches);
criterion_main!(benches);
