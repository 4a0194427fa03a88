//! Label-correcting single-source shortest paths.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::traits::{Outbox, ProcessHook};

/// Compressed sparse row graph: vertex `v`'s out-edges are
/// `edge_targets[source_pointers[v]..source_pointers[v + 1]]`.
pub struct CsrGraph {
    /// Per-vertex offsets into [`edge_targets`](CsrGraph::edge_targets);
    /// one trailing entry closes the last range.
    pub source_pointers: Vec<u32>,
    /// Edge target vertices.
    pub edge_targets: Vec<u32>,
}

impl CsrGraph {
    /// Number of vertices.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.source_pointers.len().saturating_sub(1)
    }
}

/// One tentative shortest-path label.
///
/// Ordered so a maximum-first [`BasicQueue`](crate::BasicQueue) pops the
/// *smallest* distance first, which keeps the priority order Dijkstra-like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SsspTask {
    /// Tentative distance of `vertex`.
    pub dist: u32,
    /// Vertex this label belongs to.
    pub vertex: u32,
}

impl Ord for SsspTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .dist
            .cmp(&self.dist)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for SsspTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Relaxes labels against a shared atomic distance table and enqueues every
/// neighbour whose tentative distance improves. Edges have unit weight.
pub struct SsspHook {
    graph: Arc<CsrGraph>,
    distances: Arc<Vec<AtomicU32>>,
}

impl SsspHook {
    /// Hook relaxing over `graph` into `distances`; seed the distance table
    /// with `u32::MAX` and the source with `0` before processing.
    #[must_use]
    pub fn new(graph: Arc<CsrGraph>, distances: Arc<Vec<AtomicU32>>) -> Self {
        Self { graph, distances }
    }
}

impl ProcessHook<SsspTask> for SsspHook {
    fn process_element(&mut self, task: SsspTask, out: &mut dyn Outbox<SsspTask>) {
        let vertex = task.vertex as usize;

        let mut current = self.distances[vertex].load(Ordering::Relaxed);
        while task.dist < current {
            match self.distances[vertex].compare_exchange_weak(
                current,
                task.dist,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    let next = task.dist + 1;
                    let edges = self.graph.source_pointers[vertex] as usize
                        ..self.graph.source_pointers[vertex + 1] as usize;
                    for edge in edges {
                        let neighbour = self.graph.edge_targets[edge];
                        if next < self.distances[neighbour as usize].load(Ordering::Relaxed) {
                            out.enqueue_global(SsspTask {
                                dist: next,
                                vertex: neighbour,
                            });
                        }
                    }
                    break;
                }
                Err(observed) => current = observed,
            }
        }
    }
}
