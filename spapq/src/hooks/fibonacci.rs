//! Recursive-spawn workload shaped like naive Fibonacci.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::traits::{Outbox, ProcessHook};

/// Spawns `v - 1` and `v - 2` for every processed value `v`.
///
/// Seeding a single `n` makes value `v` arrive exactly as often as the
/// two-ply recursion visits it, so `tallies[v]` follows the Fibonacci
/// numbers whatever the workers' interleaving.
pub struct FibonacciHook {
    tallies: Arc<Vec<AtomicUsize>>,
}

impl FibonacciHook {
    /// Hook writing per-value visit counts into `tallies`.
    #[must_use]
    pub fn new(tallies: Arc<Vec<AtomicUsize>>) -> Self {
        Self { tallies }
    }
}

impl ProcessHook<usize> for FibonacciHook {
    fn process_element(&mut self, task: usize, out: &mut dyn Outbox<usize>) {
        self.tallies[task].fetch_add(1, Ordering::Relaxed);
        if task > 0 {
            out.enqueue_global(task - 1);
        }
        if task > 1 {
            out.enqueue_global(task - 2);
        }
    }
}

/// Visit counts of the two-ply recursion seeded with `n`: entry `v` is how
/// often value `v` is processed.
#[must_use]
pub fn expected_tallies(n: usize) -> Vec<usize> {
    let mut counts = vec![1usize; n + 1];
    for value in (0..n.saturating_sub(1)).rev() {
        counts[value] = counts[value + 1] + counts[value + 2];
    }
    counts
}
