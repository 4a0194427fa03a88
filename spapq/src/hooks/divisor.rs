//! Multiple-walking workload used to validate task conservation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::traits::{Outbox, ProcessHook};

/// Tallies every processed value and enqueues its proper multiples below
/// `limit`.
///
/// Seeded with `1`, the per-value visit counts satisfy a fixed recurrence
/// over the divisor lattice (see [`expected_tallies`]); the answer is the
/// same for any network and any interleaving, so comparing against it
/// proves no task was lost or duplicated.
pub struct DivisorHook {
    limit: usize,
    tallies: Arc<Vec<AtomicUsize>>,
}

impl DivisorHook {
    /// Hook enumerating multiples below `limit`, tallying into `tallies`.
    #[must_use]
    pub fn new(limit: usize, tallies: Arc<Vec<AtomicUsize>>) -> Self {
        Self { limit, tallies }
    }
}

impl ProcessHook<usize> for DivisorHook {
    fn process_element(&mut self, task: usize, out: &mut dyn Outbox<usize>) {
        self.tallies[task].fetch_add(1, Ordering::Relaxed);
        let mut multiple = 2 * task;
        while multiple < self.limit {
            out.enqueue_global(multiple);
            multiple += task;
        }
    }
}

/// Visit counts of the multiple-walk seeded with `1`: each value is visited
/// once per visit of each of its proper divisors.
#[must_use]
pub fn expected_tallies(limit: usize) -> Vec<usize> {
    let mut counts = vec![0usize; limit];
    if limit > 1 {
        counts[1] = 1;
    }
    for value in 1..limit {
        if counts[value] == 0 {
            continue;
        }
        let mut multiple = 2 * value;
        while multiple < limit {
            counts[multiple] += counts[value];
            multiple += value;
        }
    }
    counts
}
