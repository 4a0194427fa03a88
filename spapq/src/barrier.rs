//! Thread barrier for the queue's start-up and teardown handshakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Busy-spin iterations before a waiter starts yielding its time slice,
/// matching the start-flag wait in the worker loop.
const SPIN_LIMIT: u32 = 64;

/// The low half of the barrier word counts arrivals of the current
/// generation; the high half numbers generations.
const GENERATION_SHIFT: u32 = usize::BITS / 2;
const ARRIVAL_MASK: usize = (1 << GENERATION_SHIFT) - 1;

/// Reusable counting barrier that spins instead of parking.
///
/// The phases this gates — allocation before the start flag, teardown
/// after the last task — complete within microseconds of each other, so a
/// futex round-trip per worker would dominate them. Arrival count and
/// generation share one atomic word: arrivals are a `fetch_add` on the low
/// half, and the last arrival reopens the barrier with a single store that
/// clears the count and bumps the generation. Waiters only watch the
/// generation half, so arrivals for the next cycle cannot confuse them.
pub(crate) struct SpinBarrier {
    state: AtomicUsize,
    parties: usize,
}

impl SpinBarrier {
    pub(crate) fn new(parties: usize) -> Self {
        assert!(parties > 0, "a barrier needs at least one party");
        debug_assert!(parties < ARRIVAL_MASK);
        Self {
            state: AtomicUsize::new(0),
            parties,
        }
    }

    /// Block until all parties of the current generation have arrived.
    pub(crate) fn wait(&self) {
        let observed = self.state.fetch_add(1, Ordering::AcqRel);
        let generation = observed >> GENERATION_SHIFT;

        if (observed & ARRIVAL_MASK) + 1 == self.parties {
            // last arrival: zero the count and advance the generation
            let next = (generation + 1) & ARRIVAL_MASK;
            self.state.store(next << GENERATION_SHIFT, Ordering::Release);
            return;
        }

        let mut spins = 0;
        while self.state.load(Ordering::Acquire) >> GENERATION_SHIFT == generation {
            if spins < SPIN_LIMIT {
                std::hint::spin_loop();
                spins += 1;
            } else {
                thread::yield_now();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn releases_all_parties_every_generation() {
        let parties = 4;
        let barrier = Arc::new(SpinBarrier::new(parties));
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..parties)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for round in 1..=3 {
                        counter.fetch_add(1, Ordering::SeqCst);
                        barrier.wait();
                        assert!(counter.load(Ordering::SeqCst) >= round * parties);
                        barrier.wait();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("barrier participant panicked");
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3 * parties);
    }

    #[test]
    fn single_party_never_blocks() {
        let barrier = SpinBarrier::new(1);
        for _ in 0..10 {
            barrier.wait();
        }
    }
}
