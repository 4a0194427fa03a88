//! Sparse parallel approximate priority queue.
//!
//! A fixed set of worker threads, each pinned to its own logical core,
//! cooperatively drains a global pool of prioritised tasks. Every worker
//! owns a strict local priority queue; newly produced tasks travel between
//! workers over a statically configured directed network of bounded
//! single-producer/single-consumer ring buffers. Priority order is strict
//! per worker and FIFO per channel, but only *approximate* globally — the
//! price paid for a send path with no locks and no shared queue.
//!
//! # Architecture
//!
//! - [`QNetwork`] describes the topology: which worker sends to which,
//!   batch sizes, channel multiplicities, core pinning and buffering knobs.
//!   [`graphs`] holds example networks and the line-graph combinator for
//!   deriving larger ones.
//! - [`schedule`] turns per-channel frequencies into a cyclic
//!   earliest-deadline-first dispatch table with discrepancy below one, so
//!   each channel receives its configured share of outgoing batches.
//! - [`SpapQueue`] spawns and couples the workers, tracks the global task
//!   census and exposes the processing lifecycle.
//! - The caller supplies the per-task logic as a [`ProcessHook`] and, if
//!   desired, a custom local queue through [`BasicQueue`]. Reference hooks
//!   live in [`hooks`].
//!
//! Termination is census-driven: processing ends when the global count of
//! unprocessed tasks settles at zero, with per-worker credits amortising
//! the atomic traffic on the way there.
//!
//! # Example
//!
//! ```no_run
//! use spapq::hooks::{expected_fibonacci_tallies, FibonacciHook};
//! use spapq::{graphs, SpapQueue};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let n = 26;
//! let tallies: Arc<Vec<AtomicUsize>> =
//!     Arc::new((0..=n).map(|_| AtomicUsize::new(0)).collect());
//!
//! let mut queue = SpapQueue::<usize>::new(graphs::fully_connected(2));
//! assert!(queue.init_queue(|_| FibonacciHook::new(Arc::clone(&tallies))));
//! queue.push_before_processing(n, 0);
//! queue.process_queue();
//! queue.wait_process_finish();
//!
//! let expected = expected_fibonacci_tallies(n);
//! for (value, count) in tallies.iter().enumerate() {
//!     assert_eq!(count.load(Ordering::Relaxed), expected[value]);
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod barrier;
mod error;
pub mod graphs;
pub mod hooks;
pub mod network;
pub mod queue;
pub mod schedule;
pub mod traits;
mod worker;


pub use error::NetworkError;
pub use network::{QNetwork, QNetworkBuilder};
pub use queue::SpapQueue;
pub use traits::{BasicQueue, Outbox, ProcessHook};
