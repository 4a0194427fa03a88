//! Bounded lock-free single-producer/single-consumer ring buffer.
//!
//! `RingBuffer` is the channel medium of the `spapq` runtime: every directed
//! channel between two workers is one ring, written by exactly one thread and
//! read by exactly one thread. The buffer never reallocates, never blocks and
//! never drops data — a full ring rejects the push and leaves backpressure
//! handling to the caller.
//!
//! Cursors are monotonically increasing counters published with
//! Acquire/Release ordering; each side keeps a cached copy of the peer's
//! cursor so the common case of a push or pop touches no foreign cache line.
//!
//! # Example
//!
//! ```
//! use spapq_ring::RingBuffer;
//! use std::thread;
//!
//! let (producer, consumer) = RingBuffer::new(64).split();
//!
//! let t = thread::spawn(move || {
//!     for i in 0..1000u64 {
//!         while !producer.push(i) {
//!             std::hint::spin_loop();
//!         }
//!     }
//! });
//!
//! let mut next = 0;
//! while next < 1000 {
//!     if let Some(v) = consumer.pop() {
//!         assert_eq!(v, next);
//!         next += 1;
//!     }
//! }
//! t.join().unwrap();
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

mod index;
mod ring;


pub use ring::{Consumer, Producer, RingBuffer};
