//! Contracts between the runtime and caller-supplied components.

use std::collections::BinaryHeap;

/// Local priority queue contract.
///
/// Each worker owns one of these; the runtime only requires that
/// [`pop`](BasicQueue::pop) returns the *maximum* element under the
/// caller's chosen order. [`std::collections::BinaryHeap`] is the default
/// implementation — wrap tasks in [`std::cmp::Reverse`] or give them a
/// custom `Ord` for smallest-first semantics.
pub trait BasicQueue<T>: Send {
    /// Number of queued tasks.
    fn len(&self) -> usize;

    /// True when no tasks are queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a task.
    fn push(&mut self, task: T);

    /// Remove and return the maximum task, or `None` when empty.
    fn pop(&mut self) -> Option<T>;
}

impl<T: Ord + Send> BasicQueue<T> for BinaryHeap<T> {
    #[inline]
    fn len(&self) -> usize {
        BinaryHeap::len(self)
    }

    #[inline]
    fn push(&mut self, task: T) {
        BinaryHeap::push(self, task);
    }

    #[inline]
    fn pop(&mut self) -> Option<T> {
        BinaryHeap::pop(self)
    }
}

/// Sink for tasks produced while processing.
///
/// Handed to [`ProcessHook::process_element`]; every call routes one new
/// task into the global pool, batched over the worker's outgoing channels
/// according to its dispatch schedule.
pub trait Outbox<T> {
    /// Route a newly produced task into the global pool.
    fn enqueue_global(&mut self, task: T);
}

/// Caller-supplied task processing logic.
///
/// One hook instance lives on each worker thread for the duration of a
/// processing cycle. The hook may call [`Outbox::enqueue_global`] any
/// number of times per task.
///
/// Hooks must not panic: a panicking hook tears down its worker thread and
/// the whole processing cycle with it.
pub trait ProcessHook<T>: Send {
    /// Process one task popped from the worker's local queue.
    fn process_element(&mut self, task: T, out: &mut dyn Outbox<T>);
}
