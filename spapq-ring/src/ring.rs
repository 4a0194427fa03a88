//! The bounded SPSC ring and its split producer/consumer handles.

use core::cell::{Cell, UnsafeCell};
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use std::sync::Arc;

use crate::index::{AtomicIndex, CacheAligned};

/// Slot wrapper holding one element of the ring.
///
/// `#[repr(transparent)]` guarantees `[Slot<T>]` has the same layout as
/// `[T]`, which the wrap-aware bulk copy in [`RingBuffer::push_slice`]
/// relies on.
#[repr(transparent)]
struct Slot<T> {
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    const fn new() -> Self {
        Self {
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

const _: () = {
    assert!(
        core::mem::size_of::<Slot<u64>>() == core::mem::size_of::<u64>()
            && core::mem::align_of::<Slot<u64>>() == core::mem::align_of::<u64>()
    );
    assert!(
        core::mem::size_of::<Slot<[u32; 3]>>() == core::mem::size_of::<[u32; 3]>()
            && core::mem::align_of::<Slot<[u32; 3]>>() == core::mem::align_of::<[u32; 3]>()
    );
};

/// Bounded single-producer/single-consumer FIFO.
///
/// Both cursors increase monotonically and start at the capacity `N`; the
/// slot for a cursor value `c` is `c % N`. Occupancy is `head - tail`, so
/// the ring is empty when the cursors agree and full when they differ by
/// `N`. The producer publishes `head` with Release after writing slots; the
/// consumer publishes `tail` with Release after reading them. Each side
/// caches the last-seen peer cursor and refreshes it with Acquire only when
/// the cache can no longer prove progress is possible.
///
/// `tail`, `cached_head`, `head`, `cached_tail` and the slot storage each
/// sit on their own cache line; the struct itself is cache-line aligned.
///
/// Shared-reference push/pop are crate-private: the safe concurrent API is
/// [`split`](RingBuffer::split), which hands out single-owner handles. The
/// `*_mut` variants cover exclusive single-threaded use.
#[repr(C)]
pub struct RingBuffer<T> {
    /// Consumer cursor; next slot to read.
    tail: CacheAligned<AtomicIndex>,
    /// Consumer's cache of `head`.
    cached_head: CacheAligned<Cell<usize>>,
    /// Producer cursor; next slot to write.
    head: CacheAligned<AtomicIndex>,
    /// Producer's cache of `tail`.
    cached_tail: CacheAligned<Cell<usize>>,
    data: CacheAligned<Box<[Slot<T>]>>,
}

// SAFETY: the slots are plain storage, so moving the ring between threads is
// fine whenever T itself moves between threads.
unsafe impl<T: Send> Send for RingBuffer<T> {}
// SAFETY: concurrent access is restricted to one producer thread (head,
// cached_tail, slot writes) and one consumer thread (tail, cached_head, slot
// reads); the non-Clone, non-Sync handles from `split` enforce this split.
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Create a ring holding up to `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics when `capacity` is zero, or when the platform word is narrower
    /// than 64 bits and `capacity` does not divide the counter modulus (the
    /// cursors must stay consistent across wrap-around).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffers must hold at least one element");
        assert!(
            usize::BITS >= 64 || (usize::MAX - capacity + 1) % capacity == 0,
            "capacity must divide the cursor modulus on narrow platforms"
        );

        let slots: Box<[Slot<T>]> = (0..capacity).map(|_| Slot::new()).collect();
        Self {
            tail: CacheAligned(AtomicIndex::new(capacity)),
            cached_head: CacheAligned(Cell::new(capacity)),
            head: CacheAligned(AtomicIndex::new(capacity)),
            cached_tail: CacheAligned(Cell::new(capacity)),
            data: CacheAligned(slots),
        }
    }

    /// Number of slots in the ring.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.0.len()
    }

    /// Occupancy snapshot. Advisory: both cursors may move concurrently.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.head.0.load().wrapping_sub(self.tail.0.load())
    }

    /// True if the ring appears empty. Advisory.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the ring appears full. Advisory.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    // ── producer side (single producer) ──────────────────────────────

    /// Append one element; fails when the ring is full.
    #[inline]
    pub(crate) fn push(&self, value: T) -> bool {
        let capacity = self.capacity();
        let head = self.head.0.load_relaxed();

        let mut tail = self.cached_tail.0.get();
        if head.wrapping_sub(tail) >= capacity {
            tail = self.tail.0.load();
            self.cached_tail.0.set(tail);
            if head.wrapping_sub(tail) >= capacity {
                return false;
            }
        }

        // SAFETY: the slot at `head` is outside the live region
        // [tail, head), so the consumer does not touch it until the
        // Release store below publishes it.
        unsafe { (*self.data.0[head % capacity].data.get()).write(value) };
        self.head.0.store(head.wrapping_add(1));
        true
    }

    /// Append a whole slice, or nothing.
    ///
    /// The batch lands atomically with respect to the consumer: slots are
    /// written up to the wrap boundary, then from the start of the ring, and
    /// the head moves once by `values.len()`.
    #[inline]
    pub(crate) fn push_slice(&self, values: &[T]) -> bool
    where
        T: Copy,
    {
        let n = values.len();
        if n == 0 {
            return true;
        }
        let capacity = self.capacity();
        let head = self.head.0.load_relaxed();

        let mut tail = self.cached_tail.0.get();
        if head.wrapping_sub(tail) + n > capacity {
            tail = self.tail.0.load();
            self.cached_tail.0.set(tail);
            if head.wrapping_sub(tail) + n > capacity {
                return false;
            }
        }

        let start = head % capacity;
        let to_end = capacity - start;
        // SAFETY: the n slots beginning at `start` (wrapping) are outside
        // the live region, and Slot<T> is layout-identical to T.
        unsafe {
            let dst = self.data.0[start].data.get() as *mut T;
            if n <= to_end {
                core::ptr::copy_nonoverlapping(values.as_ptr(), dst, n);
            } else {
                core::ptr::copy_nonoverlapping(values.as_ptr(), dst, to_end);
                core::ptr::copy_nonoverlapping(
                    values.as_ptr().add(to_end),
                    self.data.0[0].data.get() as *mut T,
                    n - to_end,
                );
            }
        }
        self.head.0.store(head.wrapping_add(n));
        true
    }

    // ── consumer side (single consumer) ──────────────────────────────

    /// Remove and return the oldest element.
    #[inline]
    pub(crate) fn pop(&self) -> Option<T> {
        let tail = self.tail.0.load_relaxed();

        let mut head = self.cached_head.0.get();
        if head == tail {
            head = self.head.0.load();
            self.cached_head.0.set(head);
            if head == tail {
                return None;
            }
        }

        // SAFETY: tail < head, so the slot holds an initialised element the
        // producer published before its Release store of `head`.
        let value = unsafe { (*self.data.0[tail % self.capacity()].data.get()).assume_init_read() };
        self.tail.0.store(tail.wrapping_add(1));
        Some(value)
    }

    // ── exclusive access ─────────────────────────────────────────────

    /// [`push`](Self::push) with exclusive access; no atomic overhead.
    #[inline]
    pub fn push_mut(&mut self, value: T) -> bool {
        let capacity = self.capacity();
        let head = self.head.0.load_mut();
        let tail = self.tail.0.load_mut();
        if head.wrapping_sub(tail) >= capacity {
            return false;
        }
        // SAFETY: exclusive access, and the slot is outside the live region.
        unsafe { (*self.data.0[head % capacity].data.get()).write(value) };
        self.head.0.store_mut(head.wrapping_add(1));
        true
    }

    /// [`push_slice`](Self::push_slice) with exclusive access.
    #[inline]
    pub fn push_slice_mut(&mut self, values: &[T]) -> bool
    where
        T: Copy,
    {
        let capacity = self.capacity();
        let head = self.head.0.load_mut();
        let tail = self.tail.0.load_mut();
        if head.wrapping_sub(tail) + values.len() > capacity {
            return false;
        }
        for (offset, &value) in values.iter().enumerate() {
            // SAFETY: exclusive access; every written slot is free.
            unsafe {
                (*self.data.0[head.wrapping_add(offset) % capacity].data.get()).write(value)
            };
        }
        self.head.0.store_mut(head.wrapping_add(values.len()));
        true
    }

    /// [`pop`](Self::pop) with exclusive access; no atomic overhead.
    #[inline]
    pub fn pop_mut(&mut self) -> Option<T> {
        let tail = self.tail.0.load_mut();
        let head = self.head.0.load_mut();
        if head == tail {
            return None;
        }
        // SAFETY: exclusive access and tail < head.
        let value = unsafe { (*self.data.0[tail % self.capacity()].data.get()).assume_init_read() };
        self.tail.0.store_mut(tail.wrapping_add(1));
        Some(value)
    }

    /// Split into single-owner producer and consumer handles.
    ///
    /// Neither handle is `Clone` or `Sync`, so exactly one thread can push
    /// and exactly one thread can pop — the SPSC contract becomes a type
    /// system fact instead of a usage rule.
    #[must_use]
    pub fn split(self) -> (Producer<T>, Consumer<T>)
    where
        T: Send,
    {
        let ring = Arc::new(self);
        (
            Producer {
                ring: Arc::clone(&ring),
                _not_sync: PhantomData,
            },
            Consumer {
                ring,
                _not_sync: PhantomData,
            },
        )
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        if core::mem::needs_drop::<T>() {
            let capacity = self.capacity();
            let mut tail = self.tail.0.load_mut();
            let head = self.head.0.load_mut();
            while tail != head {
                // SAFETY: exclusive access; [tail, head) holds initialised
                // elements nobody will read again.
                unsafe { (*self.data.0[tail % capacity].data.get()).assume_init_drop() };
                tail = tail.wrapping_add(1);
            }
        }
    }
}

/// Producer handle of a split [`RingBuffer`]. Can only push.
pub struct Producer<T> {
    ring: Arc<RingBuffer<T>>,
    /// Keeps the handle `!Sync`: one producer thread at a time.
    _not_sync: PhantomData<Cell<()>>,
}

/// Consumer handle of a split [`RingBuffer`]. Can only pop.
pub struct Consumer<T> {
    ring: Arc<RingBuffer<T>>,
    /// Keeps the handle `!Sync`: one consumer thread at a time.
    _not_sync: PhantomData<Cell<()>>,
}

impl<T: Send> Producer<T> {
    /// Append one element; fails when the ring is full.
    #[inline]
    pub fn push(&self, value: T) -> bool {
        self.ring.push(value)
    }

    /// Append a whole slice, or nothing.
    #[inline]
    pub fn push_slice(&self, values: &[T]) -> bool
    where
        T: Copy,
    {
        self.ring.push_slice(values)
    }

    /// Occupancy snapshot. Advisory.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// True if the ring appears empty. Advisory.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// True if the ring appears full. Advisory.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Number of slots in the ring.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T: Send> Consumer<T> {
    /// Remove and return the oldest element.
    #[inline]
    #[must_use]
    pub fn pop(&self) -> Option<T> {
        self.ring.pop()
    }

    /// Occupancy snapshot. Advisory.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// True if the ring appears empty. Advisory.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of slots in the ring.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use crate::index::CACHE_LINE;
    use core::mem;

    type Ring = RingBuffer<u64>;

    #[test]
    fn cursors_on_separate_cache_lines() {
        assert_eq!(mem::align_of::<Ring>() % CACHE_LINE, 0);
        assert_eq!(mem::size_of::<Ring>() % CACHE_LINE, 0);

        let tail = mem::offset_of!(Ring, tail);
        let cached_head = mem::offset_of!(Ring, cached_head);
        let head = mem::offset_of!(Ring, head);
        let cached_tail = mem::offset_of!(Ring, cached_tail);
        let data = mem::offset_of!(Ring, data);

        let offsets = [tail, cached_head, head, cached_tail, data];
        for pair in offsets.windows(2) {
            assert!(pair[0] < pair[1], "field order must be preserved");
        }
        for offset in offsets {
            assert_eq!(offset % CACHE_LINE, 0, "every field starts a cache line");
        }
    }
}
