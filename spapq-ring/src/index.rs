//! Cursor and layout primitives for the ring buffer.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Target cache-line size in bytes.
pub(crate) const CACHE_LINE: usize = 64;

/// Forces `T` onto its own cache line.
///
/// The ring keeps producer-owned and consumer-owned cursors in separate
/// instances of this wrapper so that neither side's writes invalidate the
/// other side's line.
#[repr(C, align(64))]
pub(crate) struct CacheAligned<T>(pub(crate) T);

const _: () = assert!(core::mem::align_of::<CacheAligned<u8>>() == CACHE_LINE);

/// Monotonic cursor with Release publication and Acquire observation.
///
/// The owning side reads its own cursor relaxed; only the peer pays for an
/// Acquire load, and only when its cached copy is too stale to answer.
#[repr(transparent)]
pub(crate) struct AtomicIndex(AtomicUsize);

impl AtomicIndex {
    pub(crate) const fn new(value: usize) -> Self {
        Self(AtomicUsize::new(value))
    }

    #[inline]
    pub(crate) fn load(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn load_relaxed(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn store(&self, value: usize) {
        self.0.store(value, Ordering::Release);
    }

    /// Load with exclusive access, bypassing the atomic machinery.
    #[inline]
    pub(crate) fn load_mut(&mut self) -> usize {
        *self.0.get_mut()
    }

    /// Store with exclusive access, bypassing the atomic machinery.
    #[inline]
    pub(crate) fn store_mut(&mut self, value: usize) {
        *self.0.get_mut() = value;
    }
}
