//! Shared memory region holding the queue indices and slots

use std::mem::offset_of;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use crate::{FIFO_SIZE, MAX_FIFO_SIZE, Timestamp};

/// The region both contexts agree on.
///
/// `AtomicU16`/`AtomicU32` have the same size and alignment as `u16`/`u32`,
/// so with `repr(C)` this is bit-identical to
/// `struct { u16 head; u16 tail; u32 fifo[N]; }`. Every access is an atomic
/// load or store, which gives the "uncached, no reordering across the publish
/// points" guarantee without explicit cache maintenance.
#[repr(C)]
pub struct SharedRegion<const N: usize = FIFO_SIZE> {
    /// First available slot for the writer
    pub(crate) head: AtomicU16,
    /// First full slot for the reader
    pub(crate) tail: AtomicU16,
    /// Edge timestamps
    pub(crate) fifo: [AtomicU32; N],
}

// Bit-exact contract for the default capacity
const _: () = {
    assert!(offset_of!(SharedRegion<FIFO_SIZE>, head) == 0);
    assert!(offset_of!(SharedRegion<FIFO_SIZE>, tail) == 2);
    assert!(offset_of!(SharedRegion<FIFO_SIZE>, fifo) == 4);
    assert!(size_of::<SharedRegion<FIFO_SIZE>>() == 4 + 4 * FIFO_SIZE);
};

impl<const N: usize> SharedRegion<N> {
    /// Evaluated when the capacity is instantiated; a bad `N` fails the build.
    const CAPACITY_OK: () = assert!(
        N.is_power_of_two() && N >= 2 && N <= MAX_FIFO_SIZE,
        "edge queue capacity must be a power of two between 2 and MAX_FIFO_SIZE"
    );

    /// Index wrap mask
    pub(crate) const MASK: u16 = (N - 1) as u16;

    /// A region with zeroed indices and slots
    pub const fn new() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            head: AtomicU16::new(0),
            tail: AtomicU16::new(0),
            fifo: [const { AtomicU32::new(0) }; N],
        }
    }

    /// Advance an index by one slot
    #[inline]
    pub(crate) const fn next(index: u16) -> u16 {
        index.wrapping_add(1) & Self::MASK
    }

    /// Snapshot of `head`
    pub fn head(&self) -> u16 {
        self.head.load(Ordering::Acquire)
    }

    /// Snapshot of `tail`
    pub fn tail(&self) -> u16 {
        self.tail.load(Ordering::Acquire)
    }

    /// Number of queued edges at the time of the call
    pub fn len(&self) -> usize {
        (self.head().wrapping_sub(self.tail()) & Self::MASK) as usize
    }

    /// True when no edges are queued
    pub fn is_empty(&self) -> bool {
        self.head() == self.tail()
    }

    /// True when one more publish would have to wait
    pub fn is_full(&self) -> bool {
        Self::next(self.head()) == self.tail()
    }

    #[inline]
    pub(crate) fn write_slot(&self, index: u16, timestamp: Timestamp) {
        self.fifo[index as usize].store(timestamp, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn read_slot(&self, index: u16) -> Timestamp {
        self.fifo[index as usize].load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for SharedRegion<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> std::fmt::Debug for SharedRegion<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("capacity", &N)
            .field("head", &self.head())
            .field("tail", &self.tail())
            .finish()
    }
}
