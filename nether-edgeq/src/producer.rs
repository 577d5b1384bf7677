//! Producer handle (emulator side)

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::trace;

use crate::region::SharedRegion;
use crate::{FIFO_SIZE, QueueError, Timestamp};

/// Spins before the waiting producer starts yielding its time slice
const SPIN_LIMIT: u32 = 64;

/// Write side of the edge queue.
///
/// Owns `head` and the slot contents. Only one exists per region.
pub struct EdgeProducer<const N: usize = FIFO_SIZE> {
    region: Arc<SharedRegion<N>>,
    /// Publishes that found the ring full and had to wait
    stalls: u64,
}

impl<const N: usize> EdgeProducer<N> {
    pub(crate) fn new(region: Arc<SharedRegion<N>>) -> Self {
        Self { region, stalls: 0 }
    }

    /// Append an edge timestamp, waiting for space if the ring is full.
    ///
    /// Timestamps must be nondecreasing (modulo wrap) across calls. This is
    /// not checked here; the renderer clamps edges that arrive late.
    ///
    /// Blocks for as long as the consumer leaves the ring full. The wait is
    /// a bounded spin followed by `yield_now`, re-reading `tail` each time.
    pub fn publish(&mut self, timestamp: Timestamp) {
        let head = self.region.head.load(Ordering::Relaxed);
        let next = SharedRegion::<N>::next(head);

        if next == self.region.tail.load(Ordering::Acquire) {
            self.stalls += 1;
            trace!("Edge queue full, producer waiting (stall #{})", self.stalls);

            let mut spins = 0u32;
            while next == self.region.tail.load(Ordering::Acquire) {
                if spins < SPIN_LIMIT {
                    spins += 1;
                    std::hint::spin_loop();
                } else {
                    std::thread::yield_now();
                }
            }
        }

        self.commit(head, next, timestamp);
    }

    /// Append an edge timestamp if there is room.
    ///
    /// Returns [`QueueError::Full`] with the timestamp when the ring is full.
    pub fn try_publish(&mut self, timestamp: Timestamp) -> Result<(), QueueError> {
        let head = self.region.head.load(Ordering::Relaxed);
        let next = SharedRegion::<N>::next(head);

        if next == self.region.tail.load(Ordering::Acquire) {
            return Err(QueueError::Full(timestamp));
        }

        self.commit(head, next, timestamp);
        Ok(())
    }

    /// Slot write first, then the release store that makes it visible
    #[inline]
    fn commit(&mut self, head: u16, next: u16, timestamp: Timestamp) {
        self.region.write_slot(head, timestamp);
        self.region.head.store(next, Ordering::Release);
    }

    /// Number of slots in the ring
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Edges currently waiting for the consumer
    pub fn len(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.region.is_full()
    }

    /// How many publishes had to wait for the consumer
    pub fn stalls(&self) -> u64 {
        self.stalls
    }
}

impl<const N: usize> std::fmt::Debug for EdgeProducer<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeProducer")
            .field("region", &*self.region)
            .field("stalls", &self.stalls)
            .finish()
    }
}
