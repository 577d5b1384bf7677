//! Consumer handle (renderer side)

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::region::SharedRegion;
use crate::{FIFO_SIZE, Timestamp};

/// Read side of the edge queue.
///
/// Owns `tail`. Only one exists per region. Never blocks, so it is safe to
/// call from a timer tick.
pub struct EdgeConsumer<const N: usize = FIFO_SIZE> {
    region: Arc<SharedRegion<N>>,
}

impl<const N: usize> EdgeConsumer<N> {
    pub(crate) fn new(region: Arc<SharedRegion<N>>) -> Self {
        Self { region }
    }

    /// Take the oldest queued timestamp, or `None` if the ring is empty
    #[inline]
    pub fn try_consume(&mut self) -> Option<Timestamp> {
        let tail = self.region.tail.load(Ordering::Relaxed);
        if tail == self.region.head.load(Ordering::Acquire) {
            return None;
        }

        let timestamp = self.region.read_slot(tail);
        // Slot read is complete before the producer may reuse it
        self.region
            .tail
            .store(SharedRegion::<N>::next(tail), Ordering::Release);
        Some(timestamp)
    }

    /// Number of slots in the ring
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Edges currently queued
    pub fn len(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.region.is_full()
    }
}

impl<const N: usize> std::fmt::Debug for EdgeConsumer<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeConsumer")
            .field("region", &*self.region)
            .finish()
    }
}
