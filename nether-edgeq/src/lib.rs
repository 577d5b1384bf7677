//! Nether-EdgeQ: speaker edge queue shared between two execution contexts
//!
//! A fixed-capacity single-producer/single-consumer ring of edge timestamps.
//! The producer is the machine emulator (it reports every PC-speaker toggle
//! with its reference-clock cycle count); the consumer is the real-time
//! renderer that turns edges into PCM.
//!
//! The queue lives in one [`SharedRegion`] with a fixed, C-compatible layout.
//! Neither side owns the region; instead mutation rights are partitioned:
//!
//! | Field  | Written by | Read by         |
//! |--------|------------|-----------------|
//! | `head` | producer   | both            |
//! | `tail` | consumer   | both            |
//! | `fifo` | producer   | consumer        |
//!
//! That partition is what lets both sides run without locks.
//!
//! # Layout
//!
//! ```text
//! offset 0x000: head  u16   first free slot (producer)
//! offset 0x002: tail  u16   first full slot (consumer)
//! offset 0x004: fifo  [u32; FIFO_SIZE]   edge timestamps
//! ```
//!
//! # Overflow
//!
//! [`EdgeProducer::publish`] never drops an edge. When the ring is full it
//! spins until the consumer frees a slot. A dropped edge would invert the
//! inferred speaker polarity for the rest of the session, so producer latency
//! is traded for correctness. [`EdgeProducer::try_publish`] is the
//! non-blocking variant.
//!
//! # Usage
//!
//! ```
//! use nether_edgeq::EdgeQueue;
//!
//! let (mut producer, mut consumer) = EdgeQueue::<8>::new().split();
//!
//! producer.publish(100);
//! producer.publish(250);
//!
//! assert_eq!(consumer.try_consume(), Some(100));
//! assert_eq!(consumer.try_consume(), Some(250));
//! assert_eq!(consumer.try_consume(), None);
//! ```

use std::sync::Arc;

mod consumer;
mod producer;
mod region;

pub use consumer::EdgeConsumer;
pub use producer::EdgeProducer;
pub use region::SharedRegion;

#[cfg(test)]
mod tests;

// =============================================================================
// Constants
// =============================================================================

/// Default queue capacity in slots (at most `FIFO_SIZE - 1` edges in flight)
pub const FIFO_SIZE: usize = 512;

/// Largest capacity that fits the 2 KiB slot budget of the shared region
pub const MAX_FIFO_SIZE: usize = 512;

/// Edge timestamp in reference-clock cycles (wraps modulo 2^32)
pub type Timestamp = u32;

// =============================================================================
// Error Type
// =============================================================================

/// Errors reported by the non-blocking queue operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The ring is full; the rejected timestamp is handed back
    #[error("edge queue full, timestamp {0} not published")]
    Full(Timestamp),
}

// =============================================================================
// Queue
// =============================================================================

/// Owner of a freshly initialised shared region.
///
/// Call [`EdgeQueue::split`] to obtain the two handles. The handles are not
/// `Clone`, so there is exactly one producer and one consumer per region.
pub struct EdgeQueue<const N: usize = FIFO_SIZE> {
    region: Arc<SharedRegion<N>>,
}

impl<const N: usize> EdgeQueue<N> {
    /// Create a queue with zeroed indices
    pub fn new() -> Self {
        Self {
            region: Arc::new(SharedRegion::new()),
        }
    }

    /// Number of slots in the ring
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Borrow the underlying region (layout inspection, diagnostics)
    pub fn region(&self) -> &SharedRegion<N> {
        &self.region
    }

    /// Split into the producer and consumer handles
    pub fn split(self) -> (EdgeProducer<N>, EdgeConsumer<N>) {
        (
            EdgeProducer::new(Arc::clone(&self.region)),
            EdgeConsumer::new(self.region),
        )
    }
}

impl<const N: usize> Default for EdgeQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
