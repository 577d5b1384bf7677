//! Square wave edge generator
//!
//! Produces the edge stream a program would emit by toggling the speaker at a
//! fixed frequency. Used by the `tone` command and as a test signal.

use nether_edgeq::Timestamp;

/// Edges of a 50% duty square wave.
///
/// Edge `k` lands at `start + k * clock_hz / (2 * freq)` cycles, computed
/// exactly so long tones do not drift. Timestamps wrap modulo 2^32.
#[derive(Debug, Clone)]
pub struct SquareWave {
    start: Timestamp,
    clock_hz: u64,
    freq_hz: u64,
    index: u64,
    count: u64,
}

impl SquareWave {
    /// `seconds` of a `freq_hz` tone on a `clock_hz` reference clock
    pub fn new(clock_hz: u32, freq_hz: u32, seconds: f32) -> Self {
        let count = if freq_hz == 0 {
            0
        } else {
            (2.0 * freq_hz as f64 * seconds.max(0.0) as f64).round() as u64
        };
        Self {
            start: 0,
            clock_hz: clock_hz as u64,
            freq_hz: freq_hz as u64,
            index: 0,
            count,
        }
    }

    /// Offset every edge by `start` cycles
    pub fn starting_at(mut self, start: Timestamp) -> Self {
        self.start = start;
        self
    }

    /// Total number of edges
    pub fn edge_count(&self) -> u64 {
        self.count
    }
}

impl Iterator for SquareWave {
    type Item = Timestamp;

    fn next(&mut self) -> Option<Timestamp> {
        if self.index >= self.count {
            return None;
        }
        let offset = self.index * self.clock_hz / (2 * self.freq_hz);
        self.index += 1;
        Some(self.start.wrapping_add(offset as u32))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SquareWave {}
