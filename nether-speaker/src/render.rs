//! Edge-to-PCM reconstruction
//!
//! Each output sample covers a window of reference-clock cycles. Edges inside
//! the window toggle the speaker level, and the sample value is the
//! time-weighted average of the levels held across the window:
//!
//! ```text
//! window:   |<--------------- 291 cycles --------------->|
//! level:    ____________________/‾‾‾‾‾‾‾‾‾‾‾‾‾‾\__________
//!                               ^edge          ^edge
//! sample  = low + (high - low) * cycles_high / window
//! ```
//!
//! Last-value sampling would alias and drop pulses shorter than a sample,
//! which the 1-bit DAC technique relies on.
//!
//! The window length follows the exact clock ratio: with
//! `clock_hz = q * sample_rate + r`, windows are `q` cycles with one extra
//! cycle on `r` out of every `sample_rate` samples.

use nether_edgeq::{EdgeConsumer, Timestamp};
use tracing::debug;

use crate::config::{RenderConfig, TimingConfig};
use crate::constants::PCM_CENTER;

/// Where the renderer pulls edges from
pub trait EdgeSource {
    /// Next edge timestamp, or `None` if nothing is queued right now
    fn next_edge(&mut self) -> Option<Timestamp>;
}

impl<const N: usize> EdgeSource for EdgeConsumer<N> {
    #[inline]
    fn next_edge(&mut self) -> Option<Timestamp> {
        self.try_consume()
    }
}

/// PCM codes for the two speaker levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeakerLevels {
    pub low: u8,
    pub high: u8,
}

impl SpeakerLevels {
    /// Levels centred on [`PCM_CENTER`] with `volume` of full swing
    pub fn from_volume(volume: f32) -> Self {
        let amplitude = (volume.clamp(0.0, 1.0) * 127.0).round() as u8;
        Self {
            low: PCM_CENTER - amplitude,
            high: PCM_CENTER + amplitude,
        }
    }

    /// Code for a level held for the whole sample
    #[inline]
    pub fn code(&self, high: bool) -> u8 {
        if high { self.high } else { self.low }
    }

    /// Code for a window spending `high_cycles` of `window` at the high level
    #[inline]
    pub fn mix(&self, high_cycles: u32, window: u32) -> u8 {
        let window = window as u64;
        let high_cycles = (high_cycles as u64).min(window);
        let weighted = self.low as u64 * (window - high_cycles) + self.high as u64 * high_cycles;
        ((weighted + window / 2) / window) as u8
    }
}

/// Cumulative renderer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Samples produced
    pub samples: u64,
    /// Edges applied
    pub edges: u64,
    /// Edges that arrived behind the render position and were clamped
    pub late_edges: u64,
    /// Times the clock jumped back to an edge more than a window behind
    pub resyncs: u64,
}

/// Render state: clock position, speaker level, carry-over edge.
pub struct Renderer {
    /// Whole cycles per sample
    clocks_per_sample: u32,
    /// Leftover cycles per `sample_rate` samples
    clock_remainder: u32,
    sample_rate: u32,
    /// Bresenham accumulator for the leftover cycles
    remainder_acc: u32,

    levels: SpeakerLevels,

    /// Cycle position already accounted for in rendered output
    current_time: Timestamp,
    /// Speaker logic level
    edge_state: bool,
    /// False until the first edge aligns `current_time`
    synced: bool,
    /// Edge drained from the source that belongs to a later window
    pending: Option<Timestamp>,

    stats: RenderStats,
}

impl Renderer {
    pub fn new(timing: &TimingConfig, render: &RenderConfig) -> Self {
        Self {
            clocks_per_sample: timing.clocks_per_sample(),
            clock_remainder: timing.clock_remainder(),
            sample_rate: timing.sample_rate,
            remainder_acc: 0,
            levels: SpeakerLevels::from_volume(render.volume),
            current_time: 0,
            edge_state: false,
            synced: false,
            pending: None,
            stats: RenderStats::default(),
        }
    }

    /// Start the clock at `time` without waiting for the first edge
    pub fn align(&mut self, time: Timestamp) {
        self.current_time = time;
        self.synced = true;
    }

    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    /// Current speaker level (false = low)
    pub fn edge_state(&self) -> bool {
        self.edge_state
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// True when an edge for a later window is being held back
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn levels(&self) -> SpeakerLevels {
        self.levels
    }

    /// PCM code of the current level held constant
    pub fn rest_code(&self) -> u8 {
        self.levels.code(self.edge_state)
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// End of the window the next [`Renderer::render_sample`] will cover
    pub fn next_window_end(&self) -> Timestamp {
        let extra = u32::from(self.remainder_acc + self.clock_remainder >= self.sample_rate);
        self.current_time.wrapping_add(self.clocks_per_sample + extra)
    }

    /// Length of the next sample window in cycles
    #[inline]
    fn next_window(&mut self) -> u32 {
        self.remainder_acc += self.clock_remainder;
        if self.remainder_acc >= self.sample_rate {
            self.remainder_acc -= self.sample_rate;
            self.clocks_per_sample + 1
        } else {
            self.clocks_per_sample
        }
    }

    /// Render one output sample, draining every edge that falls inside it.
    ///
    /// Never blocks: with nothing queued the current level is held, so the
    /// output clock keeps running while the producer is stalled.
    pub fn render_sample<S: EdgeSource + ?Sized>(&mut self, source: &mut S) -> u8 {
        let window = self.next_window();
        let mut position = 0u32;
        let mut high_cycles = 0u32;

        while let Some(timestamp) = self.pending.take().or_else(|| source.next_edge()) {
            if !self.synced {
                debug!("Speaker clock aligned to first edge at cycle {}", timestamp);
                self.align(timestamp);
            }

            // Wrap-aware distance from the window start
            let mut offset = timestamp.wrapping_sub(self.current_time) as i32;

            if offset >= window as i32 {
                self.pending = Some(timestamp);
                break;
            }

            if offset < -(window as i32) {
                // Producer is behind by more than jitter (stalled, then
                // resumed); follow its timeline so windows line up again
                self.stats.resyncs += 1;
                debug!(
                    "Speaker clock resynced: edge {} cycles behind",
                    offset.unsigned_abs()
                );
                self.current_time = timestamp.wrapping_sub(position);
                offset = position as i32;
            } else if offset < position as i32 {
                // Non-monotonic or late: apply at the current position
                self.stats.late_edges += 1;
                offset = position as i32;
            }

            let offset = offset as u32;
            if self.edge_state {
                high_cycles += offset - position;
            }
            position = offset;
            self.edge_state = !self.edge_state;
            self.stats.edges += 1;
        }

        if self.edge_state {
            high_cycles += window - position;
        }

        self.current_time = self.current_time.wrapping_add(window);
        self.stats.samples += 1;
        self.levels.mix(high_cycles, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    impl EdgeSource for VecDeque<Timestamp> {
        fn next_edge(&mut self) -> Option<Timestamp> {
            self.pop_front()
        }
    }

    /// 300 cycles per sample exactly
    fn exact_timing() -> TimingConfig {
        TimingConfig {
            clock_hz: 300 * 1000,
            sample_rate: 1000,
            samples_per_frame: 16,
        }
    }

    fn renderer() -> Renderer {
        Renderer::new(&exact_timing(), &RenderConfig::default())
    }

    fn render(renderer: &mut Renderer, edges: &mut VecDeque<Timestamp>, count: usize) -> Vec<u8> {
        (0..count).map(|_| renderer.render_sample(edges)).collect()
    }

    // =============================================================
    // Levels
    // =============================================================

    #[test]
    fn test_levels_from_volume() {
        let levels = SpeakerLevels::from_volume(1.0);
        assert_eq!(levels, SpeakerLevels { low: 1, high: 255 });

        let silent = SpeakerLevels::from_volume(0.0);
        assert_eq!(silent.low, 128);
        assert_eq!(silent.high, 128);

        let default = SpeakerLevels::from_volume(0.8);
        assert_eq!(default, SpeakerLevels { low: 26, high: 230 });
    }

    #[test]
    fn test_mix_endpoints_and_midpoint() {
        let levels = SpeakerLevels { low: 0, high: 200 };
        assert_eq!(levels.mix(0, 300), 0);
        assert_eq!(levels.mix(300, 300), 200);
        assert_eq!(levels.mix(150, 300), 100);
        assert_eq!(levels.mix(75, 300), 50);
    }

    // =============================================================
    // Reconstruction
    // =============================================================

    #[test]
    fn test_silence_before_first_edge() {
        let mut r = renderer();
        let mut edges = VecDeque::new();
        let low = r.levels().low;

        let samples = render(&mut r, &mut edges, 64);
        assert!(samples.iter().all(|&s| s == low));
        assert!(!r.is_synced());
    }

    #[test]
    fn test_first_edge_aligns_clock() {
        let mut r = renderer();
        let mut edges = VecDeque::from([50_000]);
        let high = r.levels().high;

        assert_eq!(r.render_sample(&mut edges), high);
        assert!(r.is_synced());
        assert_eq!(r.current_time(), 50_300);
    }

    #[test]
    fn test_edge_at_window_midpoint_is_time_weighted() {
        let mut r = renderer();
        let levels = r.levels();
        // up at 1000, down at 1300, up again at 1750 (offset 150 of window 3)
        let mut edges = VecDeque::from([1_000, 1_300, 1_750]);

        let samples = render(&mut r, &mut edges, 4);
        let midpoint = (levels.low as u16 + levels.high as u16).div_ceil(2) as u8;

        assert_eq!(samples[0], levels.high);
        assert_eq!(samples[1], levels.low);
        assert!(samples[2].abs_diff(midpoint) <= 1, "got {}", samples[2]);
        assert_eq!(samples[3], levels.high);
    }

    #[test]
    fn test_short_pulse_inside_one_sample() {
        let mut r = renderer();
        r.align(0);
        let levels = r.levels();
        // 30-cycle pulse (10% of the window) starting at offset 100
        let mut edges = VecDeque::from([100, 130]);

        let sample = r.render_sample(&mut edges);
        assert_eq!(sample, levels.mix(30, 300));
        assert!(sample > levels.low, "short pulse must not vanish");
        assert!(!r.edge_state());
    }

    #[test]
    fn test_many_edges_per_sample() {
        let mut r = renderer();
        r.align(0);
        let levels = r.levels();
        // 50% duty square wave with a 20-cycle period: 15 full periods
        let mut edges: VecDeque<u32> = (0..30).map(|i| i * 10).collect();

        let sample = r.render_sample(&mut edges);
        assert_eq!(sample, levels.mix(150, 300));
        assert_eq!(r.stats().edges, 30);
        assert!(edges.is_empty());
    }

    #[test]
    fn test_edge_beyond_window_is_carried() {
        let mut r = renderer();
        r.align(0);
        let mut edges = VecDeque::from([450]);

        let first = r.render_sample(&mut edges);
        assert_eq!(first, r.levels().low);
        assert!(r.has_pending());
        assert!(edges.is_empty());

        let second = r.render_sample(&mut edges);
        assert_eq!(second, r.levels().mix(150, 300));
        assert!(!r.has_pending());
    }

    #[test]
    fn test_starvation_holds_level() {
        let mut r = renderer();
        let mut edges = VecDeque::from([0]);
        let high = r.levels().high;

        let samples = render(&mut r, &mut edges, 5_000);
        assert!(samples.iter().all(|&s| s == high));
        assert_eq!(r.current_time(), 5_000 * 300);
    }

    #[test]
    fn test_late_edge_is_clamped() {
        let mut r = renderer();
        r.align(10_000);
        let levels = r.levels();
        // 100 cycles behind the window start
        let mut edges = VecDeque::from([9_900]);

        let sample = r.render_sample(&mut edges);
        assert_eq!(sample, levels.high);
        assert_eq!(r.stats().late_edges, 1);
        assert_eq!(r.stats().resyncs, 0);
    }

    #[test]
    fn test_far_behind_edge_resyncs_clock() {
        let mut r = renderer();
        r.align(0);
        let mut idle = VecDeque::new();
        // Renderer runs a full second ahead of the stalled producer
        render(&mut r, &mut idle, 1_000);
        assert_eq!(r.current_time(), 300_000);

        let mut edges = VecDeque::from([1_000, 1_150]);
        let sample = r.render_sample(&mut edges);

        assert_eq!(r.stats().resyncs, 1);
        assert_eq!(sample, r.levels().mix(150, 300));
        assert_eq!(r.current_time(), 1_300);
    }

    #[test]
    fn test_short_stall_then_real_time_keeps_pulses() {
        let mut r = renderer();
        r.align(0);
        let pulse = r.levels().mix(30, 300);
        let mut edges = VecDeque::new();

        // Producer stalls for 100 windows, well under a second
        render(&mut r, &mut edges, 100);

        // then resumes at real time from where it stopped
        for k in 0..2_000u32 {
            edges.extend([k * 300 + 100, k * 300 + 130]);
            assert_eq!(r.render_sample(&mut edges), pulse, "sample {}", k);
        }
        assert_eq!(r.stats().resyncs, 1);
        assert_eq!(r.stats().late_edges, 0);
    }

    #[test]
    fn test_sub_window_jitter_is_clamped_not_resynced() {
        let mut r = renderer();
        r.align(0);
        let mut idle = VecDeque::new();
        render(&mut r, &mut idle, 1);

        // 299 cycles behind the window start at 300
        let mut edges = VecDeque::from([1]);
        r.render_sample(&mut edges);
        assert_eq!(r.stats().late_edges, 1);
        assert_eq!(r.stats().resyncs, 0);
        assert_eq!(r.current_time(), 600);
    }

    #[test]
    fn test_timestamps_across_u32_wrap() {
        let mut r = renderer();
        let levels = r.levels();
        let start = u32::MAX - 299;
        // rise at the last window before wrap, fall 150 cycles after wrap
        let mut edges = VecDeque::from([start, 150]);

        let samples = render(&mut r, &mut edges, 2);
        assert_eq!(samples[0], levels.high);
        assert_eq!(samples[1], levels.mix(150, 300));
        assert_eq!(r.stats().late_edges, 0);
    }

    // =============================================================
    // Clock ratio
    // =============================================================

    #[test]
    fn test_fractional_clock_locks_to_reference() {
        let timing = TimingConfig::default();
        let mut r = Renderer::new(&timing, &RenderConfig::default());
        r.align(0);
        let mut edges = VecDeque::new();

        render(&mut r, &mut edges, timing.sample_rate as usize);
        assert_eq!(r.current_time(), timing.clock_hz);
    }

    #[test]
    fn test_next_window_end_matches_render() {
        let timing = TimingConfig::default();
        let mut r = Renderer::new(&timing, &RenderConfig::default());
        r.align(1_000);
        let mut edges = VecDeque::new();
        for _ in 0..2_000 {
            let end = r.next_window_end();
            r.render_sample(&mut edges);
            assert_eq!(r.current_time(), end);
        }
    }

    #[test]
    fn test_default_window_is_291_or_292() {
        let timing = TimingConfig::default();
        let mut r = Renderer::new(&timing, &RenderConfig::default());
        for _ in 0..1000 {
            let window = r.next_window();
            assert!(window == 291 || window == 292);
        }
    }
}
