//! Render thread health monitoring

use std::time::{Duration, Instant};

use tracing::debug;

use super::EngineStats;
use crate::output::OutputStats;
use crate::render::RenderStats;

/// Interval between metric log lines
const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Per-interval view of the engine counters.
///
/// The engine only keeps cumulative totals; this remembers the totals at the
/// start of the interval and logs the difference.
#[derive(Debug, Clone)]
pub struct RenderMetrics {
    /// Totals when the current interval started
    baseline: EngineStats,
    /// Most edges seen waiting in the queue this interval
    queue_high_water: usize,
    /// Worst scheduling lag this interval, in samples
    max_lag_samples: u64,
    last_log_time: Instant,
}

impl RenderMetrics {
    pub fn new(baseline: EngineStats) -> Self {
        Self {
            baseline,
            queue_high_water: baseline.queued,
            max_lag_samples: 0,
            last_log_time: Instant::now(),
        }
    }

    /// Record the queue depth and how far the render clock fell behind
    pub fn observe(&mut self, queued: usize, lag_samples: u64) {
        self.queue_high_water = self.queue_high_water.max(queued);
        self.max_lag_samples = self.max_lag_samples.max(lag_samples);
    }

    pub fn queue_high_water(&self) -> usize {
        self.queue_high_water
    }

    /// Counter changes since the interval started
    pub fn delta(&self, now: &EngineStats) -> EngineStats {
        let base = &self.baseline;
        EngineStats {
            render: RenderStats {
                samples: now.render.samples - base.render.samples,
                edges: now.render.edges - base.render.edges,
                late_edges: now.render.late_edges - base.render.late_edges,
                resyncs: now.render.resyncs - base.render.resyncs,
            },
            output: OutputStats {
                frames_started: now.output.frames_started - base.output.frames_started,
                frames_played: now.output.frames_played - base.output.frames_played,
                overruns: now.output.overruns - base.output.overruns,
            },
            underruns: now.underruns - base.underruns,
            queued: now.queued,
        }
    }

    /// Log metrics if enough time has passed (every second)
    pub fn maybe_log(&mut self, now: EngineStats) {
        if self.last_log_time.elapsed() < LOG_INTERVAL {
            return;
        }

        let d = self.delta(&now);
        debug!(
            "SPEAKER METRICS [tid={:?}]: samples={}, frames={}, edges={}, late={}, \
             resyncs={}, overruns={}, underruns={}, queue={} (max {}), lag={}",
            std::thread::current().id(),
            d.render.samples,
            d.output.frames_started,
            d.render.edges,
            d.render.late_edges,
            d.render.resyncs,
            d.output.overruns,
            d.underruns,
            now.queued,
            self.queue_high_water,
            self.max_lag_samples
        );

        // Reset for next interval (show per-second rates)
        self.baseline = now;
        self.queue_high_water = now.queued;
        self.max_lag_samples = 0;
        self.last_log_time = Instant::now();
    }
}
