//! Real-time render thread
//!
//! Runs the periodic tick on its own thread. The thread keeps a sample clock
//! against the wall clock and renders exactly the samples that are due, so
//! the render position tracks real time regardless of how often it wakes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use super::SpeakerEngine;
use super::handle::RenderHandle;
use super::metrics::RenderMetrics;
use crate::error::{EngineError, OutputError};
use crate::output::AudioSink;

/// Longest the thread sleeps between checks
const WAIT_TIMEOUT: Duration = Duration::from_millis(1);

/// Wake-up signal from the audio callback to the render thread
#[derive(Debug, Clone, Default)]
pub struct RenderSignal(Arc<(Mutex<bool>, Condvar)>);

impl RenderSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake the render thread. Safe to call from the audio callback.
    pub fn notify(&self) {
        let (_lock, cvar) = &*self.0;
        cvar.notify_one();
    }

    /// Sleep until notified or `timeout` elapses
    pub fn wait_timeout(&self, timeout: Duration) {
        let (lock, cvar) = &*self.0;
        let guard = lock.lock().unwrap_or_else(|e| {
            warn!("Render signal mutex poisoned; continuing");
            e.into_inner()
        });
        let _ = cvar.wait_timeout(guard, timeout).unwrap_or_else(|e| {
            warn!("Render signal wait mutex poisoned; continuing");
            e.into_inner()
        });
    }
}

/// Render thread state
pub struct RenderThread<S> {
    engine: SpeakerEngine<S>,
    signal: RenderSignal,
    stop: Arc<AtomicBool>,
    metrics: RenderMetrics,
}

impl<S: AudioSink + 'static> RenderThread<S> {
    /// Move `engine` onto a new `speaker-render` thread.
    ///
    /// `signal` should be the one given to the sink so the thread wakes as
    /// soon as playback frees space.
    pub fn spawn(
        engine: SpeakerEngine<S>,
        signal: RenderSignal,
    ) -> Result<RenderHandle<S>, EngineError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread_signal = signal.clone();

        let handle = thread::Builder::new()
            .name("speaker-render".into())
            .spawn(move || {
                let metrics = RenderMetrics::new(engine.stats());
                let render = Self {
                    engine,
                    signal: thread_signal,
                    stop: thread_stop,
                    metrics,
                };
                render.run()
            })
            .map_err(EngineError::Spawn)?;

        Ok(RenderHandle {
            stop,
            signal,
            handle: Some(handle),
        })
    }

    /// Main loop: render due samples, poll the sink, sleep
    fn run(mut self) -> Result<SpeakerEngine<S>, OutputError> {
        let rate = self.engine.config().timing.sample_rate as u128;
        let started = Instant::now();
        let mut rendered: u64 = 0;

        debug!("Render thread started at {} Hz", rate);

        while !self.stop.load(Ordering::Acquire) {
            let due = (started.elapsed().as_nanos() * rate / 1_000_000_000) as u64;
            let behind = due.saturating_sub(rendered);

            // Catch up at most one second per wake-up
            let batch = behind.min(rate as u64);
            for _ in 0..batch {
                if let Err(e) = self.engine.tick() {
                    error!("Speaker output failed: {}", e);
                    return Err(e);
                }
            }
            rendered += batch;

            self.engine.poll_output()?;

            let stats = self.engine.stats();
            self.metrics.observe(stats.queued, behind);
            self.metrics.maybe_log(stats);

            self.signal.wait_timeout(WAIT_TIMEOUT);
        }

        debug!("Render thread finished after {} samples", rendered);
        Ok(self.engine)
    }
}
