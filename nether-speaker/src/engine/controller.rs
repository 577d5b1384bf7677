//! Speaker engine context

use nether_edgeq::{EdgeConsumer, EdgeProducer, EdgeQueue, Timestamp};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, OutputError};
use crate::output::{AudioSink, OutputStats, StreamingOutput};
use crate::render::{RenderStats, Renderer};

/// Snapshot of every engine counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub render: RenderStats,
    pub output: OutputStats,
    /// Device underruns reported by the sink
    pub underruns: u64,
    /// Edges waiting in the queue
    pub queued: usize,
}

/// Consumer-side engine context.
///
/// Created by [`SpeakerEngine::init`], which also hands back the producer end
/// of the edge queue. There is no global state: everything the render task
/// touches lives here.
pub struct SpeakerEngine<S = Box<dyn AudioSink>> {
    config: EngineConfig,
    consumer: EdgeConsumer,
    renderer: Renderer,
    output: StreamingOutput<S>,
}

impl<S: AudioSink> SpeakerEngine<S> {
    /// Bring the speaker online.
    ///
    /// Validates `config`, creates an empty edge queue and starts `sink`
    /// playing a frame of rest level before the first edge arrives.
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] for invalid settings, [`EngineError::Output`]
    /// if the sink refuses the first frame.
    pub fn init(config: EngineConfig, sink: S) -> Result<(EdgeProducer, Self), EngineError> {
        config.validate()?;

        let (producer, consumer) = EdgeQueue::new().split();
        let renderer = Renderer::new(&config.timing, &config.render);
        let output = StreamingOutput::new(sink, config.timing.samples_per_frame);

        let mut engine = Self {
            config,
            consumer,
            renderer,
            output,
        };
        engine.init_streaming()?;

        Ok((producer, engine))
    }

    fn init_streaming(&mut self) -> Result<(), OutputError> {
        let timing = &self.config.timing;
        info!(
            "Speaker on channel {}: {} Hz clock, {} Hz output, {} samples/frame",
            self.config.output.channel,
            timing.clock_hz,
            timing.sample_rate,
            timing.samples_per_frame
        );
        debug!(
            "Window {} cycles + {}/{} remainder, levels {:?}",
            timing.clocks_per_sample(),
            timing.clock_remainder(),
            timing.sample_rate,
            self.renderer.levels()
        );
        self.output.prime(self.renderer.rest_code())
    }

    /// Render one output sample (one timer activation)
    #[inline]
    pub fn tick(&mut self) -> Result<u8, OutputError> {
        let sample = self.renderer.render_sample(&mut self.consumer);
        self.output.push_sample(sample)?;
        Ok(sample)
    }

    pub fn tick_n(&mut self, count: usize) -> Result<(), OutputError> {
        for _ in 0..count {
            self.tick()?;
        }
        Ok(())
    }

    /// Start the render clock at `time` instead of at the first edge
    pub fn align(&mut self, time: Timestamp) {
        self.renderer.align(time);
    }

    /// Check the sink for a finished frame without rendering
    pub fn poll_output(&mut self) -> Result<(), OutputError> {
        self.output.poll()
    }

    /// Edges published but not yet drained by the renderer
    pub fn pending_edges(&self) -> usize {
        self.consumer.len() + usize::from(self.renderer.has_pending())
    }

    /// True while queued or carried edges still have to be rendered
    pub fn has_work(&self) -> bool {
        !self.consumer.is_empty() || self.renderer.has_pending()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn output(&self) -> &StreamingOutput<S> {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut StreamingOutput<S> {
        &mut self.output
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            render: self.renderer.stats(),
            output: self.output.stats(),
            underruns: self.output.sink().underruns(),
            queued: self.consumer.len(),
        }
    }

    /// Flush the sink and hand it back
    pub fn finish(mut self) -> Result<S, OutputError> {
        self.output.finish()?;
        let stats = self.stats();
        debug!(
            "Speaker finished: {} samples, {} edges ({} late, {} resyncs), {} overruns",
            stats.render.samples,
            stats.render.edges,
            stats.render.late_edges,
            stats.render.resyncs,
            stats.output.overruns
        );
        Ok(self.output.into_sink())
    }
}
