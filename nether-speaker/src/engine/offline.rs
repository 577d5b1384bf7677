//! Offline rendering driver

use nether_edgeq::{EdgeProducer, QueueError, Timestamp};
use tracing::debug;

use super::SpeakerEngine;
use crate::error::OutputError;
use crate::output::AudioSink;

/// Render a complete edge stream as fast as possible.
///
/// Producer and renderer share the calling thread. A sample is rendered only
/// once an edge at or past the end of its window has been seen, so no edge
/// ever arrives late and the output is exactly what an unhurried real-time
/// run would produce. After the last edge, `tail_samples` of rest level are
/// added and the final frame is padded to a frame boundary.
///
/// Returns the number of samples rendered.
pub fn render_offline<S, I>(
    engine: &mut SpeakerEngine<S>,
    producer: &mut EdgeProducer,
    edges: I,
    tail_samples: usize,
) -> Result<u64, OutputError>
where
    S: AudioSink,
    I: IntoIterator<Item = Timestamp>,
{
    let mut rendered: u64 = 0;

    for timestamp in edges {
        if !engine.renderer().is_synced() {
            engine.align(timestamp);
        }

        // Windows ending at or before this edge are complete
        while timestamp.wrapping_sub(engine.renderer().next_window_end()) as i32 >= 0 {
            engine.tick()?;
            rendered += 1;
        }

        while let Err(QueueError::Full(_)) = producer.try_publish(timestamp) {
            engine.tick()?;
            rendered += 1;
        }
    }

    while engine.has_work() {
        engine.tick()?;
        rendered += 1;
    }

    let frame_len = engine.output().frame_len();
    let mut tail = tail_samples;
    let partial = (engine.output().position() + tail) % frame_len;
    if partial != 0 {
        tail += frame_len - partial;
    }
    engine.tick_n(tail)?;
    rendered += tail as u64;

    debug!("Offline render complete: {} samples", rendered);
    Ok(rendered)
}
