//! Streaming output: double buffering and platform sinks
//!
//! The renderer writes samples into one of two fixed-length buffers while the
//! sink plays the other. Each buffer cycles through [`BufferState`]:
//!
//! ```text
//! Free ──► Filling ──(frame complete)──► Ready ──(sink idle)──► Playing
//!  ▲                                                               │
//!  └──────────────────────(sink no longer busy)────────────────────┘
//! ```
//!
//! Sinks:
//! - [`CpalSink`]: real playback through a cpal output stream
//! - [`WavSink`]: offline rendering to an 8-bit WAV file
//! - [`MemorySink`]: records frames in memory, completion driven by the caller

mod cpal_sink;
mod driver;
mod memory_sink;
mod wav_sink;


pub use cpal_sink::{CpalSink, CpalStream, open_cpal};
pub use driver::{OutputStats, StreamingOutput};
pub use memory_sink::MemorySink;
pub use wav_sink::WavSink;

use crate::error::OutputError;

/// Lifecycle of one playback buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    /// Not in use
    #[default]
    Free,
    /// Being written by the renderer
    Filling,
    /// Complete, waiting for the sink
    Ready,
    /// Handed to the sink
    Playing,
}

/// Platform playback mechanism.
///
/// A sink plays one frame at a time. After [`AudioSink::start`] it reports
/// busy until the frame has been consumed; the driver polls
/// [`AudioSink::is_busy`] in place of a buffer-exhausted interrupt.
pub trait AudioSink: Send {
    /// Begin playing a completed frame of unsigned 8-bit samples
    fn start(&mut self, frame: &[u8]) -> Result<(), OutputError>;

    /// True while the last started frame is still playing
    fn is_busy(&self) -> bool;

    /// Times the device ran dry and played filler
    fn underruns(&self) -> u64 {
        0
    }

    /// Flush and close (end of session)
    fn finish(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn start(&mut self, frame: &[u8]) -> Result<(), OutputError> {
        (**self).start(frame)
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn underruns(&self) -> u64 {
        (**self).underruns()
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        (**self).finish()
    }
}
