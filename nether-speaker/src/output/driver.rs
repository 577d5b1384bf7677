//! Double-buffered streaming driver

use tracing::{debug, trace};

use super::{AudioSink, BufferState};
use crate::error::OutputError;

/// Cumulative driver counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputStats {
    /// Frames handed to the sink
    pub frames_started: u64,
    /// Frames the sink finished playing
    pub frames_played: u64,
    /// Completed frames discarded because the other buffer was still queued
    pub overruns: u64,
}

/// Two playback buffers and the sink they feed.
///
/// Invariants: exactly one buffer is `Filling` and only that buffer is ever
/// written; at most one buffer is `Playing`.
pub struct StreamingOutput<S> {
    sink: S,
    buffers: [Box<[u8]>; 2],
    states: [BufferState; 2],
    /// Index of the `Filling` buffer
    filling: usize,
    /// Write position inside the `Filling` buffer
    position: usize,
    stats: OutputStats,
}

impl<S: AudioSink> StreamingOutput<S> {
    pub fn new(sink: S, frame_len: usize) -> Self {
        Self {
            sink,
            buffers: [
                vec![0; frame_len].into_boxed_slice(),
                vec![0; frame_len].into_boxed_slice(),
            ],
            states: [BufferState::Filling, BufferState::Free],
            filling: 0,
            position: 0,
            stats: OutputStats::default(),
        }
    }

    /// Start playback with a frame of constant `level` so the device runs
    /// before any real audio exists.
    pub fn prime(&mut self, level: u8) -> Result<(), OutputError> {
        let idle = 1 - self.filling;
        if self.states[idle] != BufferState::Free {
            return Ok(());
        }
        self.buffers[idle].fill(level);
        self.states[idle] = BufferState::Ready;
        self.poll()
    }

    /// Append one sample; hands the buffer over when it is full
    #[inline]
    pub fn push_sample(&mut self, sample: u8) -> Result<(), OutputError> {
        debug_assert_eq!(self.states[self.filling], BufferState::Filling);
        self.buffers[self.filling][self.position] = sample;
        self.position += 1;

        if self.position == self.buffers[self.filling].len() {
            self.complete_frame()?;
        }
        Ok(())
    }

    fn complete_frame(&mut self) -> Result<(), OutputError> {
        self.position = 0;
        self.poll()?;

        let other = 1 - self.filling;
        if self.states[other] != BufferState::Free {
            // Renderer is ahead of playback: refill this buffer in place
            self.stats.overruns += 1;
            trace!(
                "Playback buffer {} still {:?}, dropping frame",
                other, self.states[other]
            );
            return Ok(());
        }

        self.states[self.filling] = BufferState::Ready;
        self.states[other] = BufferState::Filling;
        self.filling = other;
        self.poll()
    }

    /// Retire a finished buffer and start the next ready one.
    ///
    /// Stands in for the playback-complete interrupt; call it regularly.
    pub fn poll(&mut self) -> Result<(), OutputError> {
        if !self.sink.is_busy() {
            for state in &mut self.states {
                if *state == BufferState::Playing {
                    *state = BufferState::Free;
                    self.stats.frames_played += 1;
                }
            }
        }

        if self.states.contains(&BufferState::Playing) {
            return Ok(());
        }

        if let Some(ready) = self.states.iter().position(|s| *s == BufferState::Ready) {
            self.sink.start(&self.buffers[ready])?;
            self.states[ready] = BufferState::Playing;
            self.stats.frames_started += 1;
        }
        Ok(())
    }

    /// Hand over any ready frame and close the sink
    pub fn finish(&mut self) -> Result<(), OutputError> {
        self.poll()?;
        if self.states.contains(&BufferState::Ready) {
            debug!("Output finished with a frame still waiting for the sink");
        }
        self.sink.finish()
    }

    pub fn state(&self, index: usize) -> BufferState {
        self.states[index]
    }

    /// Index of the buffer the renderer is writing
    pub fn filling_index(&self) -> usize {
        self.filling
    }

    /// Samples written into the current frame
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn frame_len(&self) -> usize {
        self.buffers[0].len()
    }

    pub fn stats(&self) -> OutputStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
