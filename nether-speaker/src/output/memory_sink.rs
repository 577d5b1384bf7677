//! In-memory sink for tests and headless runs

use super::AudioSink;
use crate::error::OutputError;

/// Records every started frame.
///
/// Completion is manual: while [`MemorySink::set_busy`] is true the sink
/// behaves like a device still playing its last frame.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<Vec<u8>>,
    busy: bool,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames in the order they were started
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// All recorded samples back to back
    pub fn samples(&self) -> Vec<u8> {
        self.frames.concat()
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl AudioSink for MemorySink {
    fn start(&mut self, frame: &[u8]) -> Result<(), OutputError> {
        if self.finished {
            return Err(OutputError::Closed);
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.busy
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.finished = true;
        Ok(())
    }
}
