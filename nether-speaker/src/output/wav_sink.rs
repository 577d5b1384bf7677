//! WAV file sink for offline rendering

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::{debug, warn};

use super::AudioSink;
use crate::error::OutputError;

/// Writes frames as unsigned 8-bit mono PCM.
///
/// The file is a device that plays instantly, so it is never busy.
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    samples_written: u64,
}

impl WavSink {
    /// Create (or truncate) `path` for `sample_rate` Hz output
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, OutputError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 8,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path.as_ref(), spec)?;
        debug!("Writing {} Hz WAV to {}", sample_rate, path.as_ref().display());

        Ok(Self {
            writer: Some(writer),
            samples_written: 0,
        })
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }
}

impl AudioSink for WavSink {
    fn start(&mut self, frame: &[u8]) -> Result<(), OutputError> {
        let writer = self.writer.as_mut().ok_or(OutputError::Closed)?;
        for &sample in frame {
            // hound stores 8-bit WAV unsigned and takes signed input
            writer.write_sample((sample as i16 - 128) as i8)?;
        }
        self.samples_written += frame.len() as u64;
        Ok(())
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            debug!("WAV finalized ({} samples)", self.samples_written);
        }
        Ok(())
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("Failed to finalize WAV output: {}", e);
        }
    }
}
