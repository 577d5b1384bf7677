//! Engine configuration (speaker.toml)
//!
//! Settings are fixed for the life of a session: they are read once, checked
//! by [`EngineConfig::validate`] inside `SpeakerEngine::init`, and never
//! changed while rendering. Every field has a default matching
//! [`crate::constants`], so an empty file is a valid configuration.
//!
//! ```toml
//! [timing]
//! clock_hz = 4770000
//! sample_rate = 16384
//! samples_per_frame = 256
//!
//! [render]
//! volume = 0.8
//!
//! [output]
//! latency_frames = 2
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{CHANNEL_PCSPEAKER, PC_CLOCK_HZ, SAMPLE_RATE, SAMPLES_PER_FRAME};
use crate::error::ConfigError;

/// File name inside [`config_dir`]
pub const CONFIG_FILE: &str = "speaker.toml";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Clock ratio and buffer sizing
    #[serde(default)]
    pub timing: TimingConfig,
    /// Waveform reconstruction settings
    #[serde(default)]
    pub render: RenderConfig,
    /// Playback settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Clock ratio and buffer sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Reference clock rate in Hz (default: 4.77 MHz)
    #[serde(default = "default_clock_hz")]
    pub clock_hz: u32,
    /// Output sample rate in Hz (default: 16384)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Samples per playback buffer (default: 256)
    #[serde(default = "default_samples_per_frame")]
    pub samples_per_frame: usize,
}

/// Waveform reconstruction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Speaker amplitude (default: 0.8, range: 0.0-1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

/// Playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Hardware sound channel (default: 0)
    #[serde(default = "default_channel")]
    pub channel: u8,
    /// Frames buffered between the renderer and the device (default: 2)
    #[serde(default = "default_latency_frames")]
    pub latency_frames: usize,
}

fn default_clock_hz() -> u32 {
    PC_CLOCK_HZ
}
fn default_sample_rate() -> u32 {
    SAMPLE_RATE
}
fn default_samples_per_frame() -> usize {
    SAMPLES_PER_FRAME
}
fn default_volume() -> f32 {
    0.8
}
fn default_channel() -> u8 {
    CHANNEL_PCSPEAKER
}
fn default_latency_frames() -> usize {
    2
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            clock_hz: default_clock_hz(),
            sample_rate: default_sample_rate(),
            samples_per_frame: default_samples_per_frame(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            latency_frames: default_latency_frames(),
        }
    }
}

impl TimingConfig {
    /// Whole reference-clock cycles per output sample
    pub fn clocks_per_sample(&self) -> u32 {
        self.clock_hz / self.sample_rate
    }

    /// Cycles left over per second after `clocks_per_sample * sample_rate`
    pub fn clock_remainder(&self) -> u32 {
        self.clock_hz % self.sample_rate
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timing = &self.timing;
        if timing.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if timing.clock_hz < timing.sample_rate {
            return Err(ConfigError::ClockTooSlow {
                clock_hz: timing.clock_hz,
                sample_rate: timing.sample_rate,
            });
        }
        // Window offsets are compared as i32, and the remainder accumulator
        // holds up to twice the sample rate
        if timing.sample_rate > i32::MAX as u32 {
            return Err(ConfigError::SampleRateTooHigh(timing.sample_rate));
        }
        if timing.clocks_per_sample() >= i32::MAX as u32 {
            return Err(ConfigError::WindowTooLong(timing.clocks_per_sample()));
        }
        if timing.samples_per_frame == 0 {
            return Err(ConfigError::ZeroFrameLength);
        }
        if !(0.0..=1.0).contains(&self.render.volume) {
            return Err(ConfigError::InvalidVolume(self.render.volume));
        }
        if self.output.latency_frames == 0 {
            return Err(ConfigError::ZeroLatency);
        }
        Ok(())
    }
}

/// Returns the platform-specific configuration directory.
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.nethercore", "", "Nethercore")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from the platform directory.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> EngineConfig {
    config_dir()
        .and_then(|dir| std::fs::read_to_string(dir.join(CONFIG_FILE)).ok())
        .and_then(|content| toml::from_str(&content).ok())
        .unwrap_or_default()
}

/// Loads the configuration from an explicit path.
///
/// # Errors
///
/// Unlike [`load`], a missing or malformed file is an error.
pub fn load_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.timing.clock_hz, 4_770_000);
        assert_eq!(config.timing.sample_rate, 16_384);
        assert_eq!(config.timing.samples_per_frame, 256);
        assert_eq!(config.timing.clocks_per_sample(), 291);
        assert!((config.render.volume - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.output.latency_frames, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_deserialize_partial_render() {
        let toml_str = r#"
[render]
volume = 0.25
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert!((config.render.volume - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn test_clock_remainder() {
        let timing = TimingConfig::default();
        // 4_770_000 = 291 * 16_384 + 2_256
        assert_eq!(timing.clock_remainder(), 2_256);

        let exact = TimingConfig {
            clock_hz: 300 * 1000,
            sample_rate: 1000,
            samples_per_frame: 16,
        };
        assert_eq!(exact.clocks_per_sample(), 300);
        assert_eq!(exact.clock_remainder(), 0);
    }

    #[test]
    fn test_validate_rejects_bad_timing() {
        let mut config = EngineConfig::default();
        config.timing.sample_rate = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroSampleRate)));

        let mut config = EngineConfig::default();
        config.timing.clock_hz = 8_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ClockTooSlow { clock_hz: 8_000, .. })
        ));

        let mut config = EngineConfig::default();
        config.timing.samples_per_frame = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroFrameLength)));
    }

    #[test]
    fn test_validate_rejects_unrenderable_ratio() {
        let mut config = EngineConfig::default();
        config.timing.clock_hz = 4_000_000_000;
        config.timing.sample_rate = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WindowTooLong(4_000_000_000))
        ));

        let mut config = EngineConfig::default();
        config.timing.clock_hz = u32::MAX;
        config.timing.sample_rate = 1 << 31;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SampleRateTooHigh(_))
        ));

        // Longest window that still fits
        let mut config = EngineConfig::default();
        config.timing.clock_hz = i32::MAX as u32 - 1;
        config.timing.sample_rate = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_output() {
        let mut config = EngineConfig::default();
        config.render.volume = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidVolume(_))));

        let mut config = EngineConfig::default();
        config.output.latency_frames = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroLatency)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timing]\nsample_rate = 22050\n").unwrap();

        let config = load_from(file.path()).unwrap();
        assert_eq!(config.timing.sample_rate, 22_050);
        assert_eq!(config.timing.clock_hz, PC_CLOCK_HZ);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_from(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_from_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[render]\nvolume = \"loud\"").unwrap();
        assert!(matches!(load_from(file.path()), Err(ConfigError::Parse(_))));
    }
}
