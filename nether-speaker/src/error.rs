//! Error types

use std::path::PathBuf;

/// Rejected configuration, reported by `EngineConfig::validate` at init
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("reference clock {clock_hz} Hz is slower than the sample rate {sample_rate} Hz")]
    ClockTooSlow { clock_hz: u32, sample_rate: u32 },

    #[error("sample rate {0} Hz is too high")]
    SampleRateTooHigh(u32),

    #[error("sample window of {0} cycles is too long")]
    WindowTooLong(u32),

    #[error("samples per frame must be non-zero")]
    ZeroFrameLength,

    #[error("volume {0} out of range (must be 0.0-1.0)")]
    InvalidVolume(f32),

    #[error("latency must be at least one frame")]
    ZeroLatency,

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures of the platform audio sink
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("failed to get default output config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to play audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("WAV output failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("audio sink already finished")]
    Closed,
}

/// Anything that can stop the engine from starting or running
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("failed to spawn render thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("render thread panicked")]
    RenderPanicked,
}
