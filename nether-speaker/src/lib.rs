//! Nether Speaker - PC speaker sound engine
//!
//! Turns timestamped speaker edges into 8-bit PCM. The speaker line is used as
//! a 1-bit DAC by the emulated software, so every toggle matters: edges are
//! carried losslessly through [`nether_edgeq`] and reconstructed with
//! sub-sample time weighting.
//!
//! # Architecture
//!
//! ```text
//! Emulator Thread              Render Thread                    Sink
//!     │                             │                             │
//! [Speaker toggle]                  │                             │
//!     │                             │                             │
//! [publish(cycles)]───(edgeq)────►[tick: render one sample]       │
//!     │                           [fill buffer A / B]             │
//!     │                           [frame complete]───(start)────►[play]
//!     │                             │◄──────────(not busy)────────│
//! ```
//!
//! - [`render`]: edge-to-PCM reconstruction
//! - [`output`]: double-buffered streaming to an [`output::AudioSink`]
//! - [`engine`]: lifecycle, periodic tick, render thread
//! - [`config`]: timing/render/output settings (TOML)
//!
//! # Usage
//!
//! ```
//! use nether_speaker::config::EngineConfig;
//! use nether_speaker::engine::SpeakerEngine;
//! use nether_speaker::output::MemorySink;
//!
//! let (mut producer, mut engine) =
//!     SpeakerEngine::init(EngineConfig::default(), MemorySink::new()).unwrap();
//!
//! producer.publish(1_000);
//! producer.publish(1_600);
//! engine.tick_n(512).unwrap();
//!
//! assert!(engine.output().sink().frames().len() >= 2);
//! ```

pub mod config;
pub mod constants;
pub mod edgelog;
pub mod engine;
pub mod error;
pub mod output;
pub mod render;
pub mod tone;

pub use error::{ConfigError, EngineError, OutputError};
