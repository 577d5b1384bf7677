//! Real-time playback through cpal
//!
//! Frames are pushed into a lock-free ring that the cpal callback drains.
//! The ring holds `latency_frames` frames; the sink reports busy while it
//! cannot take another whole frame, which is the playback-complete signal
//! the driver polls for.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, error};

use super::AudioSink;
use crate::constants::PCM_CENTER;
use crate::engine::RenderSignal;
use crate::error::OutputError;

/// Owns the cpal stream.
///
/// `cpal::Stream` is not `Send` on every platform, so this half stays on the
/// thread that opened it while [`CpalSink`] moves to the render thread.
pub struct CpalStream {
    _stream: cpal::Stream,
    device_rate: u32,
}

impl CpalStream {
    /// Sample rate the device actually runs at
    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }
}

/// Producer side of the playback ring
pub struct CpalSink {
    producer: HeapProd<u8>,
    frame_len: usize,
    underruns: Arc<AtomicU64>,
}

/// Open the default output device and start a stream fed at `sample_rate`.
///
/// The device keeps its own rate; the callback resamples with a zero-order
/// hold. Until the first frame arrives the device plays `rest_level`, which
/// should match the engine's primed frame. `signal` is notified whenever the
/// callback frees ring space.
pub fn open_cpal(
    sample_rate: u32,
    frame_len: usize,
    latency_frames: usize,
    rest_level: u8,
    signal: Option<RenderSignal>,
) -> Result<(CpalStream, CpalSink), OutputError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(OutputError::NoDevice)?;
    let config = device.default_output_config()?;
    let device_rate = config.sample_rate().0;
    let sample_format = config.sample_format();

    let ring = HeapRb::<u8>::new(frame_len * latency_frames.max(1));
    let (producer, consumer) = ring.split();

    let feed = Feed::new(consumer, sample_rate, device_rate, rest_level, signal);
    let underruns = feed.underruns.clone();

    let stream_config: cpal::StreamConfig = config.into();
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, feed)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, feed)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, feed)?,
        cpal::SampleFormat::U8 => build_stream::<u8>(&device, &stream_config, feed)?,
        other => return Err(OutputError::UnsupportedFormat(other)),
    };
    stream.play()?;

    debug!(
        "Speaker stream started: {}Hz source, {}Hz device, {:?}, {} ch",
        sample_rate, device_rate, sample_format, stream_config.channels
    );

    Ok((
        CpalStream {
            _stream: stream,
            device_rate,
        },
        CpalSink {
            producer,
            frame_len,
            underruns,
        },
    ))
}

/// Callback-side state
struct Feed {
    consumer: HeapCons<u8>,
    source_rate: u32,
    device_rate: u32,
    /// Accumulates source samples owed per device frame
    phase: u32,
    /// Last level popped, held across gaps
    level: u8,
    underruns: Arc<AtomicU64>,
    signal: Option<RenderSignal>,
}

impl Feed {
    fn new(
        consumer: HeapCons<u8>,
        source_rate: u32,
        device_rate: u32,
        rest_level: u8,
        signal: Option<RenderSignal>,
    ) -> Self {
        Self {
            consumer,
            source_rate,
            device_rate,
            phase: 0,
            level: rest_level,
            underruns: Arc::new(AtomicU64::new(0)),
            signal,
        }
    }

    /// Level for the next device frame
    #[inline]
    fn next_level(&mut self, starved: &mut bool) -> u8 {
        self.phase += self.source_rate;
        while self.phase >= self.device_rate {
            self.phase -= self.device_rate;
            match self.consumer.try_pop() {
                Some(v) => self.level = v,
                None => *starved = true,
            }
        }
        self.level
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut feed: Feed,
) -> Result<cpal::Stream, OutputError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut starved = false;
            for frame in data.chunks_mut(channels) {
                let level = feed.next_level(&mut starved);
                let value = (level as f32 - PCM_CENTER as f32) / PCM_CENTER as f32;
                frame.fill(T::from_sample(value));
            }
            if starved {
                feed.underruns.fetch_add(1, Ordering::Relaxed);
            }
            if let Some(signal) = &feed.signal {
                signal.notify();
            }
        },
        |err| error!("Speaker stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

impl AudioSink for CpalSink {
    fn start(&mut self, frame: &[u8]) -> Result<(), OutputError> {
        let pushed = self.producer.push_slice(frame);
        if pushed < frame.len() {
            debug!("Playback ring short by {} samples", frame.len() - pushed);
        }
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.producer.vacant_len() < self.frame_len
    }

    fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}
