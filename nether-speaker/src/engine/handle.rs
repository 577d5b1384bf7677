//! Render thread handle
//!
//! Owns the thread's lifecycle. Dropping the handle stops and joins it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use nether_edgeq::{EdgeProducer, QueueError, Timestamp};

use super::SpeakerEngine;
use super::thread::RenderSignal;
use crate::error::{EngineError, OutputError};

/// Handle to the render thread
///
/// Returned from [`super::RenderThread::spawn`].
pub struct RenderHandle<S> {
    pub(super) stop: Arc<AtomicBool>,
    pub(super) signal: RenderSignal,
    /// Option to allow joining from both `stop` and `Drop`
    pub(super) handle: Option<JoinHandle<Result<SpeakerEngine<S>, OutputError>>>,
}

impl<S> RenderHandle<S> {
    /// Check if the render thread is still running
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Publish `timestamp`, waiting while the queue is full.
    ///
    /// Returns false without publishing once the render thread has exited,
    /// since nothing will drain the queue any more. Call [`Self::stop`] to
    /// find out why it exited.
    pub fn publish(&self, producer: &mut EdgeProducer, timestamp: Timestamp) -> bool {
        loop {
            match producer.try_publish(timestamp) {
                Ok(()) => return true,
                Err(QueueError::Full(_)) => {
                    if !self.is_alive() {
                        return false;
                    }
                    thread::yield_now();
                }
            }
        }
    }

    /// Stop the thread and take the engine back.
    ///
    /// # Errors
    ///
    /// The output error that ended the thread, or
    /// [`EngineError::RenderPanicked`].
    pub fn stop(mut self) -> Result<SpeakerEngine<S>, EngineError> {
        self.request_stop();
        let handle = self.handle.take().ok_or(EngineError::RenderPanicked)?;
        let engine = handle.join().map_err(|_| EngineError::RenderPanicked)??;
        Ok(engine)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.signal.notify();
    }
}

impl<S> Drop for RenderHandle<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.request_stop();
            let _ = handle.join();
        }
    }
}
