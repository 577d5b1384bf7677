//! Engine lifecycle and the periodic render task
//!
//! [`SpeakerEngine`] owns everything on the consumer side of the edge queue:
//! the renderer, the double-buffered output and the sink. One call to
//! [`SpeakerEngine::tick`] is one activation of the sample timer.
//!
//! Two drivers are provided:
//! - [`RenderThread`]: real time, paced by the wall clock on a dedicated thread
//! - [`render_offline`]: as fast as possible, for rendering to a file

mod controller;
mod handle;
mod metrics;
mod offline;
mod thread;


pub use controller::{EngineStats, SpeakerEngine};
pub use handle::RenderHandle;
pub use metrics::RenderMetrics;
pub use offline::render_offline;
pub use thread::{RenderSignal, RenderThread};
