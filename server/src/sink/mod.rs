//! Audio output.
//!
//! The controller only knows [`AudioSink`]. Output happens in two steps:
//! `prepare` does the slow work (device setup, resampling) off the
//! session lock and yields a silent [`PreparedClip`]; `start` makes it
//! audible and returns the one live [`Playback`] handle. Buffer creation
//! is [`pcm_core::AudioBuffer::new`]; the end-of-stream callback is
//! registered at `start` so the end of a short clip cannot be missed.

#[cfg(feature = "device-audio")]
mod device;
mod timed;

use std::sync::Arc;

use async_trait::async_trait;
use pcm_core::AudioBuffer;

use crate::config::SinkKind;

#[cfg(feature = "device-audio")]
pub use device::DeviceSink;
pub use timed::TimedSink;

/// Fired once when a clip plays to the end.
pub type EndedCallback = Box<dyn FnOnce() + Send + 'static>;

/// A clip that is currently sounding. Dropping the handle also stops it.
pub trait Playback: Send {
    /// Halt output immediately.
    fn stop(&mut self);
}

/// A clip ready to sound. Dropping it releases whatever it holds
/// without producing output.
pub trait PreparedClip: Send {
    /// Begin output. Must not block.
    ///
    /// Implementations must not call `on_ended` from inside `start` or
    /// [`Playback::stop`]. A callback racing a `stop` may still arrive;
    /// callers have to ignore callbacks for handles they already released.
    fn start(self: Box<Self>, on_ended: EndedCallback) -> anyhow::Result<Box<dyn Playback>>;
}

#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Get `buffer` ready for output without making a sound.
    async fn prepare(&self, buffer: AudioBuffer) -> anyhow::Result<Box<dyn PreparedClip>>;
}

/// Build the sink selected in the configuration.
pub fn build_sink(kind: SinkKind) -> anyhow::Result<Arc<dyn AudioSink>> {
    match kind {
        SinkKind::Timed => Ok(Arc::new(TimedSink)),
        #[cfg(feature = "device-audio")]
        SinkKind::Device => Ok(Arc::new(DeviceSink::new()?)),
        #[cfg(not(feature = "device-audio"))]
        SinkKind::Device => Err(anyhow::anyhow!(
            "AUDIO_SINK=device requires building with the `device-audio` feature"
        )),
    }
}
