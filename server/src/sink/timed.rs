use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use pcm_core::AudioBuffer;
use tokio::sync::oneshot;
use tracing::debug;

use super::{AudioSink, EndedCallback, Playback, PreparedClip};

/// Headless sink: "plays" a clip by waiting out its duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimedSink;

struct TimedClip {
    duration: Duration,
}

struct TimedPlayback {
    cancel: Option<oneshot::Sender<()>>,
}

impl Playback for TimedPlayback {
    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

#[async_trait]
impl AudioSink for TimedSink {
    async fn prepare(&self, buffer: AudioBuffer) -> anyhow::Result<Box<dyn PreparedClip>> {
        Ok(Box::new(TimedClip {
            duration: buffer.duration(),
        }))
    }
}

impl PreparedClip for TimedClip {
    fn start(self: Box<Self>, on_ended: EndedCallback) -> anyhow::Result<Box<dyn Playback>> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("timed playback needs a tokio runtime")?;
        let duration = self.duration;
        let (cancel, cancelled) = oneshot::channel::<()>();

        runtime.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    debug!(duration_ms = duration.as_millis() as u64, "timed playback finished");
                    on_ended();
                }
                // a send or a dropped handle both mean stop
                _ = cancelled => {
                    debug!("timed playback stopped");
                }
            }
        });

        Ok(Box::new(TimedPlayback {
            cancel: Some(cancel),
        }))
    }
}
