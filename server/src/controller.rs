//! Single-flight speak/playback state machine.
//!
//! `Idle -> Loading -> Playing -> Idle`, and `Loading -> Idle` on error,
//! empty result or stop. All session state (credential, phase, the one
//! playback handle) lives in the controller, so independent controllers
//! never share anything.
//!
//! Every speak takes a fresh token. `stop` and newer speaks advance the
//! current token, and a request that resolves with a stale token is
//! dropped without touching the output.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

use serde::Serialize;
use speech_client::{Credential, SpeechClient, SpeechError, SynthesisRequest, Voice, VoiceStyle};
use tracing::{debug, info, warn};

use crate::error::SpeakError;
use crate::metrics::SessionMetrics;
use crate::sink::{AudioSink, EndedCallback, Playback, PreparedClip};

pub const NO_AUDIO_MESSAGE: &str = "The service returned no audio. Please try again.";
pub const CANCELLED_MESSAGE: &str = "The speech request was cancelled. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Loading,
    Playing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeakRequest {
    pub text: String,
    pub voice: Voice,
    pub style: VoiceStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SpeakOutcome {
    /// Audio is sounding now.
    Playing { duration_ms: u64, frames: usize },
    /// The service finished normally without audio.
    NoAudio,
    /// A stop or a newer speak overtook this request; its audio was discarded.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub phase: Phase,
    pub has_credential: bool,
    pub last_message: Option<String>,
}

struct ActivePlayback {
    token: u64,
    handle: Box<dyn Playback>,
}

struct Session {
    credential: Option<Credential>,
    phase: Phase,
    playback: Option<ActivePlayback>,
    current_token: u64,
    last_message: Option<String>,
}

impl Session {
    fn release_playback(&mut self) {
        if let Some(mut active) = self.playback.take() {
            debug!(token = active.token, "stopping playback");
            active.handle.stop();
        }
    }
}

pub struct PlaybackController {
    client: Arc<dyn SpeechClient>,
    sink: Arc<dyn AudioSink>,
    metrics: SessionMetrics,
    session: Arc<Mutex<Session>>,
}

impl PlaybackController {
    pub fn new(client: Arc<dyn SpeechClient>, sink: Arc<dyn AudioSink>) -> Self {
        Self::with_metrics(client, sink, SessionMetrics::new())
    }

    pub fn with_metrics(
        client: Arc<dyn SpeechClient>,
        sink: Arc<dyn AudioSink>,
        metrics: SessionMetrics,
    ) -> Self {
        Self {
            client,
            sink,
            metrics,
            session: Arc::new(Mutex::new(Session {
                credential: None,
                phase: Phase::Idle,
                playback: None,
                current_token: 0,
                last_message: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        lock_session(&self.session)
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// Store the API key for this session.
    pub fn set_credential(&self, key: &str) -> Result<(), SpeakError> {
        let credential = Credential::new(key);
        let mut session = self.lock();
        if credential.is_empty() {
            let err = SpeechError::MissingCredential;
            session.last_message = Some(err.to_string());
            return Err(err.into());
        }
        session.credential = Some(credential);
        session.last_message = None;
        info!("API key set for this session");
        Ok(())
    }

    /// Forget the key so it has to be entered again.
    pub fn clear_credential(&self) {
        let mut session = self.lock();
        session.credential = None;
        info!("API key cleared");
    }

    pub fn has_credential(&self) -> bool {
        self.lock().credential.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn status(&self) -> SessionStatus {
        let session = self.lock();
        SessionStatus {
            phase: session.phase,
            has_credential: session.credential.is_some(),
            last_message: session.last_message.clone(),
        }
    }

    /// Request speech for `request` and start playing it.
    ///
    /// Rejects with [`SpeakError::Busy`] while another request is loading.
    /// Any clip that is playing is stopped before the request goes out.
    pub async fn speak(&self, request: SpeakRequest) -> Result<SpeakOutcome, SpeakError> {
        let started = Instant::now();
        let synthesis = SynthesisRequest::new(request.text, request.voice, request.style)?;
        request.style.check()?;

        let (token, credential) = {
            let mut session = self.lock();
            let Some(credential) = session.credential.clone() else {
                let err = SpeechError::MissingCredential;
                session.last_message = Some(err.to_string());
                return Err(err.into());
            };
            if session.phase == Phase::Loading {
                return Err(SpeakError::Busy);
            }

            session.release_playback();
            session.current_token += 1;
            session.phase = Phase::Loading;
            session.last_message = None;
            (session.current_token, credential)
        };
        let loading = LoadingGuard {
            session: self.session.clone(),
            token,
            armed: true,
        };
        self.metrics.record_request();
        info!(token, voice = %synthesis.voice, "speak request started");

        let result = self.fetch_and_prepare(&synthesis, &credential).await;

        let mut session = self.lock();
        loading.disarm();
        if session.current_token != token {
            debug!(token, current = session.current_token, "discarding superseded speech result");
            self.metrics.record_superseded();
            return Ok(SpeakOutcome::Superseded);
        }

        let prepared = match result {
            Ok(Some(prepared)) => prepared,
            Ok(None) => {
                session.phase = Phase::Idle;
                session.last_message = Some(NO_AUDIO_MESSAGE.to_string());
                self.metrics.record_no_audio();
                return Ok(SpeakOutcome::NoAudio);
            }
            Err(err) => {
                session.phase = Phase::Idle;
                session.last_message = Some(err.to_string());
                if err.invalidates_credential() {
                    warn!("API key rejected by the service, clearing it");
                    session.credential = None;
                }
                self.metrics.record_error();
                return Err(err);
            }
        };

        let PreparedAudio {
            clip,
            duration_ms,
            frames,
        } = prepared;
        // `start` does not block, and holding the lock makes an early
        // end-of-stream callback wait until the handle is stored.
        match clip.start(self.ended_callback(token)) {
            Ok(handle) => {
                session.playback = Some(ActivePlayback { token, handle });
                session.phase = Phase::Playing;
                let latency_ms = started.elapsed().as_millis() as u64;
                self.metrics.record_playback(duration_ms, latency_ms);
                info!(token, duration_ms, latency_ms, "playback started");
                Ok(SpeakOutcome::Playing { duration_ms, frames })
            }
            Err(e) => {
                let err = SpeakError::Playback(e);
                warn!(error = ?err, "could not start playback");
                session.phase = Phase::Idle;
                session.last_message = Some(err.to_string());
                self.metrics.record_error();
                Err(err)
            }
        }
    }

    /// Stop playback, or abandon the request that is loading.
    ///
    /// Returns `false` when there was nothing to stop.
    pub fn stop(&self) -> bool {
        let mut session = self.lock();
        if session.phase == Phase::Idle {
            return false;
        }
        session.current_token += 1;
        session.release_playback();
        session.phase = Phase::Idle;
        info!("stopped");
        true
    }

    /// Fetch, decode and get the clip ready on the sink. Runs without the
    /// session lock; nothing here is audible yet.
    async fn fetch_and_prepare(
        &self,
        request: &SynthesisRequest,
        credential: &Credential,
    ) -> Result<Option<PreparedAudio>, SpeakError> {
        let Some(audio) = self.client.synthesize(request, credential).await? else {
            return Ok(None);
        };
        let buffer = pcm_core::decode_payload(&audio.data)?;
        debug!(frames = buffer.frames(), "decoded speech payload");

        let duration_ms = buffer.duration_ms();
        let frames = buffer.frames();
        let clip = self.sink.prepare(buffer).await.map_err(SpeakError::Playback)?;
        Ok(Some(PreparedAudio {
            clip,
            duration_ms,
            frames,
        }))
    }

    fn ended_callback(&self, token: u64) -> EndedCallback {
        let session: Weak<Mutex<Session>> = Arc::downgrade(&self.session);
        Box::new(move || {
            let Some(session) = session.upgrade() else {
                return;
            };
            let mut session = lock_session(&session);
            if session.playback.as_ref().map(|p| p.token) == Some(token) {
                session.playback = None;
                session.phase = Phase::Idle;
                info!(token, "playback finished");
            }
        })
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.lock().release_playback();
    }
}

struct PreparedAudio {
    clip: Box<dyn PreparedClip>,
    duration_ms: u64,
    frames: usize,
}

/// Returns the session to Idle if a speak future is dropped mid-request
/// (request timeout, client gone).
struct LoadingGuard {
    session: Arc<Mutex<Session>>,
    token: u64,
    armed: bool,
}

impl LoadingGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut session = lock_session(&self.session);
        if session.current_token == self.token && session.phase == Phase::Loading {
            warn!(token = self.token, "speak request abandoned while loading");
            session.phase = Phase::Idle;
            session.last_message = Some(CANCELLED_MESSAGE.to_string());
        }
    }
}

fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    // A panic while holding the lock leaves plain data behind; keep going.
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
