//! Client for the Gemini text-to-speech endpoint.
//!
//! A call takes text, a prebuilt voice and a [`VoiceStyle`] and returns
//! the base64 PCM payload produced by the service, `None` when the
//! service finished normally without audio, or a [`SpeechError`].
mod error;
mod gemini;
pub mod style;
mod voice;

use std::fmt;

use async_trait::async_trait;

pub use error::SpeechError;
pub use gemini::{ClientConfig, GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use style::{StyleRange, StyleRanges, VoiceStyle, STYLE_RANGES};
pub use voice::{Gender, Voice};

/// Completion reason the service reports for a normal end of generation.
pub const FINISH_REASON_STOP: &str = "STOP";

/// API key for the synthesis service. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key; surrounding whitespace is dropped.
    pub fn new(key: &str) -> Self {
        Self(key.trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// One speak action's worth of input.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    text: String,
    pub voice: Voice,
    pub style: VoiceStyle,
}

impl SynthesisRequest {
    /// Fails with [`SpeechError::EmptyText`] when `text` is blank.
    pub fn new(text: impl Into<String>, voice: Voice, style: VoiceStyle) -> Result<Self, SpeechError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        Ok(Self { text, voice, style })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Base64 text wrapping raw 16-bit little-endian PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    pub data: String,
    /// MIME type as reported by the service, e.g. `audio/L16;codec=pcm;rate=24000`.
    pub mime_type: Option<String>,
}

#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Perform exactly one synthesis attempt.
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        credential: &Credential,
    ) -> Result<Option<EncodedAudio>, SpeechError>;
}
