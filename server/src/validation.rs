use serde::Serialize;
use speech_client::{SpeechError, Voice, VoiceStyle};

use crate::error::ApiError;

/// Maximum text length for speak requests, in characters
const MAX_TEXT_LENGTH: usize = 5000;
/// Maximum length of a pasted API key
const MAX_KEY_LENGTH: usize = 512;

/// Validate the text of a speak request
pub fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(SpeechError::EmptyText.into());
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_TEXT_LENGTH
        )));
    }
    Ok(())
}

/// Resolve an optional voice name; absent means the default voice.
pub fn parse_voice(name: Option<&str>) -> Result<Voice, ApiError> {
    match name {
        None => Ok(Voice::default()),
        Some(name) => Ok(name.parse::<Voice>()?),
    }
}

/// Fill unset style fields with defaults and range-check the result.
pub fn resolve_style(
    speaking_rate: Option<f32>,
    pitch: Option<f32>,
    volume_gain_db: Option<f32>,
) -> Result<VoiceStyle, ApiError> {
    let defaults = VoiceStyle::default();
    let style = VoiceStyle {
        speaking_rate: speaking_rate.unwrap_or(defaults.speaking_rate),
        pitch: pitch.unwrap_or(defaults.pitch),
        volume_gain_db: volume_gain_db.unwrap_or(defaults.volume_gain_db),
    };
    style.check()?;
    Ok(style)
}

/// Reject keys that cannot be real before they reach the session.
pub fn validate_api_key(key: &str) -> Result<(), ApiError> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(ApiError::InvalidInput("API key is too long".to_string()));
    }
    if key.trim().chars().any(char::is_whitespace) {
        return Err(ApiError::InvalidInput(
            "API key must not contain whitespace".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextStats {
    pub words: usize,
    pub chars: usize,
}

/// Word and character counts shown under the text box.
pub fn text_stats(text: &str) -> TextStats {
    TextStats {
        words: text.split_whitespace().count(),
        chars: text.chars().count(),
    }
}
