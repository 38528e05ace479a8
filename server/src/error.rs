use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pcm_core::PcmError;
use serde::Serialize;
use speech_client::SpeechError;
use thiserror::Error;

/// Failures at the orchestration boundary. `Display` is what the user sees.
#[derive(Debug, Error)]
pub enum SpeakError {
    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error("The audio returned by the service could not be decoded.")]
    Decode(#[from] PcmError),

    #[error("Audio playback could not be started.")]
    Playback(#[source] anyhow::Error),

    #[error("Speech is already being generated. Please wait.")]
    Busy,
}

impl SpeakError {
    pub fn invalidates_credential(&self) -> bool {
        matches!(self, SpeakError::Speech(e) if e.invalidates_credential())
    }
}

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Speak(#[from] SpeakError),
}

impl From<SpeechError> for ApiError {
    fn from(e: SpeechError) -> Self {
        ApiError::Speak(SpeakError::Speech(e))
    }
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Speak(SpeakError::Speech(e)) => match e {
                SpeechError::MissingCredential | SpeechError::InvalidCredential => {
                    StatusCode::UNAUTHORIZED
                }
                SpeechError::EmptyText
                | SpeechError::UnknownVoice(_)
                | SpeechError::InvalidStyle(_) => StatusCode::BAD_REQUEST,
                SpeechError::GenerationHalted(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SpeechError::TransientFailure => StatusCode::BAD_GATEWAY,
            },
            ApiError::Speak(SpeakError::Decode(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Speak(SpeakError::Playback(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Speak(SpeakError::Busy) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(SpeechError::MissingCredential).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(SpeechError::GenerationHalted("SAFETY".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::from(SpeakError::Busy).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(SpeakError::Decode(PcmError::InvalidEncoding("x".into()))).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_messages_are_user_facing() {
        let err = ApiError::from(SpeechError::GenerationHalted("SAFETY".into()));
        assert_eq!(
            err.to_string(),
            "Speech generation stopped because: SAFETY. Please check your text."
        );

        let err = SpeakError::Playback(anyhow::anyhow!("ALSA lib pcm.c:8526 underrun"));
        assert!(!err.to_string().contains("ALSA"));
    }

    #[test]
    fn test_only_rejected_key_invalidates_credential() {
        assert!(SpeakError::Speech(SpeechError::InvalidCredential).invalidates_credential());
        assert!(!SpeakError::Speech(SpeechError::TransientFailure).invalidates_credential());
        assert!(!SpeakError::Busy.invalidates_credential());
    }
}
