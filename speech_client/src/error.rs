use thiserror::Error;

/// Failures of a synthesis call.
///
/// `Display` is the message shown to the end user; raw transport
/// diagnostics are logged where they happen and never end up here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Please enter your Gemini API key.")]
    MissingCredential,

    #[error("The Gemini API key is not valid. Please check it and try again.")]
    InvalidCredential,

    #[error("Speech generation stopped because: {0}. Please check your text.")]
    GenerationHalted(String),

    #[error("Could not generate speech. Please try again later.")]
    TransientFailure,

    #[error("Please enter some text to speak.")]
    EmptyText,

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Invalid voice style: {0}")]
    InvalidStyle(String),
}

impl SpeechError {
    /// Errors that mean the held credential must be entered again.
    pub fn invalidates_credential(&self) -> bool {
        matches!(self, SpeechError::InvalidCredential)
    }
}
