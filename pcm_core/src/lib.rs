//! Raw PCM decoding for synthesized speech.
//!
//! The synthesis service returns audio as base64 text wrapping raw,
//! interleaved, 16-bit signed little-endian PCM. Nothing here parses a
//! container format: the layout is fixed by the service and passed in
//! explicitly (see [`GEMINI_LAYOUT`]).
mod buffer;
mod pcm;

use thiserror::Error;

pub use buffer::AudioBuffer;
pub use pcm::{decode_base64, decode_pcm16, sample_to_f32};

/// Sample rate of the Gemini TTS output (not negotiated).
pub const SAMPLE_RATE: u32 = 24_000;
/// Gemini TTS output is mono.
pub const CHANNELS: usize = 1;
/// Size of one sample in bytes.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Sample rate and channel count of a raw PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmLayout {
    pub sample_rate: u32,
    pub channels: usize,
}

pub const GEMINI_LAYOUT: PcmLayout = PcmLayout {
    sample_rate: SAMPLE_RATE,
    channels: CHANNELS,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PcmError {
    #[error("Audio payload is not valid base64: {0}")]
    InvalidEncoding(String),

    #[error("Invalid PCM layout: {0}")]
    InvalidLayout(String),
}

/// Decode a base64 payload straight into a buffer using `layout`.
pub fn decode_with_layout(payload: &str, layout: PcmLayout) -> Result<AudioBuffer, PcmError> {
    let bytes = decode_base64(payload)?;
    decode_pcm16(&bytes, layout.sample_rate, layout.channels)
}

/// Decode a payload as returned by the synthesis service (24 kHz mono).
pub fn decode_payload(payload: &str) -> Result<AudioBuffer, PcmError> {
    decode_with_layout(payload, GEMINI_LAYOUT)
}
