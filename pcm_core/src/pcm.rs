use base64::{engine::general_purpose, Engine as _};

use crate::{AudioBuffer, PcmError, BYTES_PER_SAMPLE};

/// Decode standard-alphabet base64 into raw bytes.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, PcmError> {
    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| PcmError::InvalidEncoding(e.to_string()))
}

/// Map one 16-bit sample into `[-1.0, 1.0)`.
///
/// Division by 32768 keeps the mapping asymmetric: `i16::MIN` is exactly
/// `-1.0` and `i16::MAX` is `32767 / 32768`.
#[inline]
pub fn sample_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Deinterleave 16-bit little-endian PCM into a channel-major buffer.
///
/// Trailing bytes that do not make up a whole frame are dropped.
pub fn decode_pcm16(
    bytes: &[u8],
    sample_rate: u32,
    num_channels: usize,
) -> Result<AudioBuffer, PcmError> {
    if num_channels == 0 {
        return Err(PcmError::InvalidLayout("channel count must be at least 1".into()));
    }
    if sample_rate == 0 {
        return Err(PcmError::InvalidLayout("sample rate must be positive".into()));
    }

    let sample_count = bytes.len() / BYTES_PER_SAMPLE;
    let frame_count = sample_count / num_channels;
    if bytes.len() % (BYTES_PER_SAMPLE * num_channels) != 0 {
        tracing::debug!(
            bytes = bytes.len(),
            channels = num_channels,
            "dropping trailing bytes that do not form a full frame"
        );
    }

    let mut buffer = AudioBuffer::new(num_channels, frame_count, sample_rate);
    for channel in 0..num_channels {
        let data = buffer.channel_data_mut(channel);
        for (i, out) in data.iter_mut().enumerate() {
            let offset = (i * num_channels + channel) * BYTES_PER_SAMPLE;
            let sample = i16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
            *out = sample_to_f32(sample);
        }
    }

    Ok(buffer)
}
