//! Prosody settings sent with each request.

use serde::{Deserialize, Serialize};

use crate::SpeechError;

/// Allowed values of one style parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StyleRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl StyleRange {
    pub fn contains(&self, value: f32) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

pub const SPEAKING_RATE: StyleRange = StyleRange { min: 0.5, max: 2.0, step: 0.05, default: 1.0 };
pub const PITCH: StyleRange = StyleRange { min: -10.0, max: 10.0, step: 0.5, default: 0.0 };
pub const VOLUME_GAIN_DB: StyleRange = StyleRange { min: -6.0, max: 6.0, step: 0.5, default: 0.0 };

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceStyle {
    pub speaking_rate: f32,
    pub pitch: f32,
    pub volume_gain_db: f32,
}

impl Default for VoiceStyle {
    fn default() -> Self {
        Self {
            speaking_rate: SPEAKING_RATE.default,
            pitch: PITCH.default,
            volume_gain_db: VOLUME_GAIN_DB.default,
        }
    }
}

impl VoiceStyle {
    /// Range check for callers. The client itself sends values unchanged.
    pub fn check(&self) -> Result<(), SpeechError> {
        let fields = [
            ("speaking_rate", self.speaking_rate, SPEAKING_RATE),
            ("pitch", self.pitch, PITCH),
            ("volume_gain_db", self.volume_gain_db, VOLUME_GAIN_DB),
        ];
        for (name, value, range) in fields {
            if !range.contains(value) {
                return Err(SpeechError::InvalidStyle(format!(
                    "{name} must be between {} and {} (got {value})",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }
}

/// All ranges, for a settings form.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StyleRanges {
    pub speaking_rate: StyleRange,
    pub pitch: StyleRange,
    pub volume_gain_db: StyleRange,
}

pub const STYLE_RANGES: StyleRanges = StyleRanges {
    speaking_rate: SPEAKING_RATE,
    pitch: PITCH,
    volume_gain_db: VOLUME_GAIN_DB,
};
