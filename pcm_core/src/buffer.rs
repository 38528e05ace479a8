use std::time::Duration;

/// Normalized floating-point audio, stored channel-major.
///
/// Every channel holds exactly `frames` samples in `[-1.0, 1.0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    frames: usize,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Allocate a silent buffer with `num_channels` channels of `frames` samples.
    pub fn new(num_channels: usize, frames: usize, sample_rate: u32) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; num_channels],
            frames,
            sample_rate,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Samples of one channel. Panics if `channel` is out of range, like slice indexing.
    pub fn channel_data(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    pub fn channel_data_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel]
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration().as_millis() as u64
    }

    /// Re-interleave the channels (frame-major), as audio devices expect.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames * self.channels.len());
        for i in 0..self.frames {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }
}
