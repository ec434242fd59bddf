//! Track configuration, fixed at construction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};

/// Configuration for a `SpeechTrack`.
///
/// The derived frame geometry (`samples_per_frame`, `frame_byte_size`) is
/// computed on demand so a deserialized config can never disagree with itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct TrackConfig {
    /// PCM sample rate in Hz of both incoming chunks and outgoing frames.
    /// Default: 24000.
    pub sample_rate: u32,
    /// Channel count. Only mono (1) is supported.
    pub channels: u16,
    /// Bytes per sample. Only 16-bit (2) is supported.
    pub sample_width: u16,
    /// Duration of one output frame in microseconds. Default: 20000 (20 ms).
    pub frame_period_us: u32,
    /// When `false`, a new utterance queues behind the current one instead
    /// of preempting it.
    pub interruption_enabled: bool,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
            sample_width: 2,
            frame_period_us: 20_000,
            interruption_enabled: true,
        }
    }
}

impl TrackConfig {
    /// Samples carried by one frame (floored, per channel).
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate as u64 * self.frame_period_us as u64 / 1_000_000) as usize
    }

    /// Bytes needed to build one frame.
    pub fn frame_byte_size(&self) -> usize {
        self.samples_per_frame() * self.channels as usize * self.sample_width as usize
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_micros(self.frame_period_us as u64)
    }

    /// Reject geometries the pipeline cannot frame.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(CadenceError::InvalidConfig {
                key: "sampleRate",
                message: "must be positive".into(),
            });
        }
        if self.channels != 1 {
            return Err(CadenceError::InvalidConfig {
                key: "channels",
                message: format!("only mono is supported, got {}", self.channels),
            });
        }
        if self.sample_width != 2 {
            return Err(CadenceError::InvalidConfig {
                key: "sampleWidth",
                message: format!("only 16-bit samples are supported, got {} bytes", self.sample_width),
            });
        }
        if self.frame_period_us == 0 {
            return Err(CadenceError::InvalidConfig {
                key: "framePeriodUs",
                message: "must be positive".into(),
            });
        }
        if self.samples_per_frame() == 0 {
            return Err(CadenceError::InvalidConfig {
                key: "framePeriodUs",
                message: format!(
                    "{} us at {} Hz yields no samples per frame",
                    self.frame_period_us, self.sample_rate
                ),
            });
        }
        Ok(())
    }
}
