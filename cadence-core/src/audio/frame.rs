//! Typed audio frame handed to the transport.

use std::time::Duration;

/// Rational time base for `pts` (seconds per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    pub num: u32,
    pub den: u32,
}

impl TimeBase {
    /// One tick per sample.
    pub fn per_sample(sample_rate: u32) -> Self {
        Self {
            num: 1,
            den: sample_rate,
        }
    }

    /// Convert a tick count into wall-clock duration.
    pub fn to_duration(self, ticks: u64) -> Duration {
        if self.den == 0 {
            return Duration::ZERO;
        }
        let nanos = ticks as u128 * self.num as u128 * 1_000_000_000 / self.den as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }
}

/// One fixed-duration unit of mono 16-bit PCM.
///
/// `pts` is zero until the pacer stamps the frame on emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Presentation timestamp in `time_base` ticks (elapsed samples).
    pub pts: u64,
    pub time_base: TimeBase,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            pts: 0,
            time_base: TimeBase::per_sample(sample_rate),
        }
    }

    /// Stamp the frame for emission.
    pub fn with_timestamp(mut self, pts: u64, time_base: TimeBase) -> Self {
        self.pts = pts;
        self.time_base = time_base;
        self
    }

    pub fn duration(&self) -> Duration {
        TimeBase::per_sample(self.sample_rate).to_duration(self.samples.len() as u64)
    }

    /// Presentation time of the first sample.
    pub fn presentation_time(&self) -> Duration {
        self.time_base.to_duration(self.pts)
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| *s == 0)
    }

    /// Serialise back to little-endian PCM bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.samples.len() * 2);
        for s in &self.samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }
}
