//! Sample-rate conversion for sources recorded at a rate other than the
//! track's, using a rubato `FastFixedIn` resampler.
//!
//! When source rate == track rate, `RateConverter` is a passthrough and no
//! rubato session is created.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::{debug, error};

use crate::error::{CadenceError, Result};

/// Converts mono f32 audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` in passthrough mode.
    resampler: Option<FastFixedIn<f32>>,
    /// Input held back until a full `block_size` is available.
    pending: Vec<f32>,
    block_size: usize,
    /// Reused output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// # Errors
    /// `CadenceError::Resample` if rubato rejects the ratio or block size.
    pub fn new(source_rate: u32, track_rate: u32, block_size: usize) -> Result<Self> {
        if source_rate == track_rate {
            return Ok(Self {
                resampler: None,
                pending: Vec::new(),
                block_size,
                output_buf: Vec::new(),
            });
        }
        if source_rate == 0 || track_rate == 0 {
            return Err(CadenceError::Resample(format!(
                "invalid rates {source_rate} -> {track_rate}"
            )));
        }

        let resampler = FastFixedIn::<f32>::new(
            track_rate as f64 / source_rate as f64,
            1.0,
            PolynomialDegree::Cubic,
            block_size,
            1,
        )
        .map_err(|e| CadenceError::Resample(format!("init: {e}")))?;

        let output_buf = vec![vec![0f32; resampler.output_frames_max()]; 1];
        debug!(source_rate, track_rate, block_size, "resampler created");

        Ok(Self {
            resampler: Some(resampler),
            pending: Vec::new(),
            block_size,
            output_buf,
        })
    }

    /// Feed samples, returning whatever full blocks produced (may be empty).
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(resampler) = self.resampler.as_mut() else {
            return samples.to_vec();
        };

        self.pending.extend_from_slice(samples);
        let mut out = Vec::new();
        while self.pending.len() >= self.block_size {
            let block = &self.pending[..self.block_size];
            match resampler.process_into_buffer(&[block], &mut self.output_buf, None) {
                Ok((_consumed, produced)) => out.extend_from_slice(&self.output_buf[0][..produced]),
                Err(e) => error!("resampler process error: {e}"),
            }
            self.pending.drain(..self.block_size);
        }
        out
    }

    /// Zero-pad and convert whatever input is still held back.
    pub fn flush(&mut self) -> Vec<f32> {
        if self.resampler.is_none() || self.pending.is_empty() {
            self.pending.clear();
            return Vec::new();
        }
        let padding = self.block_size - self.pending.len();
        self.process(&vec![0f32; padding])
    }

    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}
