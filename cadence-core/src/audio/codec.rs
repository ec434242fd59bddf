//! Frame codec: fixed-size byte slices ⇄ typed frames.
//!
//! Wire layout is raw mono PCM, signed 16-bit little-endian, which is what
//! streaming TTS providers emit for `pcm_<rate>` output formats.

use super::frame::AudioFrame;
use crate::engine::TrackConfig;
use crate::error::{CadenceError, Result};

/// Decode exactly one frame's worth of bytes.
///
/// # Errors
/// `CadenceError::Decode` when `bytes` is not exactly `frame_byte_size` long.
pub fn decode_frame(bytes: &[u8], config: &TrackConfig) -> Result<AudioFrame> {
    let expected = config.frame_byte_size();
    if bytes.len() != expected {
        return Err(CadenceError::Decode(format!(
            "expected {expected} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(AudioFrame::new(decode_samples(bytes), config.sample_rate))
}

/// A frame of zeroed samples.
pub fn silence_frame(config: &TrackConfig) -> AudioFrame {
    AudioFrame::new(vec![0i16; config.samples_per_frame()], config.sample_rate)
}

/// Little-endian i16 samples from raw bytes. A trailing odd byte is ignored.
pub fn decode_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Raw little-endian bytes for a sample slice, as a producer would emit them.
pub fn encode_samples(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Convert f32 samples in [-1.0, 1.0] to i16 with clipping.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_frame() {
        let cfg = TrackConfig::default();
        let samples: Vec<i16> = (0..480).map(|i| i as i16 - 240).collect();
        let frame = decode_frame(&encode_samples(&samples), &cfg).expect("decode");
        assert_eq!(frame.samples, samples);
        assert_eq!(frame.sample_rate, 24_000);
        assert_eq!(frame.pts, 0);
    }

    #[test]
    fn short_slice_is_decode_error() {
        let cfg = TrackConfig::default();
        let err = decode_frame(&[0u8; 959], &cfg).unwrap_err();
        assert!(matches!(err, CadenceError::Decode(_)));
    }

    #[test]
    fn silence_has_frame_length() {
        let cfg = TrackConfig::default();
        let frame = silence_frame(&cfg);
        assert_eq!(frame.samples.len(), 480);
        assert!(frame.is_silent());
    }

    #[test]
    fn extreme_values_survive_little_endian() {
        let samples = [i16::MIN, -1, 0, 1, i16::MAX];
        assert_eq!(decode_samples(&encode_samples(&samples)), samples);
    }

    #[test]
    fn f32_conversion_clips() {
        assert_eq!(f32_to_i16(&[2.0, -2.0, 0.0]), vec![i16::MAX, -i16::MAX, 0]);
    }
}
