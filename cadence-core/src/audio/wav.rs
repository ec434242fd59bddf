//! Pre-rendered speech from WAV files.
//!
//! Any PCM or float WAV is accepted: channels are averaged down to mono and
//! the rate is converted to the track's, so the resulting utterance always
//! carries the track's wire format.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use super::codec::{encode_samples, f32_to_i16};
use super::resample::RateConverter;
use crate::buffering::Utterance;
use crate::engine::TrackConfig;
use crate::error::{CadenceError, Result};

/// Load a WAV file as an utterance split into `chunk_bytes`-sized chunks.
///
/// # Errors
/// - `CadenceError::Io` when the file cannot be opened.
/// - `CadenceError::AudioFile` for malformed or unsupported WAV data.
/// - `CadenceError::Resample` if rate conversion cannot be set up.
pub fn load_utterance(path: &Path, config: &TrackConfig, chunk_bytes: usize) -> Result<Utterance> {
    let pcm = load_pcm(path, config)?;
    Ok(Utterance::from_bytes(pcm, chunk_bytes))
}

/// Decode, downmix and convert a WAV file to the track's raw byte format.
pub fn load_pcm(path: &Path, config: &TrackConfig) -> Result<Vec<u8>> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(CadenceError::AudioFile(format!(
                    "unsupported bit depth {}",
                    spec.bits_per_sample
                )));
            }
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    let mut converter =
        RateConverter::new(spec.sample_rate, config.sample_rate, config.samples_per_frame())?;
    let mut converted = converter.process(&mono);
    converted.extend(converter.flush());

    debug!(
        path = %path.display(),
        source_rate = spec.sample_rate,
        channels,
        samples = converted.len(),
        "wav utterance loaded"
    );

    Ok(encode_samples(&f32_to_i16(&converted)))
}
