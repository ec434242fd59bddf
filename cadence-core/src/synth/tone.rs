//! `ToneSynthesizer`: offline stand-in for a streaming TTS provider.
//!
//! Renders one short tone per word, separated by silence gaps, and delivers
//! it from a background thread in irregular chunk sizes, the way a network
//! TTS stream arrives. Useful for exercising the full pipeline without a
//! provider account.

use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::audio::codec::{encode_samples, f32_to_i16};
use crate::buffering::Utterance;
use crate::error::Result;
use crate::synth::SpeechSynthesizer;

/// Chunk sizes cycled through when streaming; deliberately not frame-aligned.
const CHUNK_PATTERN: [usize; 5] = [1_337, 512, 2_900, 733, 4_096];

#[derive(Debug, Clone)]
pub struct ToneSynthesizer {
    sample_rate: u32,
    /// Tone length per character, clamped to a sensible word length.
    ms_per_char: u32,
    gap_ms: u32,
    amplitude: f32,
    /// Delay between chunks, to mimic network arrival. Zero streams as fast
    /// as the consumer drains.
    chunk_delay: Duration,
}

impl ToneSynthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ms_per_char: 60,
            gap_ms: 80,
            amplitude: 0.3,
            chunk_delay: Duration::ZERO,
        }
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Render the whole utterance as PCM bytes.
    pub fn render(&self, text: &str) -> Vec<u8> {
        let mut samples: Vec<f32> = Vec::new();
        let gap = vec![0.0f32; self.ms_to_samples(self.gap_ms)];

        for (i, word) in text.split_whitespace().enumerate() {
            if i > 0 {
                samples.extend_from_slice(&gap);
            }
            let chars = word.chars().count() as u32;
            let tone_ms = (chars * self.ms_per_char).clamp(120, 600);
            samples.extend(self.tone(word_frequency(word), self.ms_to_samples(tone_ms)));
        }

        encode_samples(&f32_to_i16(&samples))
    }

    fn tone(&self, freq: f32, len: usize) -> impl Iterator<Item = f32> + '_ {
        // 5 ms linear fade at both ends avoids clicks at word boundaries.
        let fade = self.ms_to_samples(5).max(1).min(len / 2).max(1);
        let rate = self.sample_rate as f32;
        (0..len).map(move |n| {
            let envelope = if n < fade {
                n as f32 / fade as f32
            } else if n + fade >= len {
                (len - n) as f32 / fade as f32
            } else {
                1.0
            };
            self.amplitude * envelope * (TAU * freq * n as f32 / rate).sin()
        })
    }

    fn ms_to_samples(&self, ms: u32) -> usize {
        (self.sample_rate as u64 * ms as u64 / 1_000) as usize
    }
}

impl SpeechSynthesizer for ToneSynthesizer {
    fn name(&self) -> &str {
        "tone"
    }

    fn synthesize(&self, text: &str) -> Result<Utterance> {
        let pcm = self.render(text);
        let delay = self.chunk_delay;
        let (writer, utterance) = Utterance::streaming();

        thread::Builder::new()
            .name("cadence-tone-synth".into())
            .spawn(move || {
                let mut offset = 0usize;
                for size in CHUNK_PATTERN.iter().cycle() {
                    if offset >= pcm.len() {
                        break;
                    }
                    let end = (offset + size).min(pcm.len());
                    if !writer.write(pcm[offset..end].to_vec()) {
                        debug!(offset, "utterance discarded, stopping synthesis");
                        return;
                    }
                    offset = end;
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                debug!(bytes = pcm.len(), "tone synthesis finished");
            })?;

        Ok(utterance)
    }
}

/// Stable pitch per word in 220–620 Hz so repeated words sound alike.
fn word_frequency(word: &str) -> f32 {
    let hash = word
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    220.0 + (hash % 400) as f32
}
