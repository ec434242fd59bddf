//! Speech synthesis abstraction.
//!
//! The pipeline only needs one thing from a TTS provider: a stream of raw
//! mono 16-bit PCM chunks at the track's sample rate. `SpeechSynthesizer`
//! captures exactly that, so providers can be swapped without touching the
//! track.

pub mod tone;

pub use tone::ToneSynthesizer;

use std::sync::Arc;

use crate::buffering::Utterance;
use crate::engine::{SpeechTrack, UtteranceTicket};
use crate::error::Result;

/// Contract for text-to-speech backends.
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Start synthesizing `text`. Should return quickly; audio may keep
    /// arriving through the utterance after this returns.
    ///
    /// # Errors
    /// Providers return an error when synthesis cannot start at all.
    /// Failures after the first chunk travel inside the utterance.
    fn synthesize(&self, text: &str) -> Result<Utterance>;
}

/// Shareable handle to any `SpeechSynthesizer`.
#[derive(Clone)]
pub struct SynthHandle(pub Arc<dyn SpeechSynthesizer>);

impl SynthHandle {
    pub fn new<S: SpeechSynthesizer>(synth: S) -> Self {
        Self(Arc::new(synth))
    }
}

impl std::fmt::Debug for SynthHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SynthHandle").field(&self.0.name()).finish()
    }
}

/// Pairs a synthesizer with the track its audio plays on.
#[derive(Clone)]
pub struct Speaker {
    synth: SynthHandle,
    track: Arc<SpeechTrack>,
}

impl Speaker {
    pub fn new(synth: SynthHandle, track: Arc<SpeechTrack>) -> Self {
        Self { synth, track }
    }

    /// Synthesize `text` and queue it, preempting anything still playing.
    pub fn say(&self, text: &str) -> Result<UtteranceTicket> {
        let utterance = self.synth.0.synthesize(text)?;
        let ticket = self.track.submit(utterance)?;
        tracing::info!(
            synth = self.synth.0.name(),
            utterance_id = ticket.id,
            chars = text.chars().count(),
            frames_preempted = ticket.preempted.frames_cleared,
            "speaking"
        );
        Ok(ticket)
    }

    pub fn track(&self) -> &Arc<SpeechTrack> {
        &self.track
    }
}
