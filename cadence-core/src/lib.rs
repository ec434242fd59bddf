//! # cadence-core
//!
//! Real-time speech output track for streaming TTS.
//!
//! ## Architecture
//!
//! ```text
//! SpeechSynthesizer ─► Utterance ─► ingestion queue ─► Assembler (OS thread)
//!                                                          │
//!                                          ByteAccumulator → decode_frame
//!                                                          │
//!                                                     FrameBuffer
//!                                                          │
//! transport ◄── next_frame().await ◄── FramePacer (absolute timeline, silence fill)
//! ```
//!
//! `submit` barges in: buffered frames, queued utterances and the in-flight
//! utterance are all discarded before the new one is queued.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod synth;

pub use audio::{AudioFrame, TimeBase};
pub use buffering::{Utterance, UtteranceWriter};
pub use engine::{
    DiagnosticsSnapshot, InterruptOutcome, SpeechTrack, TrackConfig, UtteranceTicket,
};
pub use error::{CadenceError, Result};
pub use ipc::events::{TrackStatus, TrackStatusEvent};
pub use synth::{Speaker, SpeechSynthesizer, SynthHandle, ToneSynthesizer};
