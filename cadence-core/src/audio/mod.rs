//! Audio data types and conversions.
//!
//! Nothing in here touches shared state: these are the leaf operations the
//! assembler and the WAV source build on.

pub mod codec;
pub mod frame;
pub mod resample;
pub mod wav;

pub use codec::{decode_frame, encode_samples, silence_frame};
pub use frame::{AudioFrame, TimeBase};
