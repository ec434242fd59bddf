//! Buffers between the producer and the pacer.
//!
//! ```text
//! producer ─► Utterance (chunk stream) ─► ByteAccumulator ─► FrameBuffer ─► pacer
//! ```

pub mod accumulator;
pub mod chunk;
pub mod frame_buffer;

pub use accumulator::ByteAccumulator;
pub use chunk::{producer_fault, ChunkResult, ChunkStream, Utterance, UtteranceWriter};
pub use frame_buffer::FrameBuffer;
