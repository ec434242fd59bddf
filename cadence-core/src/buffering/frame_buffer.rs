//! Ordered queue of ready frames shared by the assembler and the pacer.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::audio::AudioFrame;
use crate::engine::interrupt::InterruptFlag;

/// Unbounded FIFO of assembled frames.
///
/// Raising the interrupt flag happens under the same lock as appends, so a
/// frame assembled for an interrupted generation can never be appended after
/// the clear that interrupted it.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: Mutex<VecDeque<AudioFrame>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `frame` unless `flag` has been raised since `generation`.
    pub fn push_if_current(&self, frame: AudioFrame, generation: u64, flag: &InterruptFlag) -> bool {
        let mut frames = self.frames.lock();
        if flag.is_raised_since(generation) {
            return false;
        }
        frames.push_back(frame);
        true
    }

    /// Pop the oldest frame.
    pub fn pop(&self) -> Option<AudioFrame> {
        self.frames.lock().pop_front()
    }

    /// Clear all frames and raise `flag` atomically with respect to appends.
    /// Returns the number of frames dropped and the new generation.
    pub fn clear_and_raise(&self, flag: &InterruptFlag) -> (usize, u64) {
        let mut frames = self.frames.lock();
        let dropped = frames.len();
        frames.clear();
        (dropped, flag.raise())
    }

    pub fn clear(&self) -> usize {
        let mut frames = self.frames.lock();
        let dropped = frames.len();
        frames.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: i16) -> AudioFrame {
        AudioFrame::new(vec![value; 4], 8_000)
    }

    #[test]
    fn fifo_order() {
        let flag = InterruptFlag::new();
        let buffer = FrameBuffer::new();
        assert!(buffer.push_if_current(frame(1), 0, &flag));
        assert!(buffer.push_if_current(frame(2), 0, &flag));
        assert_eq!(buffer.pop().map(|f| f.samples[0]), Some(1));
        assert_eq!(buffer.pop().map(|f| f.samples[0]), Some(2));
        assert!(buffer.pop().is_none());
    }

    #[test]
    fn clear_and_raise_rejects_stale_appends() {
        let flag = InterruptFlag::new();
        let buffer = FrameBuffer::new();
        buffer.push_if_current(frame(1), 0, &flag);
        buffer.push_if_current(frame(2), 0, &flag);

        let (dropped, generation) = buffer.clear_and_raise(&flag);
        assert_eq!(dropped, 2);
        assert_eq!(generation, 1);
        assert!(buffer.is_empty());

        assert!(!buffer.push_if_current(frame(3), 0, &flag));
        assert!(buffer.push_if_current(frame(4), 1, &flag));
        assert_eq!(buffer.len(), 1);
    }
}
