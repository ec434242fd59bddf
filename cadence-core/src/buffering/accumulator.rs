//! Residual bytes smaller than one frame, carried between chunks.

/// Holds the undersized tail left after slicing frames out of incoming bytes.
///
/// The residual is tagged with the interruption generation it was collected
/// under; bytes from an interrupted generation never prefix a newer one.
#[derive(Debug)]
pub struct ByteAccumulator {
    buf: Vec<u8>,
    frame_bytes: usize,
    generation: u64,
}

impl ByteAccumulator {
    pub fn new(frame_bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(frame_bytes * 2),
            frame_bytes,
            generation: 0,
        }
    }

    /// Switch to `generation`, discarding residual from an older one.
    /// Returns the number of bytes discarded.
    pub fn adopt_generation(&mut self, generation: u64) -> usize {
        if generation == self.generation {
            return 0;
        }
        self.generation = generation;
        self.clear()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Slice off exactly one frame's worth of bytes, if available.
    pub fn next_frame_bytes(&mut self) -> Option<Vec<u8>> {
        if self.buf.len() < self.frame_bytes {
            return None;
        }
        let rest = self.buf.split_off(self.frame_bytes);
        Some(std::mem::replace(&mut self.buf, rest))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop the residual, returning how many bytes were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.buf.len();
        self.buf.clear();
        n
    }
}
