//! Utterances: one producer-supplied sequence of raw PCM byte chunks.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{CadenceError, Result};

/// One burst of raw PCM bytes, or the producer fault that ended the stream.
pub type ChunkResult = Result<Vec<u8>>;

/// Boxed chunk sequence. May be finite or open-ended.
pub type ChunkStream = Box<dyn Iterator<Item = ChunkResult> + Send>;

/// How long a streaming utterance waits for its writer before yielding an
/// empty heartbeat chunk, so the assembler can observe interrupts and
/// closure while a producer is stalled.
const STREAM_HEARTBEAT: Duration = Duration::from_millis(20);

/// A chunk that reports a producer failure, for iterator-based producers.
pub fn producer_fault(message: impl Into<String>) -> ChunkResult {
    Err(CadenceError::Producer(message.into()))
}

/// A single utterance queued for assembly.
///
/// `id` and `generation` are assigned by the track on submit.
pub struct Utterance {
    pub(crate) id: u64,
    pub(crate) generation: u64,
    pub(crate) chunks: ChunkStream,
}

impl Utterance {
    /// Wrap any chunk sequence.
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = ChunkResult>,
        I::IntoIter: Send + 'static,
    {
        Self {
            id: 0,
            generation: 0,
            chunks: Box::new(chunks.into_iter()),
        }
    }

    /// An utterance whose chunks are all available up front.
    pub fn from_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self::new(chunks.into_iter().map(Ok))
    }

    /// Split one contiguous payload into `chunk_size`-byte pieces.
    pub fn from_bytes(bytes: Vec<u8>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunks: Vec<Vec<u8>> = bytes.chunks(chunk_size).map(<[u8]>::to_vec).collect();
        Self::from_chunks(chunks)
    }

    /// An utterance fed incrementally by a producer, e.g. a network TTS
    /// stream. The utterance ends when the writer is dropped.
    pub fn streaming() -> (UtteranceWriter, Utterance) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let utterance = Self::new(StreamingChunks { rx });
        (UtteranceWriter { tx }, utterance)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn stamp(&mut self, id: u64, generation: u64) {
        self.id = id;
        self.generation = generation;
    }
}

impl fmt::Debug for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Utterance")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Producer half of a streaming utterance.
#[derive(Debug, Clone)]
pub struct UtteranceWriter {
    tx: Sender<ChunkResult>,
}

impl UtteranceWriter {
    /// Queue a chunk. Returns `false` once the utterance has been discarded
    /// (interrupted or the track closed), so the producer can stop early.
    pub fn write(&self, chunk: Vec<u8>) -> bool {
        self.tx.send(Ok(chunk)).is_ok()
    }

    /// End the utterance with a producer fault.
    pub fn fail(self, message: impl Into<String>) {
        let _ = self.tx.send(Err(CadenceError::Producer(message.into())));
    }
}

struct StreamingChunks {
    rx: Receiver<ChunkResult>,
}

impl Iterator for StreamingChunks {
    type Item = ChunkResult;

    fn next(&mut self) -> Option<ChunkResult> {
        match self.rx.recv_timeout(STREAM_HEARTBEAT) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) => Some(Ok(Vec::new())),
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_bytes(utterance: Utterance) -> Vec<Vec<u8>> {
        utterance
            .chunks
            .map(|c| c.expect("chunk"))
            .filter(|c| !c.is_empty())
            .collect()
    }

    #[test]
    fn from_bytes_splits_with_short_tail() {
        let utterance = Utterance::from_bytes(vec![7u8; 2_500], 1_000);
        let sizes: Vec<usize> = collect_bytes(utterance).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1_000, 1_000, 500]);
    }

    #[test]
    fn streaming_ends_when_writer_drops() {
        let (writer, utterance) = Utterance::streaming();
        assert!(writer.write(vec![1, 2]));
        assert!(writer.write(vec![3]));
        drop(writer);
        assert_eq!(collect_bytes(utterance), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn streaming_yields_heartbeat_while_writer_stalls() {
        let (writer, mut utterance) = Utterance::streaming();
        let first = utterance.chunks.next().expect("heartbeat").expect("ok");
        assert!(first.is_empty());
        drop(writer);
    }

    #[test]
    fn writer_reports_discarded_utterance() {
        let (writer, utterance) = Utterance::streaming();
        assert!(writer.write(vec![1; 4]));
        drop(utterance);
        assert!(!writer.write(vec![0; 4]));
    }

    #[test]
    fn stream_carries_only_written_chunks() {
        let (writer, utterance) = Utterance::streaming();
        assert!(writer.write(vec![1; 3]));
        assert!(writer.write(vec![2; 5]));
        drop(writer);

        let items: Vec<Vec<u8>> = utterance.chunks.map(|c| c.expect("chunk")).collect();
        assert_eq!(items, vec![vec![1; 3], vec![2; 5]]);
    }

    #[test]
    fn fail_surfaces_producer_error() {
        let (writer, utterance) = Utterance::streaming();
        writer.fail("socket reset");
        let items: Vec<ChunkResult> = utterance.chunks.collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(CadenceError::Producer(_))));
    }
}
