//! Lock-free counters describing what the track has done so far.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct TrackDiagnostics {
    pub utterances_submitted: AtomicUsize,
    pub utterances_completed: AtomicUsize,
    pub utterances_interrupted: AtomicUsize,
    pub utterances_drained: AtomicUsize,
    pub producer_errors: AtomicUsize,
    pub decode_errors: AtomicUsize,
    pub frames_assembled: AtomicUsize,
    pub stale_frames_rejected: AtomicUsize,
    pub frames_cleared: AtomicUsize,
    pub frames_emitted: AtomicUsize,
    pub silence_emitted: AtomicUsize,
    /// Every enabled barge-in, including those on an idle track.
    pub triggers: AtomicUsize,
    /// Barge-ins that actually discarded pending speech.
    pub interrupts: AtomicUsize,
}

impl TrackDiagnostics {
    pub(crate) fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_interrupt(&self, frames_cleared: usize, utterances_drained: usize) {
        self.triggers.fetch_add(1, Ordering::Relaxed);
        if frames_cleared > 0 || utterances_drained > 0 {
            self.interrupts.fetch_add(1, Ordering::Relaxed);
        }
        self.frames_cleared
            .fetch_add(frames_cleared, Ordering::Relaxed);
        self.utterances_drained
            .fetch_add(utterances_drained, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            utterances_submitted: self.utterances_submitted.load(Ordering::Relaxed),
            utterances_completed: self.utterances_completed.load(Ordering::Relaxed),
            utterances_interrupted: self.utterances_interrupted.load(Ordering::Relaxed),
            utterances_drained: self.utterances_drained.load(Ordering::Relaxed),
            producer_errors: self.producer_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            frames_assembled: self.frames_assembled.load(Ordering::Relaxed),
            stale_frames_rejected: self.stale_frames_rejected.load(Ordering::Relaxed),
            frames_cleared: self.frames_cleared.load(Ordering::Relaxed),
            frames_emitted: self.frames_emitted.load(Ordering::Relaxed),
            silence_emitted: self.silence_emitted.load(Ordering::Relaxed),
            triggers: self.triggers.load(Ordering::Relaxed),
            interrupts: self.interrupts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub utterances_submitted: usize,
    pub utterances_completed: usize,
    pub utterances_interrupted: usize,
    pub utterances_drained: usize,
    pub producer_errors: usize,
    pub decode_errors: usize,
    pub frames_assembled: usize,
    pub stale_frames_rejected: usize,
    pub frames_cleared: usize,
    pub frames_emitted: usize,
    pub silence_emitted: usize,
    pub triggers: usize,
    pub interrupts: usize,
}
