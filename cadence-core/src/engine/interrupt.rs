//! Barge-in: discard queued speech when a new utterance arrives.
//!
//! The flag is a generation counter rather than a bare boolean. Every
//! utterance is stamped with the generation current at submit time, and an
//! assembly pass treats the flag as raised once the counter has moved past
//! its stamp. Each pass therefore observes a given raise at most once, and a
//! raise can never leak into the utterance that caused it.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use crate::{
    buffering::{FrameBuffer, Utterance},
    engine::{diagnostics::TrackDiagnostics, status::StatusBoard},
    ipc::events::TrackStatus,
};

/// One-shot barge-in signal shared by the controller and the assembler.
#[derive(Debug, Default)]
pub struct InterruptFlag {
    generation: AtomicU64,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Raise the flag for every pass stamped before now. Returns the new
    /// generation.
    pub fn raise(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_raised_since(&self, generation: u64) -> bool {
        self.current() != generation
    }
}

/// What a call to `trigger()` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptOutcome {
    pub frames_cleared: usize,
    pub utterances_drained: usize,
    /// `false` when interruption is disabled for this track.
    pub raised: bool,
}

pub struct InterruptController {
    enabled: bool,
    flag: Arc<InterruptFlag>,
    buffer: Arc<FrameBuffer>,
    /// Clone of the ingestion receiver, used only to drain.
    queue: Receiver<Utterance>,
    status: Arc<StatusBoard>,
    diagnostics: Arc<TrackDiagnostics>,
}

impl InterruptController {
    pub fn new(
        enabled: bool,
        flag: Arc<InterruptFlag>,
        buffer: Arc<FrameBuffer>,
        queue: Receiver<Utterance>,
        status: Arc<StatusBoard>,
        diagnostics: Arc<TrackDiagnostics>,
    ) -> Self {
        Self {
            enabled,
            flag,
            buffer,
            queue,
            status,
            diagnostics,
        }
    }

    /// Clear ready frames, drop queued utterances and mark any in-flight
    /// assembly pass as interrupted. Idempotent; never blocks on the
    /// assembler and never fails.
    pub fn trigger(&self) -> InterruptOutcome {
        if !self.enabled {
            return InterruptOutcome::default();
        }

        let (frames_cleared, generation) = self.buffer.clear_and_raise(&self.flag);

        let mut utterances_drained = 0usize;
        while let Ok(stale) = self.queue.try_recv() {
            debug!(utterance_id = stale.id(), "discarding queued utterance");
            utterances_drained += 1;
        }

        self.diagnostics.record_interrupt(frames_cleared, utterances_drained);

        if frames_cleared > 0 || utterances_drained > 0 {
            info!(
                frames_cleared,
                utterances_drained, generation, "barge-in: discarded pending speech"
            );
            self.status.set(
                TrackStatus::Interrupted,
                Some(format!(
                    "cleared {frames_cleared} frames, dropped {utterances_drained} utterances"
                )),
            );
        } else {
            debug!(generation, "interrupt raised with nothing buffered");
        }

        InterruptOutcome {
            frames_cleared,
            utterances_drained,
            raised: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;

    fn controller(
        enabled: bool,
    ) -> (InterruptController, Arc<FrameBuffer>, crossbeam_channel::Sender<Utterance>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let buffer = Arc::new(FrameBuffer::new());
        let ctl = InterruptController::new(
            enabled,
            Arc::new(InterruptFlag::new()),
            Arc::clone(&buffer),
            rx,
            Arc::new(StatusBoard::new()),
            Arc::new(TrackDiagnostics::default()),
        );
        (ctl, buffer, tx)
    }

    fn fill(ctl: &InterruptController, buffer: &FrameBuffer, n: usize) {
        for _ in 0..n {
            buffer.push_if_current(AudioFrame::new(vec![1; 4], 8_000), ctl.flag.current(), &ctl.flag);
        }
    }

    #[test]
    fn flag_generation_counts_raises() {
        let flag = InterruptFlag::new();
        assert!(!flag.is_raised_since(0));
        assert_eq!(flag.raise(), 1);
        assert!(flag.is_raised_since(0));
        assert!(!flag.is_raised_since(1));
    }

    #[test]
    fn trigger_clears_buffer_and_drains_queue() {
        let (ctl, buffer, tx) = controller(true);
        fill(&ctl, &buffer, 5);
        tx.send(Utterance::from_chunks(vec![vec![0; 960]])).expect("send");
        tx.send(Utterance::from_chunks(vec![vec![0; 960]])).expect("send");

        let outcome = ctl.trigger();
        assert_eq!(outcome.frames_cleared, 5);
        assert_eq!(outcome.utterances_drained, 2);
        assert!(outcome.raised);
        assert!(buffer.is_empty());
        assert!(ctl.queue.is_empty());
        assert_eq!(ctl.status.get(), TrackStatus::Interrupted);
    }

    #[test]
    fn second_trigger_has_nothing_left_to_clear() {
        let (ctl, buffer, _tx) = controller(true);
        fill(&ctl, &buffer, 3);

        let first = ctl.trigger();
        let second = ctl.trigger();
        assert_eq!(first.frames_cleared, 3);
        assert_eq!(second.frames_cleared, 0);
        assert_eq!(second.utterances_drained, 0);
        assert!(buffer.is_empty());

        let diag = ctl.diagnostics.snapshot();
        assert_eq!(diag.triggers, 2);
        assert_eq!(diag.interrupts, 1);
    }

    #[test]
    fn trigger_on_idle_track_counts_no_interrupt() {
        let (ctl, _buffer, _tx) = controller(true);
        let outcome = ctl.trigger();
        assert!(outcome.raised);

        let diag = ctl.diagnostics.snapshot();
        assert_eq!(diag.triggers, 1);
        assert_eq!(diag.interrupts, 0);
        assert_eq!(ctl.status.get(), TrackStatus::Idle);
    }

    #[test]
    fn disabled_controller_is_a_no_op() {
        let (ctl, buffer, tx) = controller(false);
        fill(&ctl, &buffer, 2);
        tx.send(Utterance::from_chunks(vec![])).expect("send");

        let outcome = ctl.trigger();
        assert_eq!(outcome, InterruptOutcome::default());
        assert_eq!(buffer.len(), 2);
        assert_eq!(ctl.queue.len(), 1);
        assert_eq!(ctl.flag.current(), 0);
    }
}
