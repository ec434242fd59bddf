//! `SpeechTrack` — top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! SpeechTrack::new(config)   → config validated, assembler thread spawned, status = Idle
//!     ├─► submit(utterance)  → barge-in, then enqueue; returns immediately
//!     ├─► next_frame().await → paced frame (speech or silence)
//!     └─► close()            → status = Closed, next_frame() fails with ClosedTrack
//! ```
//!
//! ## Threading
//!
//! The assembler runs on its own OS thread and talks to the rest of the track
//! only through the ingestion channel, the frame buffer and the interrupt
//! flag. `next_frame()` runs on whatever async task the transport uses; the
//! pacer sits behind an async mutex so overlapping calls queue up instead of
//! corrupting the timeline.

pub mod assembler;
pub mod config;
pub mod diagnostics;
pub mod interrupt;
pub mod pacer;
pub mod status;

pub use config::TrackConfig;
pub use diagnostics::DiagnosticsSnapshot;
pub use interrupt::{InterruptFlag, InterruptOutcome};

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    audio::AudioFrame,
    buffering::{FrameBuffer, Utterance},
    error::{CadenceError, Result},
    ipc::events::{TrackStatus, TrackStatusEvent},
};

use self::{
    assembler::AssemblerContext, diagnostics::TrackDiagnostics, interrupt::InterruptController,
    pacer::FramePacer, status::StatusBoard,
};

/// Receipt for a submitted utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtteranceTicket {
    pub id: u64,
    /// Interruption generation the utterance belongs to.
    pub generation: u64,
    /// What submitting this utterance discarded.
    pub preempted: InterruptOutcome,
}

/// Real-time speech output track.
///
/// `SpeechTrack` is `Send + Sync`; wrap it in `Arc` to share between the
/// synthesis side (`submit`) and the transport side (`next_frame`).
pub struct SpeechTrack {
    config: TrackConfig,
    /// `None` once closed. The lock also serializes submit/interrupt so each
    /// utterance is stamped with the generation its own barge-in produced.
    queue_tx: Mutex<Option<Sender<Utterance>>>,
    interrupt: InterruptController,
    pacer: tokio::sync::Mutex<FramePacer>,
    buffer: Arc<FrameBuffer>,
    flag: Arc<InterruptFlag>,
    closed: Arc<AtomicBool>,
    status: Arc<StatusBoard>,
    diagnostics: Arc<TrackDiagnostics>,
    next_utterance_id: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechTrack {
    /// Validate `config` and start the assembler thread.
    ///
    /// # Errors
    /// - `CadenceError::InvalidConfig` for unsupported frame geometry.
    /// - `CadenceError::Io` if the assembler thread cannot be spawned.
    pub fn new(config: TrackConfig) -> Result<Self> {
        config.validate()?;

        let (queue_tx, queue_rx) = crossbeam_channel::unbounded::<Utterance>();
        let buffer = Arc::new(FrameBuffer::new());
        let flag = Arc::new(InterruptFlag::new());
        let closed = Arc::new(AtomicBool::new(false));
        let status = Arc::new(StatusBoard::new());
        let diagnostics = Arc::new(TrackDiagnostics::default());

        let interrupt = InterruptController::new(
            config.interruption_enabled,
            Arc::clone(&flag),
            Arc::clone(&buffer),
            queue_rx.clone(),
            Arc::clone(&status),
            Arc::clone(&diagnostics),
        );

        let pacer = FramePacer::new(
            config.clone(),
            Arc::clone(&buffer),
            Arc::clone(&closed),
            Arc::clone(&status),
            Arc::clone(&diagnostics),
        );

        let ctx = AssemblerContext {
            config: config.clone(),
            queue: queue_rx,
            buffer: Arc::clone(&buffer),
            flag: Arc::clone(&flag),
            closed: Arc::clone(&closed),
            status: Arc::clone(&status),
            diagnostics: Arc::clone(&diagnostics),
        };
        let worker = std::thread::Builder::new()
            .name("cadence-assembler".into())
            .spawn(move || assembler::run(ctx))?;

        info!(
            sample_rate = config.sample_rate,
            frame_period_us = config.frame_period_us,
            interruption_enabled = config.interruption_enabled,
            "speech track opened"
        );

        Ok(Self {
            config,
            queue_tx: Mutex::new(Some(queue_tx)),
            interrupt,
            pacer: tokio::sync::Mutex::new(pacer),
            buffer,
            flag,
            closed,
            status,
            diagnostics,
            next_utterance_id: AtomicU64::new(1),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue a new utterance, preempting whatever is still pending.
    ///
    /// Returns as soon as the utterance is queued; assembly happens on the
    /// assembler thread.
    ///
    /// # Errors
    /// `CadenceError::ClosedTrack` after `close()`.
    pub fn submit(&self, mut utterance: Utterance) -> Result<UtteranceTicket> {
        let queue = self.queue_tx.lock();
        let Some(tx) = queue.as_ref() else {
            return Err(CadenceError::ClosedTrack);
        };

        let preempted = self.interrupt.trigger();
        let id = self.next_utterance_id.fetch_add(1, Ordering::Relaxed);
        let generation = self.flag.current();
        utterance.stamp(id, generation);

        tx.send(utterance).map_err(|_| CadenceError::ClosedTrack)?;
        TrackDiagnostics::bump(&self.diagnostics.utterances_submitted);

        Ok(UtteranceTicket {
            id,
            generation,
            preempted,
        })
    }

    /// Barge-in without queuing anything new (e.g. the remote party started
    /// talking). A no-op when interruption is disabled or the track is closed.
    pub fn interrupt(&self) -> InterruptOutcome {
        let queue = self.queue_tx.lock();
        if queue.is_none() {
            return InterruptOutcome::default();
        }
        self.interrupt.trigger()
    }

    /// Wait for the next frame slot and return speech or silence.
    ///
    /// # Errors
    /// `CadenceError::ClosedTrack` once the track is closed.
    pub async fn next_frame(&self) -> Result<AudioFrame> {
        self.pacer.lock().await.next_frame().await
    }

    /// Tear the track down. Pending speech is dropped, the assembler thread
    /// exits, and every later `next_frame()` fails.
    ///
    /// # Errors
    /// `CadenceError::AlreadyClosed` on a second call.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(CadenceError::AlreadyClosed);
        }

        // Dropping the sender disconnects the assembler's receive.
        self.queue_tx.lock().take();
        let dropped = self.buffer.clear();
        self.status.set(TrackStatus::Closed, None);
        info!(frames_dropped = dropped, "speech track closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// `true` once the assembler thread has exited.
    pub fn is_assembler_finished(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    pub fn status(&self) -> TrackStatus {
        self.status.get()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<TrackStatusEvent> {
        self.status.subscribe()
    }

    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Frames assembled and waiting for the pacer.
    pub fn buffered_frames(&self) -> usize {
        self.buffer.len()
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }
}

impl Drop for SpeechTrack {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.close() {
                warn!("track close on drop failed: {e}");
            }
        }
    }
}
