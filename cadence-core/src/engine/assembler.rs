//! Blocking frame assembler loop.
//!
//! ## Per utterance
//!
//! ```text
//! 1. Block on the ingestion queue (idle = nothing queued, nothing buffered)
//! 2. Drop residual bytes left by an interrupted generation
//! 3. For each chunk the producer yields:
//!    a. interrupted since submit? → clear buffer + residual, abandon utterance
//!    b. append bytes to the accumulator
//!    c. slice whole frames, decode, append to the frame buffer
//! 4. Back to 1
//! ```
//!
//! Runs on a dedicated OS thread: producers may block inside their chunk
//! iterators (network reads, synthesis) and must never stall the pacer.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, error, info, info_span, warn};

use crate::{
    audio::codec::decode_frame,
    buffering::{ByteAccumulator, FrameBuffer, Utterance},
    engine::{
        diagnostics::TrackDiagnostics, interrupt::InterruptFlag, status::StatusBoard, TrackConfig,
    },
    ipc::events::TrackStatus,
};

/// How long to wait on an empty queue before re-checking closure and idle
/// status.
const DEFAULT_IDLE_POLL_MS: u64 = 20;

/// Everything the assembler thread needs.
pub struct AssemblerContext {
    pub config: TrackConfig,
    pub queue: Receiver<Utterance>,
    pub buffer: Arc<FrameBuffer>,
    pub flag: Arc<InterruptFlag>,
    pub closed: Arc<AtomicBool>,
    pub status: Arc<StatusBoard>,
    pub diagnostics: Arc<TrackDiagnostics>,
}

/// How one assembly pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The producer ran out of chunks.
    Completed { frames: usize },
    /// A newer utterance preempted this one.
    Interrupted { frames: usize, bytes_discarded: usize },
    /// The producer failed; frames already buffered are kept.
    ProducerFailed { frames: usize },
    /// The track was torn down mid-pass.
    Closed,
}

/// Run until the track closes or every sender is gone.
pub fn run(ctx: AssemblerContext) {
    info!(
        frame_bytes = ctx.config.frame_byte_size(),
        samples_per_frame = ctx.config.samples_per_frame(),
        "assembler started"
    );

    let mut accumulator = ByteAccumulator::new(ctx.config.frame_byte_size());

    loop {
        if ctx.closed.load(Ordering::Acquire) {
            break;
        }

        let utterance = match ctx.queue.recv_timeout(Duration::from_millis(idle_poll_ms())) {
            Ok(u) => u,
            Err(RecvTimeoutError::Timeout) => {
                if ctx.buffer.is_empty() {
                    ctx.status.transition(
                        &[TrackStatus::Buffering, TrackStatus::Interrupted],
                        TrackStatus::Idle,
                    );
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match assemble_utterance(&ctx, &mut accumulator, utterance) {
            PassOutcome::Closed => break,
            PassOutcome::Interrupted { .. } | PassOutcome::ProducerFailed { .. } => {
                if ctx.buffer.is_empty() {
                    ctx.status.transition(
                        &[TrackStatus::Buffering, TrackStatus::Interrupted],
                        TrackStatus::Idle,
                    );
                }
            }
            PassOutcome::Completed { .. } => {}
        }
    }

    info!("assembler stopped");
}

/// Assemble one utterance into frames.
///
/// Exposed for tests and hosts that drive assembly inline.
pub fn assemble_utterance(
    ctx: &AssemblerContext,
    accumulator: &mut ByteAccumulator,
    utterance: Utterance,
) -> PassOutcome {
    let Utterance {
        id,
        generation,
        mut chunks,
    } = utterance;
    let span = info_span!("utterance", utterance_id = id, generation);
    let _enter = span.enter();

    let stale = accumulator.adopt_generation(generation);
    if stale > 0 {
        debug!(bytes = stale, "dropped residual from interrupted generation");
    }

    ctx.status.set(TrackStatus::Buffering, None);
    debug!("assembly started");

    let mut frames = 0usize;

    loop {
        if ctx.closed.load(Ordering::Acquire) {
            debug!(frames, "track closed mid-utterance");
            return PassOutcome::Closed;
        }
        if ctx.flag.is_raised_since(generation) {
            return honor_interrupt(ctx, accumulator, frames);
        }

        let next = match panic::catch_unwind(AssertUnwindSafe(|| chunks.next())) {
            Ok(next) => next,
            Err(_) => {
                error!(frames, "utterance producer panicked — abandoning utterance");
                return producer_failed(ctx, accumulator, frames);
            }
        };

        let bytes = match next {
            None => break,
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                warn!(frames, error = %e, "utterance producer failed — abandoning utterance");
                return producer_failed(ctx, accumulator, frames);
            }
        };

        // The chunk may have taken a while to arrive.
        if ctx.flag.is_raised_since(generation) {
            return honor_interrupt(ctx, accumulator, frames);
        }

        accumulator.push(&bytes);

        while let Some(frame_bytes) = accumulator.next_frame_bytes() {
            let frame = match decode_frame(&frame_bytes, &ctx.config) {
                Ok(frame) => frame,
                Err(e) => {
                    TrackDiagnostics::bump(&ctx.diagnostics.decode_errors);
                    warn!(error = %e, "skipping undecodable frame");
                    continue;
                }
            };

            if !ctx.buffer.push_if_current(frame, generation, &ctx.flag) {
                TrackDiagnostics::bump(&ctx.diagnostics.stale_frames_rejected);
                return honor_interrupt(ctx, accumulator, frames);
            }
            frames += 1;
            TrackDiagnostics::bump(&ctx.diagnostics.frames_assembled);
        }
    }

    TrackDiagnostics::bump(&ctx.diagnostics.utterances_completed);
    debug!(frames, residual = accumulator.len(), "utterance assembled");
    PassOutcome::Completed { frames }
}

fn honor_interrupt(
    ctx: &AssemblerContext,
    accumulator: &mut ByteAccumulator,
    frames: usize,
) -> PassOutcome {
    // Buffer and residual go together.
    let cleared = ctx.buffer.clear();
    let bytes_discarded = accumulator.clear();
    TrackDiagnostics::bump(&ctx.diagnostics.utterances_interrupted);
    info!(
        frames_assembled = frames,
        frames_cleared = cleared,
        bytes_discarded,
        "utterance interrupted — skipping remaining chunks"
    );
    PassOutcome::Interrupted {
        frames,
        bytes_discarded,
    }
}

fn producer_failed(
    ctx: &AssemblerContext,
    accumulator: &mut ByteAccumulator,
    frames: usize,
) -> PassOutcome {
    accumulator.clear();
    TrackDiagnostics::bump(&ctx.diagnostics.producer_errors);
    PassOutcome::ProducerFailed { frames }
}

fn idle_poll_ms() -> u64 {
    static IDLE_POLL_MS: OnceLock<u64> = OnceLock::new();
    *IDLE_POLL_MS.get_or_init(|| {
        std::env::var("CADENCE_ASSEMBLER_IDLE_POLL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(|v| v.clamp(1, 50))
            .unwrap_or(DEFAULT_IDLE_POLL_MS)
    })
}
