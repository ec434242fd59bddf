//! Wall-clock pacing of outgoing frames.
//!
//! Deadlines are anchored to the instant of the first emission:
//! `deadline(n) = start + n * samples_per_frame / sample_rate`. A caller that
//! falls behind gets frames back to back until it catches up, so lateness
//! never accumulates into drift.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::time::{sleep_until, Instant};
use tracing::{trace, warn};

use crate::{
    audio::{codec::silence_frame, AudioFrame, TimeBase},
    buffering::FrameBuffer,
    engine::{diagnostics::TrackDiagnostics, status::StatusBoard, TrackConfig},
    error::{CadenceError, Result},
    ipc::events::TrackStatus,
};

/// Pacing state: when emission started and how many samples went out.
#[derive(Debug, Clone)]
pub struct Timeline {
    start: Option<Instant>,
    elapsed_samples: u64,
    time_base: TimeBase,
}

impl Timeline {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            start: None,
            elapsed_samples: 0,
            time_base: TimeBase::per_sample(sample_rate),
        }
    }

    /// Ideal emission instant of the next frame. Starts the clock on first use.
    pub fn deadline(&mut self, now: Instant) -> Instant {
        let start = *self.start.get_or_insert(now);
        start + self.time_base.to_duration(self.elapsed_samples)
    }

    /// Consume one frame slot, returning its pts.
    pub fn advance(&mut self, samples: usize) -> u64 {
        let pts = self.elapsed_samples;
        self.elapsed_samples += samples as u64;
        pts
    }

    pub fn start(&self) -> Option<Instant> {
        self.start
    }

    pub fn elapsed_samples(&self) -> u64 {
        self.elapsed_samples
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }
}

/// Consumer side of the pipeline. One instance per track; calls are
/// expected back to back from a single transport task.
pub struct FramePacer {
    config: TrackConfig,
    timeline: Timeline,
    buffer: Arc<FrameBuffer>,
    closed: Arc<AtomicBool>,
    status: Arc<StatusBoard>,
    diagnostics: Arc<TrackDiagnostics>,
}

impl FramePacer {
    pub fn new(
        config: TrackConfig,
        buffer: Arc<FrameBuffer>,
        closed: Arc<AtomicBool>,
        status: Arc<StatusBoard>,
        diagnostics: Arc<TrackDiagnostics>,
    ) -> Self {
        let timeline = Timeline::new(config.sample_rate);
        Self {
            config,
            timeline,
            buffer,
            closed,
            status,
            diagnostics,
        }
    }

    /// Wait until the next frame is due, then return buffered speech or
    /// silence.
    ///
    /// # Errors
    /// `CadenceError::ClosedTrack` once the track is torn down, including
    /// when teardown happens while waiting.
    pub async fn next_frame(&mut self) -> Result<AudioFrame> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CadenceError::ClosedTrack);
        }

        let deadline = self.timeline.deadline(Instant::now());
        if deadline > Instant::now() {
            sleep_until(deadline).await;
        }

        if self.closed.load(Ordering::Acquire) {
            return Err(CadenceError::ClosedTrack);
        }

        let samples_per_frame = self.config.samples_per_frame();
        let pts = self.timeline.advance(samples_per_frame);

        let frame = match self.buffer.pop() {
            Some(frame) if frame.samples.len() == samples_per_frame => {
                TrackDiagnostics::bump(&self.diagnostics.frames_emitted);
                self.status.transition(
                    &[TrackStatus::Idle, TrackStatus::Buffering, TrackStatus::Interrupted],
                    TrackStatus::Emitting,
                );
                frame
            }
            Some(frame) => {
                warn!(
                    got = frame.samples.len(),
                    expected = samples_per_frame,
                    "malformed frame in buffer — substituting silence"
                );
                TrackDiagnostics::bump(&self.diagnostics.silence_emitted);
                silence_frame(&self.config)
            }
            None => {
                TrackDiagnostics::bump(&self.diagnostics.silence_emitted);
                self.status
                    .transition(&[TrackStatus::Emitting], TrackStatus::Idle);
                silence_frame(&self.config)
            }
        };

        trace!(pts, "frame emitted");
        Ok(frame.with_timestamp(pts, self.timeline.time_base()))
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::audio::codec::decode_frame;
    use crate::engine::interrupt::InterruptFlag;

    struct Fixture {
        pacer: FramePacer,
        buffer: Arc<FrameBuffer>,
        closed: Arc<AtomicBool>,
        status: Arc<StatusBoard>,
        flag: InterruptFlag,
    }

    fn fixture() -> Fixture {
        let buffer = Arc::new(FrameBuffer::new());
        let closed = Arc::new(AtomicBool::new(false));
        let status = Arc::new(StatusBoard::new());
        let pacer = FramePacer::new(
            TrackConfig::default(),
            Arc::clone(&buffer),
            Arc::clone(&closed),
            Arc::clone(&status),
            Arc::new(TrackDiagnostics::default()),
        );
        Fixture {
            pacer,
            buffer,
            closed,
            status,
            flag: InterruptFlag::new(),
        }
    }

    fn speech_frame(value: i16) -> AudioFrame {
        let bytes: Vec<u8> = std::iter::repeat(value.to_le_bytes())
            .take(480)
            .flatten()
            .collect();
        decode_frame(&bytes, &TrackConfig::default()).expect("decode")
    }

    #[tokio::test(start_paused = true)]
    async fn pts_advances_by_one_frame_per_call() {
        let mut fx = fixture();
        fx.buffer.push_if_current(speech_frame(3), 0, &fx.flag);

        let mut pts = Vec::new();
        for _ in 0..4 {
            pts.push(fx.pacer.next_frame().await.expect("frame").pts);
        }
        assert_eq!(pts, vec![0, 480, 960, 1_440]);
        assert_eq!(fx.pacer.timeline().elapsed_samples(), 1_920);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_never_early() {
        let mut fx = fixture();
        let first = fx.pacer.next_frame().await.expect("frame");
        assert_eq!(first.pts, 0);
        let start = Instant::now();

        let mut last = start;
        for k in 1..=10u32 {
            fx.pacer.next_frame().await.expect("frame");
            let now = Instant::now();
            assert!(now - last >= Duration::from_millis(20));
            assert_eq!(now - start, Duration::from_millis(20) * k);
            last = now;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn late_caller_catches_up_without_drift() {
        let mut fx = fixture();
        fx.pacer.next_frame().await.expect("frame");
        let start = fx.pacer.timeline().start().expect("timeline started");

        // Transport stalls for 5 frame periods.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let stalled_at = Instant::now();

        // Missed slots are served immediately…
        for _ in 0..5 {
            fx.pacer.next_frame().await.expect("frame");
            assert_eq!(Instant::now(), stalled_at);
        }
        // …then the original schedule resumes.
        fx.pacer.next_frame().await.expect("frame");
        assert_eq!(Instant::now() - start, Duration::from_millis(120));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_buffer_yields_silence_of_frame_length() {
        let mut fx = fixture();
        for _ in 0..3 {
            let frame = fx.pacer.next_frame().await.expect("frame");
            assert_eq!(frame.samples.len(), 480);
            assert!(frame.is_silent());
            assert_eq!(frame.duration(), Duration::from_millis(20));
            assert_eq!(frame.time_base, TimeBase::per_sample(24_000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn buffered_speech_then_silence() {
        let mut fx = fixture();
        fx.buffer.push_if_current(speech_frame(7), 0, &fx.flag);
        fx.buffer.push_if_current(speech_frame(8), 0, &fx.flag);

        let a = fx.pacer.next_frame().await.expect("frame");
        assert_eq!(fx.status.get(), TrackStatus::Emitting);
        let b = fx.pacer.next_frame().await.expect("frame");
        let c = fx.pacer.next_frame().await.expect("frame");

        assert_eq!(a.samples[0], 7);
        assert_eq!(b.samples[0], 8);
        assert!(c.is_silent());
        assert_eq!((a.pts, b.pts, c.pts), (0, 480, 960));
        assert_eq!(fx.status.get(), TrackStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frame_degrades_to_silence() {
        let mut fx = fixture();
        fx.buffer
            .push_if_current(AudioFrame::new(vec![9; 100], 24_000), 0, &fx.flag);
        let frame = fx.pacer.next_frame().await.expect("frame");
        assert_eq!(frame.samples.len(), 480);
        assert!(frame.is_silent());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_track_errors_instead_of_silence() {
        let mut fx = fixture();
        fx.pacer.next_frame().await.expect("frame");
        fx.closed.store(true, Ordering::Release);
        for _ in 0..3 {
            assert!(matches!(
                fx.pacer.next_frame().await,
                Err(CadenceError::ClosedTrack)
            ));
        }
    }
}
