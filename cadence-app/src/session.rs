//! `Session`: one track, one speaker, one simulated transport.
//!
//! ```text
//! Session::open(settings, sink) → track opened, transport task pulling frames
//!     ├─► play(cues)            → cues submitted at their offsets, waits for transport
//!     └─► shutdown()            → track closed, sink finalized, report returned
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cadence_core::{
    audio::wav::load_utterance, CadenceError, DiagnosticsSnapshot, Speaker, SpeechTrack,
    SynthHandle, ToneSynthesizer, TrackStatus,
};
use serde::Serialize;
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::settings::{AppSettings, SpeechCue};
use crate::sink::FrameSink;

/// What the transport saw over the session.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportReport {
    pub frames: usize,
    pub speech_frames: usize,
    pub silence_frames: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub transport: TransportReport,
    pub diagnostics: DiagnosticsSnapshot,
}

pub struct Session {
    track: Arc<SpeechTrack>,
    speaker: Speaker,
    chunk_bytes: usize,
    started: Instant,
    transport: JoinHandle<anyhow::Result<TransportReport>>,
    transport_done: watch::Receiver<bool>,
    events: Option<JoinHandle<()>>,
}

impl Session {
    /// Open the track and start pulling frames into `sink`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn open(settings: &AppSettings, sink: Box<dyn FrameSink>) -> anyhow::Result<Self> {
        let track = Arc::new(
            SpeechTrack::new(settings.track.clone()).context("opening speech track")?,
        );

        let synth = ToneSynthesizer::new(settings.track.sample_rate)
            .with_amplitude(settings.tone_amplitude)
            .with_chunk_delay(Duration::from_millis(settings.synth_chunk_delay_ms));
        let speaker = Speaker::new(SynthHandle::new(synth), Arc::clone(&track));

        let events = settings
            .print_events
            .then(|| tokio::spawn(print_events(Arc::clone(&track))));

        let period = settings.track.frame_period();
        let frames = (settings.duration_ms.saturating_mul(1_000)
            / settings.track.frame_period_us.max(1) as u64) as usize;
        let (done_tx, transport_done) = watch::channel(false);
        let transport = tokio::spawn(run_transport(Arc::clone(&track), sink, frames, done_tx));

        info!(
            frames,
            frame_period_us = period.as_micros() as u64,
            "session opened"
        );

        Ok(Self {
            track,
            speaker,
            chunk_bytes: settings.chunk_bytes,
            started: Instant::now(),
            transport,
            transport_done,
            events,
        })
    }

    /// Submit each cue at its offset, then wait for the transport to finish.
    ///
    /// Cues are expected in `at_ms` order. Cancel-safe: dropping the future
    /// leaves the session ready for `shutdown()`.
    pub async fn play(&mut self, cues: &[SpeechCue]) -> anyhow::Result<()> {
        for cue in cues {
            tokio::time::sleep_until(self.started + Duration::from_millis(cue.at_ms)).await;
            if *self.transport_done.borrow() {
                warn!(at_ms = cue.at_ms, "transport finished before cue");
                break;
            }
            self.submit_cue(cue).await?;
        }

        while !*self.transport_done.borrow() {
            if self.transport_done.changed().await.is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn submit_cue(&self, cue: &SpeechCue) -> anyhow::Result<()> {
        if let Some(path) = cue.wav.clone() {
            let config = self.track.config().clone();
            let chunk_bytes = self.chunk_bytes;
            let utterance =
                tokio::task::spawn_blocking(move || load_utterance(&path, &config, chunk_bytes))
                    .await
                    .context("wav loader task")??;
            let ticket = self.track.submit(utterance)?;
            info!(
                at_ms = cue.at_ms,
                utterance_id = ticket.id,
                frames_preempted = ticket.preempted.frames_cleared,
                "wav cue submitted"
            );
        } else if let Some(text) = cue.text.as_deref() {
            self.speaker.say(text)?;
        }
        Ok(())
    }

    /// Close the track, finalize the sink and collect the summary.
    pub async fn shutdown(self) -> anyhow::Result<SessionSummary> {
        match self.track.close() {
            Ok(()) | Err(CadenceError::AlreadyClosed) => {}
            Err(e) => return Err(e.into()),
        }

        let transport = self.transport.await.context("transport task panicked")??;
        if let Some(events) = self.events {
            let _ = events.await;
        }

        let diagnostics = self.track.diagnostics_snapshot();
        info!(
            frames = transport.frames,
            speech_frames = transport.speech_frames,
            interrupts = diagnostics.interrupts,
            triggers = diagnostics.triggers,
            "session shut down"
        );
        Ok(SessionSummary {
            transport,
            diagnostics,
        })
    }
}

/// Pull `frames` paced frames into the sink, stopping early when the track
/// closes.
async fn run_transport(
    track: Arc<SpeechTrack>,
    mut sink: Box<dyn FrameSink>,
    frames: usize,
    done: watch::Sender<bool>,
) -> anyhow::Result<TransportReport> {
    let mut report = TransportReport::default();

    let result = async {
        for _ in 0..frames {
            let frame = match track.next_frame().await {
                Ok(frame) => frame,
                Err(CadenceError::ClosedTrack) => break,
                Err(e) => return Err(anyhow::Error::from(e)),
            };
            sink.write_frame(&frame)?;
            report.frames += 1;
            if frame.is_silent() {
                report.silence_frames += 1;
            } else {
                report.speech_frames += 1;
            }
        }
        Ok(())
    }
    .await;

    let _ = done.send(true);
    let finished = sink.finish();
    result?;
    finished?;
    Ok(report)
}

async fn print_events(track: Arc<SpeechTrack>) {
    let mut rx = track.subscribe_status();
    drop(track);
    loop {
        match rx.recv().await {
            Ok(event) => {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!("failed to serialize status event: {e}"),
                }
                if event.status == TrackStatus::Closed {
                    break;
                }
            }
            Err(RecvError::Lagged(n)) => warn!(skipped = n, "status printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
