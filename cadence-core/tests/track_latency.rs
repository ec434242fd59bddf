use std::time::{Duration, Instant};

use cadence_core::audio::codec::encode_samples;
use cadence_core::{
    AudioFrame, CadenceError, SpeechSynthesizer, SpeechTrack, ToneSynthesizer, TrackConfig,
    TrackStatus, Utterance,
};
use tokio::sync::broadcast::error::TryRecvError;

const FRAME_SAMPLES: usize = 480;

/// `frames` worth of a constant sample value, in awkward chunk sizes.
fn constant_utterance(value: i16, frames: usize) -> Utterance {
    let samples = vec![value; FRAME_SAMPLES * frames];
    Utterance::from_bytes(encode_samples(&samples), 1_234)
}

fn frame_value(frame: &AudioFrame) -> Option<i16> {
    let first = *frame.samples.first()?;
    frame.samples.iter().all(|s| *s == first).then_some(first)
}

#[tokio::test]
async fn first_speech_frame_arrives_quickly() {
    let config = TrackConfig::default();
    let track = SpeechTrack::new(config.clone()).expect("track");
    let synth = ToneSynthesizer::new(config.sample_rate);

    let started = Instant::now();
    track
        .submit(synth.synthesize("hello there").expect("synthesize"))
        .expect("submit");

    let mut pulled = 0;
    loop {
        let frame = track.next_frame().await.expect("frame");
        pulled += 1;
        if !frame.is_silent() {
            break;
        }
        assert!(pulled < 25, "no speech after {pulled} frames");
    }

    let latency = started.elapsed();
    assert!(
        latency < Duration::from_millis(250),
        "first speech took {latency:?}"
    );
}

#[tokio::test]
async fn barge_in_never_leaks_previous_speech() {
    let track = SpeechTrack::new(TrackConfig::default()).expect("track");

    track.submit(constant_utterance(1_000, 250)).expect("submit A");
    let mut heard_a = 0;
    for _ in 0..25 {
        if frame_value(&track.next_frame().await.expect("frame")) == Some(1_000) {
            heard_a += 1;
        }
        if heard_a >= 3 {
            break;
        }
    }
    assert!(heard_a >= 3, "utterance A never started playing");

    let ticket = track.submit(constant_utterance(-2_000, 10)).expect("submit B");
    assert!(ticket.preempted.raised);

    let mut heard_b = 0;
    for _ in 0..60 {
        let frame = track.next_frame().await.expect("frame");
        match frame_value(&frame) {
            Some(1_000) => panic!("stale frame from A after barge-in"),
            Some(-2_000) => heard_b += 1,
            _ => {}
        }
        if heard_b == 10 {
            break;
        }
    }
    assert_eq!(heard_b, 10);

    let diag = track.diagnostics_snapshot();
    assert_eq!(diag.utterances_submitted, 2);
    assert_eq!(diag.triggers, 2);
    assert_eq!(diag.interrupts, 1, "only B's submit had speech to discard");
    assert!(ticket.preempted.frames_cleared > 0);
    assert!(diag.frames_cleared >= ticket.preempted.frames_cleared);
}

#[tokio::test]
async fn without_interruption_utterances_play_in_order() {
    let config = TrackConfig {
        interruption_enabled: false,
        ..TrackConfig::default()
    };
    let track = SpeechTrack::new(config).expect("track");

    track.submit(constant_utterance(1_000, 5)).expect("submit A");
    let ticket = track.submit(constant_utterance(-2_000, 5)).expect("submit B");
    assert!(!ticket.preempted.raised);

    let mut heard = Vec::new();
    for _ in 0..40 {
        if let Some(v) = frame_value(&track.next_frame().await.expect("frame")) {
            if v != 0 {
                heard.push(v);
            }
        }
        if heard.len() == 10 {
            break;
        }
    }

    let mut expected = vec![1_000i16; 5];
    expected.extend(vec![-2_000i16; 5]);
    assert_eq!(heard, expected);
}

#[tokio::test]
async fn timestamps_advance_one_frame_per_call() {
    let track = SpeechTrack::new(TrackConfig::default()).expect("track");
    track.submit(constant_utterance(500, 3)).expect("submit");

    let mut last = None;
    for _ in 0..8 {
        let frame = track.next_frame().await.expect("frame");
        assert_eq!(frame.samples.len(), FRAME_SAMPLES);
        if let Some(prev) = last {
            assert_eq!(frame.pts, prev + FRAME_SAMPLES as u64);
        }
        last = Some(frame.pts);
    }
}

#[tokio::test]
async fn status_follows_speech_then_silence() {
    let track = SpeechTrack::new(TrackConfig::default()).expect("track");
    let mut rx = track.subscribe_status();

    track.submit(constant_utterance(700, 3)).expect("submit");
    for _ in 0..15 {
        track.next_frame().await.expect("frame");
    }

    let mut seen = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => seen.push(event.status),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    let emitting = seen
        .iter()
        .position(|s| *s == TrackStatus::Emitting)
        .expect("emitting status");
    assert!(
        seen[emitting..].contains(&TrackStatus::Idle),
        "track should go idle after speech: {seen:?}"
    );
}

#[tokio::test]
async fn closed_track_rejects_everything() {
    let track = SpeechTrack::new(TrackConfig::default()).expect("track");
    track.next_frame().await.expect("frame before close");

    track.close().expect("close");
    assert!(matches!(
        track.next_frame().await,
        Err(CadenceError::ClosedTrack)
    ));
    assert!(matches!(
        track.submit(constant_utterance(1, 1)),
        Err(CadenceError::ClosedTrack)
    ));
    assert!(matches!(track.close(), Err(CadenceError::AlreadyClosed)));
    assert_eq!(track.status(), TrackStatus::Closed);

    let start = Instant::now();
    while !track.is_assembler_finished() && start.elapsed() < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(track.is_assembler_finished());
}
