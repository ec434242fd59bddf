//! Pacing jitter report.
//!
//! Plays a synthetic utterance through a `SpeechTrack` and measures how far
//! each frame's delivery drifts from its ideal wall-clock slot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_core::{SpeechSynthesizer, SpeechTrack, ToneSynthesizer, TrackConfig};
use serde::Serialize;

#[derive(Debug)]
struct Args {
    frames: usize,
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    frames: usize,
    frame_period_us: u32,
    speech_frames: usize,
    silence_frames: usize,
    first_speech_ms: Option<f64>,
    p50_lateness_ms: f64,
    p95_lateness_ms: f64,
    max_lateness_ms: f64,
    total_drift_ms: f64,
}

fn parse_args() -> Result<Args, String> {
    let mut frames: usize = 250;
    let mut output: Option<PathBuf> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--frames" => {
                let v = it.next().ok_or("missing value for --frames")?;
                frames = v
                    .parse()
                    .map_err(|_| format!("invalid --frames value: {v}"))?;
            }
            "--output" => {
                let v = it.next().ok_or("missing value for --output")?;
                output = Some(PathBuf::from(v));
            }
            "-h" | "--help" => {
                println!("usage: jitter [--frames <n>] [--output <file.json>]");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Args {
        frames: frames.max(1),
        output,
    })
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = ((sorted.len() - 1) as f64 * p.clamp(0.0, 1.0)).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Offset of frame `index` from the first frame on a perfect schedule.
fn ideal_offset(period: Duration, index: usize) -> Duration {
    period.mul_f64(index as f64)
}

async fn run(args: Args) -> Result<Summary, String> {
    let config = TrackConfig::default();
    let period = config.frame_period();
    let track = Arc::new(SpeechTrack::new(config.clone()).map_err(|e| e.to_string())?);

    let synth = ToneSynthesizer::new(config.sample_rate).with_chunk_delay(Duration::from_millis(5));
    let utterance = synth
        .synthesize("measuring the cadence of streamed speech frames")
        .map_err(|e| e.to_string())?;

    let submitted = Instant::now();
    track.submit(utterance).map_err(|e| e.to_string())?;

    let mut lateness = Vec::with_capacity(args.frames);
    let mut speech_frames = 0usize;
    let mut first_speech_ms = None;
    let mut origin: Option<Instant> = None;

    for i in 0..args.frames {
        let frame = track.next_frame().await.map_err(|e| e.to_string())?;
        let now = Instant::now();
        let start = *origin.get_or_insert(now);
        let ideal = start + ideal_offset(period, i);
        lateness.push(now.saturating_duration_since(ideal).as_secs_f64() * 1000.0);

        if !frame.is_silent() {
            speech_frames += 1;
            first_speech_ms.get_or_insert(submitted.elapsed().as_secs_f64() * 1000.0);
        }
    }

    let total_drift_ms = lateness.last().copied().unwrap_or(0.0);
    let _ = track.close();

    Ok(Summary {
        frames: args.frames,
        frame_period_us: config.frame_period_us,
        speech_frames,
        silence_frames: args.frames - speech_frames,
        first_speech_ms,
        p50_lateness_ms: percentile(&lateness, 0.50),
        p95_lateness_ms: percentile(&lateness, 0.95),
        max_lateness_ms: lateness.iter().copied().fold(0.0, f64::max),
        total_drift_ms,
    })
}

#[tokio::main]
async fn main() {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    let output = args.output.clone();

    let summary = match run(args).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("jitter run failed: {e}");
            std::process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&summary) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("failed to serialize summary: {e}");
            std::process::exit(1);
        }
    };
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &json) {
                eprintln!("failed to write {}: {e}", path.display());
                std::process::exit(1);
            }
            println!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
}
