//! Cadence session host.
//!
//! Drives a speech track the way a call transport would: frames are pulled
//! back to back at the track's cadence while scripted cues are synthesized
//! and submitted, barging in on whatever is still playing.

mod session;
mod settings;
mod sink;

use std::path::PathBuf;

use anyhow::{bail, Context};
use session::Session;
use settings::{default_settings_path, load_settings, save_settings, AppSettings, SpeechCue};
use sink::{FrameSink, NullSink, WavSink};
use tracing::info;

const USAGE: &str = "usage: cadence [--settings <file.json>] [--at <ms>] (--say <text> | --wav <file.wav>)... \
[--duration-ms <ms>] [--output <file.wav>] [--no-interrupt] [--events] [--save-settings]";

#[derive(Debug, Default)]
struct Args {
    settings: Option<PathBuf>,
    cues: Vec<SpeechCue>,
    duration_ms: Option<u64>,
    output: Option<PathBuf>,
    no_interrupt: bool,
    events: bool,
    /// Write the merged settings back to the settings file and exit.
    save: bool,
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut next_at: u64 = 0;

    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| it.next().with_context(|| format!("missing value for {flag}"));
        match arg.as_str() {
            "--settings" => args.settings = Some(PathBuf::from(value("--settings")?)),
            "--say" => args.cues.push(SpeechCue::say(next_at, value("--say")?)),
            "--wav" => args.cues.push(SpeechCue::wav(next_at, value("--wav")?)),
            "--at" => {
                let v = value("--at")?;
                next_at = v.parse().with_context(|| format!("invalid --at value: {v}"))?;
            }
            "--duration-ms" => {
                let v = value("--duration-ms")?;
                args.duration_ms =
                    Some(v.parse().with_context(|| format!("invalid --duration-ms value: {v}"))?);
            }
            "--output" => args.output = Some(PathBuf::from(value("--output")?)),
            "--no-interrupt" => args.no_interrupt = true,
            "--events" => args.events = true,
            "--save-settings" => args.save = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}\n{USAGE}"),
        }
    }
    Ok(args)
}

/// Overlay command-line flags on the loaded settings.
fn apply_args(settings: &mut AppSettings, args: Args) {
    if !args.cues.is_empty() {
        settings.cues = args.cues;
    }
    if let Some(duration_ms) = args.duration_ms {
        settings.duration_ms = duration_ms;
    }
    if args.output.is_some() {
        settings.output = args.output;
    }
    if args.no_interrupt {
        settings.track.interruption_enabled = false;
    }
    if args.events {
        settings.print_events = true;
    }
    if settings.cues.is_empty() {
        settings.cues.push(SpeechCue::say(0, "hello from cadence"));
    }
    settings.normalize();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cadence=info,cadence_core=info")),
        )
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    let save = args.save;
    apply_args(&mut settings, args);

    if save {
        save_settings(&settings_path, &settings)
            .with_context(|| format!("saving settings to {}", settings_path.display()))?;
        info!(settings_path = ?settings_path, "settings saved");
        return Ok(());
    }

    info!(
        settings_path = ?settings_path,
        duration_ms = settings.duration_ms,
        cues = settings.cues.len(),
        interruption_enabled = settings.track.interruption_enabled,
        "settings loaded"
    );

    let sink: Box<dyn FrameSink> = match &settings.output {
        Some(path) => Box::new(WavSink::create(path, settings.track.sample_rate)?),
        None => Box::new(NullSink),
    };

    let mut session = Session::open(&settings, sink)?;
    let played = tokio::select! {
        res = session.play(&settings.cues) => res,
        res = tokio::signal::ctrl_c() => {
            res.context("listening for ctrl-c")?;
            info!("ctrl-c received, shutting down");
            Ok(())
        }
    };

    let summary = session.shutdown().await?;
    played?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if let Some(path) = &settings.output {
        info!(path = %path.display(), "session audio written");
    }
    Ok(())
}
