//! Persistent host settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use cadence_core::TrackConfig;
use serde::{Deserialize, Serialize};

/// One scripted line of speech, submitted `at_ms` after the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechCue {
    pub at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wav: Option<PathBuf>,
}

impl SpeechCue {
    pub fn say(at_ms: u64, text: impl Into<String>) -> Self {
        Self {
            at_ms,
            text: Some(text.into()),
            wav: None,
        }
    }

    pub fn wav(at_ms: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            at_ms,
            text: None,
            wav: Some(path.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub track: TrackConfig,
    /// How long the simulated transport keeps pulling frames.
    pub duration_ms: u64,
    /// WAV file receiving everything the transport pulled. `None` discards.
    pub output: Option<PathBuf>,
    /// Chunk size used when streaming WAV cues into the track.
    pub chunk_bytes: usize,
    /// Delay between synthesized chunks, to mimic network arrival.
    pub synth_chunk_delay_ms: u64,
    pub tone_amplitude: f32,
    /// Print status events as JSON lines.
    pub print_events: bool,
    pub cues: Vec<SpeechCue>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            track: TrackConfig::default(),
            duration_ms: 4_000,
            output: None,
            chunk_bytes: 4_096,
            synth_chunk_delay_ms: 10,
            tone_amplitude: 0.3,
            print_events: false,
            cues: Vec::new(),
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.duration_ms = self.duration_ms.clamp(100, 10 * 60 * 1_000);
        self.chunk_bytes = self.chunk_bytes.clamp(64, 1 << 20);
        self.synth_chunk_delay_ms = self.synth_chunk_delay_ms.min(1_000);
        if !self.tone_amplitude.is_finite() {
            self.tone_amplitude = 0.3;
        }
        self.tone_amplitude = self.tone_amplitude.clamp(0.0, 1.0);
        self.cues
            .retain(|cue| cue.wav.is_some() || cue.text.as_deref().is_some_and(|t| !t.trim().is_empty()));
        self.cues.sort_by_key(|cue| cue.at_ms);
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Cadence")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("cadence")
            .join("settings.json")
    }
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
