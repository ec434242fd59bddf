//! Where the simulated transport sends paced frames.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use cadence_core::AudioFrame;
use hound::{SampleFormat, WavSpec, WavWriter};

pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &AudioFrame) -> anyhow::Result<()>;

    /// Flush and close. Called once after the last frame.
    fn finish(self: Box<Self>) -> anyhow::Result<()>;
}

/// Writes every frame to a mono 16-bit WAV file.
pub struct WavSink {
    path: PathBuf,
    writer: WavWriter<BufWriter<File>>,
}

impl WavSink {
    pub fn create(path: &Path, sample_rate: u32) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("creating wav output {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }
}

impl FrameSink for WavSink {
    fn write_frame(&mut self, frame: &AudioFrame) -> anyhow::Result<()> {
        for s in &frame.samples {
            self.writer
                .write_sample(*s)
                .context("writing wav frame")?;
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> anyhow::Result<()> {
        let path = self.path;
        self.writer
            .finalize()
            .with_context(|| format!("finalizing {}", path.display()))
    }
}

/// Discards frames.
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn write_frame(&mut self, _frame: &AudioFrame) -> anyhow::Result<()> {
        Ok(())
    }

    fn finish(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}
