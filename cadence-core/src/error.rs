use thiserror::Error;

/// All errors produced by cadence-core.
#[derive(Debug, Error)]
pub enum CadenceError {
    /// `next_frame()` or `submit()` called after the track was torn down.
    #[error("audio track is closed")]
    ClosedTrack,

    #[error("track is already closed")]
    AlreadyClosed,

    #[error("invalid config value for {key}: {message}")]
    InvalidConfig { key: &'static str, message: String },

    #[error("frame decode error: {0}")]
    Decode(String),

    #[error("utterance producer failed: {0}")]
    Producer(String),

    #[error("audio file error: {0}")]
    AudioFile(String),

    #[error("resampler error: {0}")]
    Resample(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CadenceError>;

impl From<hound::Error> for CadenceError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => CadenceError::Io(io),
            other => CadenceError::AudioFile(other.to_string()),
        }
    }
}
