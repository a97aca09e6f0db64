//! Error types for the announcement pipeline

use thiserror::Error;

/// Result type alias for announcement operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors raised by chime players and speech backends. The sequencer logs them and
/// moves on; none of them stalls the queue.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Speech unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for VoiceError {
    fn from(err: reqwest::Error) -> Self {
        VoiceError::Tts(err.to_string())
    }
}
