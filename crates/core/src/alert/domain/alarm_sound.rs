use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("failed to decode alarm sound {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("no audio output device available")]
    NoOutputDevice,
    #[error("audio output stream failed: {0}")]
    Stream(String),
}

/// Domain interface for playing the alarm sound.
///
/// `play` blocks until the sound has finished (or failed); callers that
/// must not block run it on their own thread.
pub trait AlarmSound: Send + Sync {
    fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}
