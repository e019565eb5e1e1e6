use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("accelerometer read timeout")]
    Timeout,
    #[error("click playback failed: {0}")]
    Playback(String),
    #[error("native beat engine unavailable")]
    Unavailable,
    #[error("native beat engine failed to start: {0}")]
    Start(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
