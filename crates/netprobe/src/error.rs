use std::io::Error as IoError;

use thiserror::Error;

/// Errors raised while starting a streaming session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} is required")]
    MissingParameter(&'static str),
    #[error("A ping session with ID '{0}' is already running")]
    AlreadyRunning(String),
    #[error("Invalid host: {0}")]
    InvalidHost(String),
}

/// Errors from a one-shot ping
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to run probe command: {0}")]
    Spawn(#[from] IoError),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Invalid(#[from] SessionError),
}
