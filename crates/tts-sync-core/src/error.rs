//! Error types for tts-sync

use std::path::PathBuf;
use thiserror::Error;

/// Result type for tts-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// tts-sync error types
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed envelope; the message is skipped, the connection survives
    #[error("Decode error: {0}")]
    Decode(String),

    /// Peer closed the connection
    #[error("Connection closed")]
    ConnectionClosed,

    /// Startup could not bind a listening socket
    #[error("Bind error: {0}")]
    Bind(String),

    /// Socket read failure on an established connection
    #[error("Read error: {0}")]
    Read(String),

    /// Peer sent nothing for the configured idle limit
    #[error("Idle for {0:?}")]
    Idle(std::time::Duration),

    /// Could not reach the game's command port
    #[error("Dial error: {0}")]
    Dial(String),

    /// Connected, but writing the command failed
    #[error("Write error: {0}")]
    Write(String),

    /// Filesystem failure on a single script directory entry
    #[error("File I/O error on {}: {message}", .path.display())]
    FileIo { path: PathBuf, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    pub fn file_io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        SyncError::FileIo {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Whether the connection that produced this error can keep reading
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SyncError::Decode(_))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}
