//! Error types for kanade-player
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Control-channel failures have their own error type in
//! `playback::ipc` because "unavailable" is an expected outcome there, not a
//! fault.

use thiserror::Error;

/// Main error type for kanade-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure to spawn the player or resolver process
    #[error("Spawn error: {0}")]
    Spawn(String),

    /// External resolver failed, timed out, or produced no usable output
    #[error("Resolve error: {0}")]
    Resolve(String),

    /// Search subprocess failed or its output could not be read
    #[error("Search error: {0}")]
    Search(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type using kanade-player Error
pub type Result<T> = std::result::Result<T, Error>;
