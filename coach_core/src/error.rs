//! Error types for the coach_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for coach_core operations
///
/// The playback engine itself never fails: invalid transitions are absorbed
/// as no-ops. These variants cover persistence, configuration and authoring.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A program, phase or exercise id did not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reorder request with an index outside the list
    #[error("Invalid move: index {from} -> {to} (len {len})")]
    InvalidMove { from: usize, to: usize, len: usize },

    /// Program flattens to an empty timeline
    #[error("Program '{0}' has no exercises to play")]
    EmptyProgram(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
