//! Error types for tuning data, spawning and persistence.
//!
//! None of these ever reach gameplay state: callers log them and carry on.

use thiserror::Error;

/// Errors that can occur when loading or validating tuning data.
#[derive(Debug, Error)]
pub enum TuningError {
    /// JSON parsing failed.
    #[error("Failed to parse tuning data: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the simulation cannot run with.
    #[error("Invalid tuning value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors raised while constructing an entity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    /// A boss is already on the field.
    #[error("Boss already active")]
    BossAlreadyActive,

    /// Wave-scaled boss health came out non-positive.
    #[error("Boss health for wave {wave} is {health}")]
    InvalidBossHealth { wave: u32, health: i32 },
}

/// Errors from the high score and settings stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File could not be read or written.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored document could not be (de)serialized.
    #[error("Malformed data in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
