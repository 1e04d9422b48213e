//! Error types for Keydeck core.

use thiserror::Error;

/// Core error type for Keydeck operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid layer: {0} (must be 0-4)")]
    InvalidLayer(u8),

    #[error("Invalid slot: {0} (must be 1-12)")]
    InvalidSlot(u8),

    #[error("No such detect candidate: {0}")]
    NoSuchCandidate(usize),

    #[error("Audio control error: {0}")]
    Audio(String),

    #[error("Key injection error: {0}")]
    Injection(String),

    #[error("Process control error: {0}")]
    Process(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type alias for Keydeck core operations.
pub type Result<T> = std::result::Result<T, Error>;
