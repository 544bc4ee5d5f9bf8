//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or parsing messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Empty message")]
    Empty,
}
