//! Error types for the protocol crate.

use thiserror::Error;

/// Protocol error type covering request validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A required request field was absent or empty.
    #[error("Missing '{0}' parameter")]
    MissingField(&'static str),

    /// Both fields of a rename request are required.
    #[error("Missing 'old_path' or 'new_path' parameter")]
    MissingRenamePaths,
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
