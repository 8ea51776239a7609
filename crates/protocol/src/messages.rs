//! HTTP request and response bodies.
//!
//! All bodies are JSON. Request fields are optional at the serde level so
//! that a missing field surfaces as a validation error rather than a
//! deserialization failure; an empty string counts as missing.

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::listing::DirectoryEntry;

/// Returns the value if it is present and non-empty.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ============================================================================
// Requests
// ============================================================================

/// Body for endpoints that take a single path (download, mkdir, list, delete).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRequest {
    /// Path relative to the configured base directory.
    #[serde(default)]
    pub path: Option<String>,
}

impl PathRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Returns the path or a validation error if it is missing.
    pub fn require_path(&self) -> Result<&str> {
        non_empty(&self.path).ok_or(ProtocolError::MissingField("path"))
    }

    /// Returns the path, or the empty string when absent.
    pub fn path_or_base(&self) -> &str {
        self.path.as_deref().unwrap_or("")
    }
}

/// Body for the rename endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRequest {
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub new_path: Option<String>,
}

impl RenameRequest {
    pub fn new(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            old_path: Some(old_path.into()),
            new_path: Some(new_path.into()),
        }
    }

    /// Returns `(old_path, new_path)`; both must be present.
    pub fn require_paths(&self) -> Result<(&str, &str)> {
        match (non_empty(&self.old_path), non_empty(&self.new_path)) {
            (Some(old), Some(new)) => Ok((old, new)),
            _ => Err(ProtocolError::MissingRenamePaths),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Generic success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    /// Full remote path affected by the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

/// Success body for the rename endpoint. Paths echo the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameResponse {
    pub message: String,
    pub old_path: String,
    pub new_path: String,
}

/// Success body for the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub contents: Vec<DirectoryEntry>,
}

/// Body returned with every 4xx/5xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
