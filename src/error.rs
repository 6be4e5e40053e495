// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Veriscope contributors

//! Error types for Veriscope

use thiserror::Error;

/// Result type alias for Veriscope operations
pub type Result<T> = std::result::Result<T, VeriscopeError>;

/// Veriscope error types
#[derive(Error, Debug)]
pub enum VeriscopeError {
    #[error("Server not configured")]
    NotConfigured,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Server error: status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Unknown(String),
}
