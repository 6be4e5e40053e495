// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Veriscope contributors

//! Media picker boundary
//!
//! The platform file picker is an external collaborator; this module
//! only defines the seam plus the command-line implementation of it.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::reports::MediaKind;
use crate::{Result, VeriscopeError};

/// A file chosen by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// Reference to the file; the bytes stay with the OS
    pub uri: String,
    pub name: String,
    pub size: Option<u64>,
}

/// Outcome of asking the user for a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Selected(FileHandle),
    Cancelled,
    PermissionDenied,
}

/// Source of user-selected media files
#[async_trait]
pub trait MediaPicker: Send + Sync {
    /// Ask for a file of the given kind
    async fn pick(&self, kind: MediaKind) -> Result<PickOutcome>;
}

/// Picker that resolves a path given on the command line
pub struct PathPicker {
    path: PathBuf,
}

impl PathPicker {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl MediaPicker for PathPicker {
    async fn pick(&self, _kind: MediaKind) -> Result<PickOutcome> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Ok(PickOutcome::PermissionDenied);
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Err(VeriscopeError::Unknown(format!(
                "{} is not a regular file",
                self.path.display()
            )));
        }

        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        Ok(PickOutcome::Selected(FileHandle {
            uri: self.path.to_string_lossy().to_string(),
            name,
            size: Some(metadata.len()),
        }))
    }
}
