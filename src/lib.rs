// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Veriscope contributors

//! Veriscope: client for a remote forensic media-analysis server
//!
//! Uploads user-selected image and audio files for analysis and keeps a
//! local history of the results.

pub mod client;
pub mod config;
pub mod error;
pub mod picker;
pub mod pipeline;
pub mod reports;
pub mod store;

pub use config::Settings;
pub use error::{Result, VeriscopeError};
