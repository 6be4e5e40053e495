// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Veriscope contributors

//! Per-kind orchestration: selection, upload, persistence

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::AnalysisClient;
use crate::config::SettingsStore;
use crate::picker::{FileHandle, MediaPicker, PickOutcome};
use crate::reports::{MediaKind, Report, ReportStore};
use crate::{Result, VeriscopeError};

/// Where a pipeline instance currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    FileSelected,
    Uploading,
    ReportSaved,
    UploadFailed,
}

/// What came out of a submit attempt
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Analysis finished; `report_saved` is false when history could
    /// not be written (the result itself is still in hand)
    Completed { output: String, report_saved: bool },
    /// No server endpoint configured; nothing was sent
    NotConfigured,
    /// An upload is already in flight
    Busy,
    /// Nothing selected yet
    NoFile,
    /// Upload or processing failed; the selection is kept for a retry
    Failed(VeriscopeError),
}

/// Upload pipeline for one media kind.
///
/// Instances for different kinds are independent and share only the
/// report store and settings behind them.
pub struct AnalysisPipeline {
    kind: MediaKind,
    client: AnalysisClient,
    settings: Arc<SettingsStore>,
    reports: ReportStore,
    state: PipelineState,
    selected: Option<FileHandle>,
    busy: bool,
}

impl AnalysisPipeline {
    pub fn new(
        kind: MediaKind,
        client: AnalysisClient,
        settings: Arc<SettingsStore>,
        reports: ReportStore,
    ) -> Self {
        Self {
            kind,
            client,
            settings,
            reports,
            state: PipelineState::Idle,
            selected: None,
            busy: false,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn selected(&self) -> Option<&FileHandle> {
        self.selected.as_ref()
    }

    /// Ask the picker for a file. A successful pick replaces the
    /// previous selection and clears any prior result; cancellation
    /// leaves both untouched.
    pub async fn select(&mut self, picker: &dyn MediaPicker) -> Result<bool> {
        match picker.pick(self.kind).await? {
            PickOutcome::Selected(file) => {
                debug!("Selected {} for {} analysis", file.name, self.kind);
                self.selected = Some(file);
                self.state = PipelineState::FileSelected;
                Ok(true)
            }
            PickOutcome::Cancelled => {
                debug!("Selection cancelled");
                Ok(false)
            }
            PickOutcome::PermissionDenied => Err(VeriscopeError::PermissionDenied(
                "media access was refused".to_string(),
            )),
        }
    }

    /// Upload the selected file and persist the resulting report.
    /// Calling again after a failure retries with the same file.
    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.busy {
            return SubmitOutcome::Busy;
        }
        let file = match self.selected.clone() {
            Some(file) => file,
            None => return SubmitOutcome::NoFile,
        };

        let endpoint = self.settings.get().server_url;
        if endpoint.trim().is_empty() {
            self.state = PipelineState::FileSelected;
            return SubmitOutcome::NotConfigured;
        }

        self.busy = true;
        self.state = PipelineState::Uploading;
        info!("Uploading {} for {} analysis", file.name, self.kind);

        let result = self.client.submit(&file, self.kind, &endpoint).await;
        self.busy = false;

        match result {
            Ok(output) => {
                let report = Report::new(self.kind, output.clone(), file.uri.clone());
                let report_saved = match self.reports.append(report) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Analysis succeeded but the report was not saved: {}", e);
                        false
                    }
                };
                self.state = PipelineState::ReportSaved;
                SubmitOutcome::Completed {
                    output,
                    report_saved,
                }
            }
            Err(e) => {
                self.state = PipelineState::UploadFailed;
                SubmitOutcome::Failed(e)
            }
        }
    }
}
