// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Veriscope contributors

//! Persisted history of completed analyses

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::store::KvStore;
use crate::Result;

/// Store key holding the report collection
pub const REPORTS_KEY: &str = "forensic-reports";

/// Store key a corrupt collection is moved to for inspection
const QUARANTINE_KEY: &str = "forensic-reports.corrupt";

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "tif", "heic", "heif", "avif",
];
const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "ogg", "m4a", "aac", "wma", "opus", "aiff",
];

/// Media kind accepted by the analysis server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    /// Infer the kind from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        if IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            Some(MediaKind::Image)
        } else if AUDIO_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// A persisted record of one completed analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Milliseconds since the epoch, set at creation; doubles as identity
    pub timestamp: i64,
    pub result: ReportResult,
}

/// Server output plus the reference to the analyzed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub output: String,
    /// The file itself stays with the OS; this reference may go stale
    #[serde(rename = "inputUri")]
    pub input_uri: String,
}

impl Report {
    /// Create a report stamped with the current time
    pub fn new(kind: MediaKind, output: String, input_uri: String) -> Self {
        Self {
            kind,
            timestamp: Utc::now().timestamp_millis(),
            result: ReportResult { output, input_uri },
        }
    }
}

/// Append-only report collection on top of the key-value store
#[derive(Clone)]
pub struct ReportStore {
    store: KvStore,
}

impl ReportStore {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Read all reports, newest first
    pub fn list(&self) -> Result<Vec<Report>> {
        let raw = match self.store.try_get(REPORTS_KEY)? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };

        match serde_json::from_str(&raw) {
            Ok(reports) => Ok(reports),
            Err(e) => {
                warn!("Report collection is corrupt ({}), quarantining it", e);
                self.quarantine(&raw);
                Ok(Vec::new())
            }
        }
    }

    /// Prepend a report and write the collection back in full
    pub fn append(&self, report: Report) -> Result<()> {
        let mut reports = self.list()?;
        reports.insert(0, report);
        self.write(&reports)
    }

    /// Delete every report with the given timestamp, returning how many went
    pub fn delete(&self, timestamp: i64) -> Result<usize> {
        let mut reports = self.list()?;
        let before = reports.len();
        reports.retain(|r| r.timestamp != timestamp);
        let removed = before - reports.len();
        if removed > 0 {
            self.write(&reports)?;
        }
        Ok(removed)
    }

    /// Drop the whole collection
    pub fn clear(&self) -> Result<()> {
        self.store.try_remove(REPORTS_KEY)
    }

    fn write(&self, reports: &[Report]) -> Result<()> {
        let json = serde_json::to_string(reports)?;
        self.store.try_set(REPORTS_KEY, &json)
    }

    // Best effort: keep the unparseable blob around instead of losing it
    fn quarantine(&self, raw: &str) {
        if let Err(e) = self.store.try_set(QUARANTINE_KEY, raw) {
            debug!("Failed to quarantine corrupt reports: {}", e);
            return;
        }
        if let Err(e) = self.store.try_remove(REPORTS_KEY) {
            debug!("Failed to clear corrupt report key: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_at(timestamp: i64, output: &str) -> Report {
        Report {
            kind: MediaKind::Image,
            timestamp,
            result: ReportResult {
                output: output.to_string(),
                input_uri: "/data/media/sample.jpg".to_string(),
            },
        }
    }

    #[test]
    fn list_is_empty_when_nothing_stored() {
        let reports = ReportStore::new(KvStore::in_memory());
        assert!(reports.list().unwrap().is_empty());
    }

    #[test]
    fn append_prepends() {
        let reports = ReportStore::new(KvStore::in_memory());
        reports.append(report_at(1, "first")).unwrap();
        reports.append(report_at(2, "second")).unwrap();

        let listed = reports.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].result.output, "second");
        assert_eq!(listed[1].result.output, "first");
    }

    #[test]
    fn delete_removes_every_report_sharing_the_timestamp() {
        let reports = ReportStore::new(KvStore::in_memory());
        reports.append(report_at(100, "a")).unwrap();
        reports.append(report_at(200, "b")).unwrap();
        reports.append(report_at(200, "c")).unwrap();

        let removed = reports.delete(200).unwrap();
        assert_eq!(removed, 2);

        let listed = reports.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.iter().all(|r| r.timestamp != 200));
    }

    #[test]
    fn delete_of_unknown_timestamp_removes_nothing() {
        let reports = ReportStore::new(KvStore::in_memory());
        reports.append(report_at(100, "a")).unwrap();
        assert_eq!(reports.delete(999).unwrap(), 0);
        assert_eq!(reports.list().unwrap().len(), 1);
    }

    #[test]
    fn clear_drops_the_collection() {
        let reports = ReportStore::new(KvStore::in_memory());
        reports.append(report_at(100, "a")).unwrap();
        reports.clear().unwrap();
        assert!(reports.list().unwrap().is_empty());
    }

    #[test]
    fn corrupt_collection_is_quarantined() {
        let store = KvStore::in_memory();
        store.try_set(REPORTS_KEY, "not json at all").unwrap();

        let reports = ReportStore::new(store.clone());
        assert!(reports.list().unwrap().is_empty());

        assert_eq!(store.try_get(REPORTS_KEY).unwrap(), None);
        assert_eq!(
            store.try_get(QUARANTINE_KEY).unwrap(),
            Some("not json at all".to_string())
        );
    }

    #[test]
    fn report_serializes_to_the_stored_layout() {
        let json = serde_json::to_value(report_at(1700000000000, "synthetic: 0.92")).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["timestamp"], 1700000000000i64);
        assert_eq!(json["result"]["output"], "synthetic: 0.92");
        assert_eq!(json["result"]["inputUri"], "/data/media/sample.jpg");
    }

    #[test]
    fn kind_inference_from_extension() {
        assert_eq!(
            MediaKind::from_path(Path::new("shot.JPG")),
            Some(MediaKind::Image)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("voice.flac")),
            Some(MediaKind::Audio)
        );
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("no_extension")), None);
    }
}
