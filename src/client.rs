// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Veriscope contributors

//! HTTP client for the remote forensic analysis server

use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::picker::FileHandle;
use crate::reports::MediaKind;
use crate::{Result, VeriscopeError};

/// Default deadline for an upload round trip
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Deadline for the lightweight reachability probes
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Analysis server client
#[derive(Clone)]
pub struct AnalysisClient {
    client: Client,
}

#[derive(Deserialize)]
struct ProcessResponse {
    success: bool,
    output: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

/// Normalize a configured endpoint: trim, drop trailing slashes, and
/// prefix `https://` when no scheme is present. Empty input means the
/// server was never configured.
pub fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(VeriscopeError::NotConfigured);
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("https://{}", trimmed))
    }
}

/// MIME type sent for a file of the given kind.
/// Images always go as JPEG; audio is derived from the extension.
pub fn content_type_for(kind: MediaKind, filename: &str) -> &'static str {
    match kind {
        MediaKind::Image => "image/jpeg",
        MediaKind::Audio => {
            let ext = std::path::Path::new(filename)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());
            match ext.as_deref() {
                Some("mp3") => "audio/mpeg",
                Some("wav") => "audio/wav",
                Some("flac") => "audio/flac",
                _ => "audio/mpeg",
            }
        }
    }
}

fn translate_send_error(e: reqwest::Error) -> VeriscopeError {
    if e.is_timeout() {
        VeriscopeError::Timeout
    } else {
        VeriscopeError::Unknown(e.to_string())
    }
}

impl AnalysisClient {
    /// Create a client with the default upload deadline
    pub fn new() -> Self {
        Self::with_timeout(UPLOAD_TIMEOUT)
    }

    /// Create a client with an explicit upload deadline
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Upload a file for analysis and return the server's output text.
    ///
    /// Yields exactly one terminal outcome per call; persisting the
    /// result is the caller's concern.
    pub async fn submit(
        &self,
        file: &FileHandle,
        kind: MediaKind,
        endpoint: &str,
    ) -> Result<String> {
        let endpoint = normalize_endpoint(endpoint)?;
        let url = format!("{}/api/process/{}", endpoint, kind);

        let bytes = tokio::fs::read(&file.uri).await?;
        let part = multipart::Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(content_type_for(kind, &file.name))
            .map_err(|e| VeriscopeError::Unknown(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        debug!("Uploading {} to {}", file.name, url);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .header("ngrok-skip-browser-warning", "true")
            .multipart(form)
            .send()
            .await
            .map_err(translate_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VeriscopeError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ProcessResponse = response
            .json()
            .await
            .map_err(|e| VeriscopeError::Unknown(e.to_string()))?;

        if !payload.success {
            return Err(VeriscopeError::ProcessingFailed(
                payload.error.unwrap_or_else(|| "Processing failed".to_string()),
            ));
        }

        Ok(payload.output.unwrap_or_default())
    }

    /// Check that the analysis server is reachable
    pub async fn health_check(&self, endpoint: &str) -> Result<String> {
        let endpoint = normalize_endpoint(endpoint)?;
        let url = format!("{}/", endpoint);

        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(translate_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VeriscopeError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| VeriscopeError::Unknown(e.to_string()))?;
        Ok(health.status)
    }

    /// Fetch the server's self-description, if it offers one
    pub async fn server_info(&self, endpoint: &str) -> Result<serde_json::Value> {
        let endpoint = normalize_endpoint(endpoint)?;
        let url = format!("{}/api/server-info", endpoint);

        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(translate_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VeriscopeError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| VeriscopeError::Unknown(e.to_string()))
    }
}

impl Default for AnalysisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Multipart;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn temp_media(name: &str) -> (tempfile::TempDir, FileHandle) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, b"not really media").unwrap();
        let handle = FileHandle {
            uri: path.to_string_lossy().to_string(),
            name: name.to_string(),
            size: Some(16),
        };
        (dir, handle)
    }

    #[test]
    fn endpoint_gains_https_when_scheme_is_missing() {
        assert_eq!(
            normalize_endpoint("lab.example.org").unwrap(),
            "https://lab.example.org"
        );
        assert_eq!(
            normalize_endpoint("192.168.1.20:5000/").unwrap(),
            "https://192.168.1.20:5000"
        );
    }

    #[test]
    fn endpoint_with_scheme_is_kept() {
        assert_eq!(
            normalize_endpoint("http://lab.example.org").unwrap(),
            "http://lab.example.org"
        );
        assert_eq!(
            normalize_endpoint("https://lab.example.org/").unwrap(),
            "https://lab.example.org"
        );
    }

    #[test]
    fn empty_endpoint_is_not_configured() {
        assert!(matches!(
            normalize_endpoint(""),
            Err(VeriscopeError::NotConfigured)
        ));
        assert!(matches!(
            normalize_endpoint("  "),
            Err(VeriscopeError::NotConfigured)
        ));
    }

    #[test]
    fn audio_mime_follows_the_extension() {
        assert_eq!(content_type_for(MediaKind::Audio, "a.mp3"), "audio/mpeg");
        assert_eq!(content_type_for(MediaKind::Audio, "a.wav"), "audio/wav");
        assert_eq!(content_type_for(MediaKind::Audio, "a.FLAC"), "audio/flac");
        assert_eq!(content_type_for(MediaKind::Audio, "a.ogg"), "audio/mpeg");
        assert_eq!(content_type_for(MediaKind::Audio, "noext"), "audio/mpeg");
    }

    #[test]
    fn images_are_always_sent_as_jpeg() {
        assert_eq!(content_type_for(MediaKind::Image, "a.png"), "image/jpeg");
        assert_eq!(content_type_for(MediaKind::Image, "a.jpg"), "image/jpeg");
    }

    #[tokio::test]
    async fn successful_analysis_returns_the_output() {
        let router = Router::new().route(
            "/api/process/image",
            post(|| async { Json(serde_json::json!({"success": true, "output": "synthetic: 0.92"})) }),
        );
        let base = serve(router).await;
        let (_dir, file) = temp_media("photo.jpg");

        let output = AnalysisClient::new()
            .submit(&file, MediaKind::Image, &base)
            .await
            .unwrap();
        assert_eq!(output, "synthetic: 0.92");
    }

    #[tokio::test]
    async fn upload_is_one_part_named_file_with_the_derived_mime() {
        async fn describe(mut multipart: Multipart) -> Json<serde_json::Value> {
            let field = multipart.next_field().await.unwrap().unwrap();
            let description = format!(
                "{} {} {}",
                field.name().unwrap_or_default(),
                field.file_name().unwrap_or_default(),
                field.content_type().unwrap_or_default()
            );
            Json(serde_json::json!({"success": true, "output": description}))
        }

        let router = Router::new().route("/api/process/audio", post(describe));
        let base = serve(router).await;
        let (_dir, file) = temp_media("voice.wav");

        let output = AnalysisClient::new()
            .submit(&file, MediaKind::Audio, &base)
            .await
            .unwrap();
        assert_eq!(output, "file voice.wav audio/wav");
    }

    #[tokio::test]
    async fn non_success_status_carries_code_and_body() {
        let router = Router::new().route(
            "/api/process/image",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "internal error") }),
        );
        let base = serve(router).await;
        let (_dir, file) = temp_media("photo.jpg");

        let err = AnalysisClient::new()
            .submit(&file, MediaKind::Image, &base)
            .await
            .unwrap_err();
        match err {
            VeriscopeError::ServerError { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("internal error"));
            }
            other => panic!("expected ServerError, got {other}"),
        }
    }

    #[tokio::test]
    async fn declined_analysis_is_a_processing_failure() {
        let router = Router::new().route(
            "/api/process/image",
            post(|| async { Json(serde_json::json!({"success": false, "error": "low confidence"})) }),
        );
        let base = serve(router).await;
        let (_dir, file) = temp_media("photo.jpg");

        let err = AnalysisClient::new()
            .submit(&file, MediaKind::Image, &base)
            .await
            .unwrap_err();
        match err {
            VeriscopeError::ProcessingFailed(message) => assert_eq!(message, "low confidence"),
            other => panic!("expected ProcessingFailed, got {other}"),
        }
    }

    #[tokio::test]
    async fn declined_analysis_without_a_message_gets_a_generic_one() {
        let router = Router::new().route(
            "/api/process/image",
            post(|| async { Json(serde_json::json!({"success": false})) }),
        );
        let base = serve(router).await;
        let (_dir, file) = temp_media("photo.jpg");

        let err = AnalysisClient::new()
            .submit(&file, MediaKind::Image, &base)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VeriscopeError::ProcessingFailed(message) if message == "Processing failed"
        ));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let router = Router::new().route(
            "/api/process/image",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({"success": true, "output": "late"}))
            }),
        );
        let base = serve(router).await;
        let (_dir, file) = temp_media("photo.jpg");

        let err = AnalysisClient::with_timeout(Duration::from_millis(200))
            .submit(&file, MediaKind::Image, &base)
            .await
            .unwrap_err();
        assert!(matches!(err, VeriscopeError::Timeout));
    }

    #[tokio::test]
    async fn health_check_reports_the_server_status() {
        let router = Router::new().route(
            "/",
            get(|| async { Json(serde_json::json!({"status": "running"})) }),
        );
        let base = serve(router).await;

        let status = AnalysisClient::new().health_check(&base).await.unwrap();
        assert_eq!(status, "running");
    }
}
