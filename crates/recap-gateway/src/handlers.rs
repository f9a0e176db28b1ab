//! HTTP handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use recap_pipeline::UploadPayload;
use recap_types::{ErrorResponse, PipelineError};

use crate::GatewayState;

/// GET /health — liveness only, no dependency checks.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// POST /transcribe — accept the first file part of the form regardless of
/// field name (clients have sent `audio`, `video`, and `file`), plus an
/// optional `language` text field, and run the pipeline on it.
pub async fn transcribe(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    // Declared-size check before reading any of the body, so oversized
    // uploads are refused without buffering them.
    if let Some(declared) = content_length(&headers) {
        if declared > state.max_upload_bytes {
            return reject(
                StatusCode::BAD_REQUEST,
                size_limit_message(state.max_upload_bytes, declared),
            );
        }
    }

    let mut language: Option<String> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return reject(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read multipart body: {e}"),
                );
            }
        };

        if let Some(name) = field.file_name() {
            let filename = name.to_string();
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            match field.bytes().await {
                Ok(bytes) => {
                    file = Some((filename, mime_type, bytes.to_vec()));
                    break;
                }
                Err(e) => {
                    return reject(StatusCode::BAD_REQUEST, format!("Failed to read upload: {e}"));
                }
            }
        } else if field.name() == Some("language") {
            language = field.text().await.ok().filter(|s| !s.trim().is_empty());
        }
    }

    let Some((filename, mime_type, bytes)) = file else {
        return reject(StatusCode::BAD_REQUEST, "No file uploaded");
    };
    tracing::info!(file = %filename, bytes = bytes.len(), "file received");

    let payload = UploadPayload {
        bytes,
        filename,
        mime_type,
        language,
    };
    match state.pipeline.run(payload).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => reject(status_for(&e), e.to_string()),
    }
}

/// 4xx for caller-caused failures, 5xx for engine and internal ones.
fn status_for(e: &PipelineError) -> StatusCode {
    if e.is_caller_fault() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn reject(status: StatusCode, error: impl Into<String>) -> Response {
    let error = error.into();
    if status.is_server_error() {
        tracing::error!(status = %status, error = %error, "request failed");
    } else {
        tracing::warn!(status = %status, error = %error, "request rejected");
    }
    (status, Json(ErrorResponse::new(error))).into_response()
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn size_limit_message(limit: u64, received: u64) -> String {
    format!(
        "File too large. Maximum size is {}MB, received {:.1}MB. Please compress your file first.",
        limit / (1024 * 1024),
        received as f64 / 1024.0 / 1024.0
    )
}
