//! AssemblyAI transcription engine.
//!
//! Three-step REST flow: upload the bytes, create a transcript job, poll
//! until it completes. AssemblyAI extracts audio from video containers
//! itself, so this engine accepts every supported extension directly.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use recap_types::{TranscriptResult, TranscriptionError, is_supported_extension};

use crate::types::TranscriptionEngine;

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com/v2";
const POLL_INTERVAL: Duration = Duration::from_secs(3);

pub struct AssemblyAiEngine {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    /// Deadline for the whole transcription, polling included.
    deadline: Duration,
}

impl AssemblyAiEngine {
    pub fn new(api_key: String, deadline: Duration) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string(), deadline)
    }

    pub fn with_base_url(api_key: String, base_url: String, deadline: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            deadline,
        }
    }

    async fn upload(&self, bytes: Vec<u8>) -> Result<String, TranscriptionError> {
        let resp = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("authorization", &self.api_key)
            .body(bytes)
            .send()
            .await
            .map_err(|e| TranscriptionError::EngineUnavailable(format!("upload: {e}")))?;

        let resp = check_status(resp).await?;
        let uploaded: UploadResponse = resp
            .json()
            .await
            .map_err(|e| TranscriptionError::EngineError(format!("parse upload response: {e}")))?;
        Ok(uploaded.upload_url)
    }

    async fn create_transcript(
        &self,
        audio_url: &str,
        language: Option<&str>,
    ) -> Result<String, TranscriptionError> {
        let mut body = serde_json::json!({
            "audio_url": audio_url,
            "speech_model": "best",
            "punctuate": true,
            "format_text": true,
        });
        // A caller-supplied hint wins over provider-side detection.
        match language {
            Some(code) => body["language_code"] = serde_json::json!(code),
            None => body["language_detection"] = serde_json::json!(true),
        }

        let resp = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TranscriptionError::EngineUnavailable(format!("create transcript: {e}")))?;

        let resp = check_status(resp).await?;
        let envelope: TranscriptEnvelope = resp
            .json()
            .await
            .map_err(|e| TranscriptionError::EngineError(format!("parse transcript response: {e}")))?;
        Ok(envelope.id)
    }

    async fn poll(&self, id: &str) -> Result<TranscriptEnvelope, TranscriptionError> {
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            let resp = self
                .client
                .get(format!("{}/transcript/{id}", self.base_url))
                .header("authorization", &self.api_key)
                .send()
                .await
                .map_err(|e| TranscriptionError::EngineUnavailable(format!("poll: {e}")))?;

            let resp = check_status(resp).await?;
            let envelope: TranscriptEnvelope = resp.json().await.map_err(|e| {
                TranscriptionError::EngineError(format!("parse transcript status: {e}"))
            })?;

            match envelope.status.as_str() {
                "completed" => return Ok(envelope),
                "error" => {
                    return Err(TranscriptionError::EngineError(
                        envelope
                            .error
                            .unwrap_or_else(|| "provider reported an unspecified error".to_string()),
                    ));
                }
                status => tracing::debug!(id, status, "transcript still processing"),
            }
        }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Deserialize)]
struct TranscriptEnvelope {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    audio_duration: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, TranscriptionError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        Err(TranscriptionError::EngineUnavailable(format!(
            "auth failure ({status}): {body}"
        )))
    } else {
        Err(TranscriptionError::EngineError(format!(
            "status {status}: {body}"
        )))
    }
}

#[async_trait]
impl TranscriptionEngine for AssemblyAiEngine {
    fn id(&self) -> &str {
        "assemblyai"
    }

    fn accepts_extension(&self, extension: &str) -> bool {
        is_supported_extension(extension)
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptResult, TranscriptionError> {
        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| TranscriptionError::EngineError(format!("read staged audio: {e}")))?;

        let work = async {
            let audio_url = self.upload(bytes).await?;
            let id = self.create_transcript(&audio_url, language).await?;
            tracing::debug!(id = %id, "transcript job created");
            self.poll(&id).await
        };

        let envelope = tokio::time::timeout(self.deadline, work).await.map_err(|_| {
            TranscriptionError::EngineUnavailable(format!(
                "transcription did not complete within {:?}",
                self.deadline
            ))
        })??;

        let text = envelope.text.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(TranscriptionError::NoSpeechDetected);
        }

        tracing::info!(
            chars = text.len(),
            duration = envelope.audio_duration,
            "AssemblyAI transcription completed"
        );

        Ok(TranscriptResult {
            text: text.trim().to_string(),
            duration_seconds: envelope.audio_duration,
            confidence: envelope.confidence,
            language_code: envelope.language_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AssemblyAiEngine {
        AssemblyAiEngine::new("key".into(), Duration::from_secs(1))
    }

    #[test]
    fn test_accepts_audio_and_video_directly() {
        let e = engine();
        assert!(e.accepts_extension("wav"));
        assert!(e.accepts_extension("mp4"));
        assert!(e.accepts_extension("mkv"));
        assert!(!e.accepts_extension("xyz"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let e = AssemblyAiEngine::with_base_url(
            "key".into(),
            "https://api.example/v2/".into(),
            Duration::from_secs(1),
        );
        assert_eq!(e.base_url, "https://api.example/v2");
    }

    #[test]
    fn test_envelope_parses_completed_payload() {
        let json = r#"{
            "id": "abc",
            "status": "completed",
            "text": "hello world",
            "audio_duration": 30.0,
            "confidence": 0.93,
            "language_code": "en_us"
        }"#;
        let envelope: TranscriptEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.status, "completed");
        assert_eq!(envelope.text.as_deref(), Some("hello world"));
        assert_eq!(envelope.audio_duration, Some(30.0));
    }

    #[test]
    fn test_envelope_tolerates_sparse_payload() {
        let envelope: TranscriptEnvelope =
            serde_json::from_str(r#"{"id": "abc", "status": "queued"}"#).unwrap();
        assert!(envelope.text.is_none());
        assert!(envelope.error.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_engine_error() {
        let err = engine()
            .transcribe(Path::new("/nonexistent/audio.wav"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::EngineError(_)));
    }
}
