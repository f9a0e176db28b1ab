//! OpenAI Whisper API transcription engine.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;

use recap_types::{TranscriptResult, TranscriptionError, mime_for_extension};

use crate::types::TranscriptionEngine;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Formats the Whisper endpoint takes without conversion.
const ACCEPTED_EXTENSIONS: &[&str] = &[
    "flac", "m4a", "mp3", "mp4", "mpeg", "mpga", "oga", "ogg", "wav", "webm",
];

pub struct WhisperApiEngine {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl WhisperApiEngine {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self::with_options(
            api_key,
            DEFAULT_BASE_URL.to_string(),
            "whisper-1".to_string(),
            timeout,
        )
    }

    pub fn with_options(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
        }
    }

    async fn request(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<serde_json::Value, TranscriptionError> {
        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| TranscriptionError::EngineError(format!("read staged audio: {e}")))?;

        let ext = audio
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "wav".to_string());
        let part = multipart::Part::bytes(bytes)
            .file_name(format!("audio.{ext}"))
            .mime_str(mime_for_extension(&ext))
            .map_err(|e| TranscriptionError::EngineError(format!("mime: {e}")))?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(code) = language {
            form = form.text("language", code.to_string());
        }

        tracing::debug!(model = %self.model, "sending audio to Whisper API");

        let resp = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::EngineUnavailable(format!("request: {e}")))?;

        let status = resp.status();
        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TranscriptionError::EngineError(format!("parse response: {e}")))?;

        if !status.is_success() {
            let msg = json
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    TranscriptionError::EngineUnavailable(format!("auth failure ({status}): {msg}"))
                } else {
                    TranscriptionError::EngineError(format!("status {status}: {msg}"))
                },
            );
        }

        Ok(json)
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperApiEngine {
    fn id(&self) -> &str {
        "whisper-api"
    }

    fn accepts_extension(&self, extension: &str) -> bool {
        ACCEPTED_EXTENSIONS.contains(&extension)
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptResult, TranscriptionError> {
        let json = tokio::time::timeout(self.timeout, self.request(audio, language))
            .await
            .map_err(|_| {
                TranscriptionError::EngineUnavailable(format!(
                    "transcription did not complete within {:?}",
                    self.timeout
                ))
            })??;

        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(TranscriptionError::NoSpeechDetected);
        }

        tracing::info!(chars = text.len(), "Whisper API transcription completed");

        Ok(TranscriptResult {
            text,
            duration_seconds: json.get("duration").and_then(|d| d.as_f64()),
            confidence: None,
            language_code: json
                .get("language")
                .and_then(|l| l.as_str())
                .map(String::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> WhisperApiEngine {
        WhisperApiEngine::new("key".into(), Duration::from_secs(1))
    }

    #[test]
    fn test_accepts_common_audio_but_not_exotic_video() {
        let e = engine();
        assert!(e.accepts_extension("wav"));
        assert!(e.accepts_extension("mp3"));
        assert!(e.accepts_extension("mp4"));
        // These force normalization through ffmpeg first.
        assert!(!e.accepts_extension("mkv"));
        assert!(!e.accepts_extension("avi"));
        assert!(!e.accepts_extension("wmv"));
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
