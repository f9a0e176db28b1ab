//! recap-types: Shared data model for the upload → transcribe → summarize pipeline.

mod error;
mod media;

pub use error::{PipelineError, SummarizationError, TranscriptionError};
pub use media::{
    AUDIO_EXTENSIONS, VIDEO_EXTENSIONS, extension_of, is_supported_extension, mime_for_extension,
    supported_extensions_hint,
};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// An upload staged in temporary storage, owned by the pipeline for the
/// duration of one request.
#[derive(Debug, Clone)]
pub struct UploadedMedia {
    /// Path of the staged copy in the upload directory.
    pub path: PathBuf,
    /// Filename as sent by the client.
    pub original_filename: String,
    /// MIME type declared by the client (not trusted for validation).
    pub mime_type: String,
    /// Size of the staged file in bytes.
    pub size_bytes: u64,
}

/// Mono 16 kHz audio derived from an upload the transcription engine
/// cannot take directly. Same lifetime as the upload it came from.
#[derive(Debug, Clone)]
pub struct NormalizedAudio {
    pub path: PathBuf,
}

/// Output of a successful transcription. Immutable once produced.
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    /// Transcribed text. Invariant: non-empty after trimming whitespace.
    pub text: String,
    /// Duration of the source audio in seconds, when the engine reports it.
    pub duration_seconds: Option<f64>,
    /// Overall confidence in 0..1, when the engine reports it.
    pub confidence: Option<f64>,
    /// Detected or hinted language code.
    pub language_code: Option<String>,
}

impl TranscriptResult {
    /// Whitespace-split word count of the transcript.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Output of the summarization stage.
#[derive(Debug, Clone)]
pub struct SummaryResult {
    pub text: String,
    /// True when this is the deterministic degraded summary substituted
    /// after a summarizer failure, rather than model output.
    pub fallback: bool,
}

impl SummaryResult {
    pub fn from_model(text: String) -> Self {
        Self {
            text,
            fallback: false,
        }
    }

    pub fn degraded(text: String) -> Self {
        Self {
            text,
            fallback: true,
        }
    }
}

/// Successful response body for `POST /transcribe`. Constructed once per
/// request, never mutated after being sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub success: bool,
    pub transcript: String,
    pub summary: String,
    #[serde(rename = "wordCount")]
    pub word_count: usize,
    /// Duration of the source audio in seconds, omitted when unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Error response body, shared by every failure path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_splits_on_whitespace() {
        let t = TranscriptResult {
            text: "  hello   world\nthis is\tfive  ".to_string(),
            duration_seconds: None,
            confidence: None,
            language_code: None,
        };
        assert_eq!(t.word_count(), 5);
    }

    #[test]
    fn test_response_uses_camel_case_word_count() {
        let resp = PipelineResponse {
            success: true,
            transcript: "hi there".to_string(),
            summary: "greeting".to_string(),
            word_count: 2,
            duration: Some(1.5),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["wordCount"], 2);
        assert_eq!(json["duration"], 1.5);
        assert!(json.get("word_count").is_none());
    }

    #[test]
    fn test_response_omits_missing_duration() {
        let resp = PipelineResponse {
            success: true,
            transcript: "hi".to_string(),
            summary: "hi".to_string(),
            word_count: 1,
            duration: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("duration").is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_value(ErrorResponse::new("No file uploaded")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No file uploaded");
    }
}
