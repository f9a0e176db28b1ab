//! Error taxonomy for the pipeline and its provider clients.

use thiserror::Error;

/// Failures from a transcription engine.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Could not reach or authenticate against the provider. The whole
    /// request may be retried by the caller.
    #[error("transcription service unavailable: {0}")]
    EngineUnavailable(String),
    /// The engine succeeded but produced no usable text. Retrying the same
    /// input will not help.
    #[error("No speech detected in the file. Please ensure the file contains clear audio.")]
    NoSpeechDetected,
    /// The provider reported a failure for this input.
    #[error("transcription failed: {0}")]
    EngineError(String),
}

/// Failures from the summarization client. Whether to fall back or
/// propagate is the orchestrator's decision, not the client's.
#[derive(Debug, Error)]
pub enum SummarizationError {
    #[error("summarization service unavailable: {0}")]
    Unavailable(String),
    #[error("summarization failed: {0}")]
    Provider(String),
}

/// Terminal pipeline failure. Validation and decode errors are the
/// caller's fault (HTTP 4xx); the rest map to 5xx.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid media file: {0}")]
    MediaDecode(String),
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
    #[error(transparent)]
    Summarization(#[from] SummarizationError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// True when the failure indicates a problem with the request itself
    /// rather than with this service or a downstream provider.
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_)
                | PipelineError::MediaDecode(_)
                | PipelineError::Transcription(TranscriptionError::NoSpeechDetected)
        )
    }
}
