//! Provider traits.

use std::path::Path;

use async_trait::async_trait;

use recap_types::{SummarizationError, TranscriptResult, TranscriptionError};

/// Speech-to-text capability. Implementations must be idempotent from the
/// caller's perspective: the same audio submitted twice yields an
/// equivalent transcript.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Provider identifier, for logs.
    fn id(&self) -> &str;

    /// Whether a file with this extension can be submitted directly. When
    /// false, the pipeline normalizes to WAV first.
    fn accepts_extension(&self, extension: &str) -> bool;

    /// Transcribe the audio file at `audio`. A successful result always
    /// carries non-empty text; empty speech is `NoSpeechDetected`.
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptResult, TranscriptionError>;
}

/// Text summarization capability. The client only reports success or a
/// typed failure; fallback policy lives in the orchestrator.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    /// Model/provider identifier, for logs.
    fn id(&self) -> &str;

    /// Produce a summary for an already-built prompt.
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizationError>;
}
