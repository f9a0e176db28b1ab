//! recap-pipeline: drives one upload through
//! validate → normalize → transcribe → summarize and assembles the
//! response, with unconditional cleanup of temporary artifacts.
//!
//! Stages run strictly in order, each at most once per request. There is
//! no automatic retry; a client retries by re-issuing the HTTP request.

use std::sync::Arc;
use std::time::Duration;

use recap_media::store::{TempFile, UploadStore};
use recap_media::{MediaError, normalize_to_wav};
use recap_providers::summarize::{PromptContext, build_summary_prompt};
use recap_providers::types::{SummaryModel, TranscriptionEngine};
use recap_types::{
    PipelineError, PipelineResponse, SummaryResult, TranscriptionError, UploadedMedia,
    extension_of, is_supported_extension, supported_extensions_hint,
};

/// One upload as received by the endpoint, before staging.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
    /// Optional language hint from the form.
    pub language: Option<String>,
}

/// Pipeline stages in execution order. `Failed` is implicit: any error
/// return is terminal and carries the stage it happened in via logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    Validated,
    Normalized,
    Transcribed,
    Summarized,
    Completed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Normalized => "normalized",
            Stage::Transcribed => "transcribed",
            Stage::Summarized => "summarized",
            Stage::Completed => "completed",
        }
    }
}

/// Character budget of the degraded summary.
pub const FALLBACK_SUMMARY_CHARS: usize = 500;

/// Deterministic substitute summary used when the summarization call
/// fails: a prefix of the transcript. The transcript was already paid for
/// with the transcription call, so the request still succeeds.
pub fn fallback_summary(transcript: &str) -> String {
    let truncated: String = transcript.chars().take(FALLBACK_SUMMARY_CHARS).collect();
    format!("Summary: {truncated}...")
}

/// The orchestrator. Holds the provider clients and the staging store;
/// no other state survives a request.
#[derive(Clone)]
pub struct Pipeline {
    engine: Arc<dyn TranscriptionEngine>,
    summarizer: Arc<dyn SummaryModel>,
    store: UploadStore,
    ffmpeg_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        engine: Arc<dyn TranscriptionEngine>,
        summarizer: Arc<dyn SummaryModel>,
        store: UploadStore,
        ffmpeg_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            summarizer,
            store,
            ffmpeg_timeout,
        }
    }

    /// Run one upload through the pipeline. Temporary files staged for the
    /// request are deleted on every exit path, including cancellation.
    pub async fn run(&self, upload: UploadPayload) -> Result<PipelineResponse, PipelineError> {
        let started = std::time::Instant::now();
        let mut stage = Stage::Received;

        let result = self.execute(&upload, &mut stage).await;
        match &result {
            Ok(resp) => tracing::info!(
                words = resp.word_count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "pipeline completed"
            ),
            Err(e) => tracing::error!(stage = stage.as_str(), error = %e, "pipeline failed"),
        }
        result
    }

    async fn execute(
        &self,
        upload: &UploadPayload,
        stage: &mut Stage,
    ) -> Result<PipelineResponse, PipelineError> {
        // Validation happens before anything touches disk or the network,
        // so bad requests never spend provider quota.
        let extension = validate_upload(upload)?;
        *stage = Stage::Validated;

        let staged = self
            .store
            .stage(&upload.bytes, &extension)
            .await
            .map_err(|e| PipelineError::Internal(format!("stage upload: {e}")))?;
        let media = UploadedMedia {
            path: staged.path().to_path_buf(),
            original_filename: upload.filename.clone(),
            mime_type: upload.mime_type.clone(),
            size_bytes: upload.bytes.len() as u64,
        };
        tracing::info!(
            file = %media.original_filename,
            bytes = media.size_bytes,
            engine = self.engine.id(),
            "upload staged"
        );

        // Normalization is skipped when the engine takes the source as-is.
        let mut normalized: Option<TempFile> = None;
        let audio_path = if self.engine.accepts_extension(&extension) {
            media.path.clone()
        } else {
            let output = self.store.reserve("wav");
            normalize_to_wav(&media.path, output.path(), self.ffmpeg_timeout)
                .await
                .map_err(map_media_error)?;
            *stage = Stage::Normalized;
            let path = output.path().to_path_buf();
            normalized = Some(output);
            path
        };
        // Keep the guard alive until the end of the request.
        let _normalized = normalized;

        let transcript = self
            .engine
            .transcribe(&audio_path, upload.language.as_deref())
            .await?;
        if transcript.text.trim().is_empty() {
            // Engines enforce this themselves; the orchestrator still never
            // lets an empty transcript become a success response.
            return Err(TranscriptionError::NoSpeechDetected.into());
        }
        *stage = Stage::Transcribed;

        let ctx = PromptContext {
            duration_seconds: transcript.duration_seconds,
            language_code: transcript.language_code.clone(),
        };
        let prompt = build_summary_prompt(&transcript.text, &ctx);
        let summary = match self.summarizer.summarize(&prompt).await {
            Ok(text) => SummaryResult::from_model(text),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = true,
                    "summarization failed, substituting transcript truncation"
                );
                SummaryResult::degraded(fallback_summary(&transcript.text))
            }
        };
        *stage = Stage::Summarized;

        let response = PipelineResponse {
            success: true,
            word_count: transcript.word_count(),
            duration: transcript.duration_seconds,
            transcript: transcript.text,
            summary: summary.text,
        };
        *stage = Stage::Completed;
        Ok(response)
        // `staged` and `_normalized` drop here; their files are removed
        // whether we got this far or bailed out above.
    }
}

fn validate_upload(upload: &UploadPayload) -> Result<String, PipelineError> {
    if upload.bytes.is_empty() {
        return Err(PipelineError::Validation("Uploaded file is empty".to_string()));
    }
    let extension = extension_of(&upload.filename).ok_or_else(|| {
        PipelineError::Validation(format!(
            "Invalid file type: {}. {}",
            upload.filename,
            supported_extensions_hint()
        ))
    })?;
    if !is_supported_extension(&extension) {
        return Err(PipelineError::Validation(format!(
            "Invalid file type: .{extension}. {}",
            supported_extensions_hint()
        )));
    }
    Ok(extension)
}

fn map_media_error(e: MediaError) -> PipelineError {
    match e {
        MediaError::Decode(detail) => PipelineError::MediaDecode(detail),
        MediaError::Timeout(t) => {
            PipelineError::Internal(format!("media conversion timed out after {t:?}"))
        }
        MediaError::Io(e) => PipelineError::Internal(format!("media conversion: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use recap_types::{SummarizationError, TranscriptResult};

    struct FixedEngine {
        text: String,
        duration: Option<f64>,
        calls: AtomicUsize,
    }

    impl FixedEngine {
        fn speaking(text: &str, duration: Option<f64>) -> Self {
            Self {
                text: text.to_string(),
                duration,
                calls: AtomicUsize::new(0),
            }
        }

        fn silent() -> Self {
            Self::speaking("", None)
        }
    }

    #[async_trait]
    impl TranscriptionEngine for FixedEngine {
        fn id(&self) -> &str {
            "fixed"
        }

        fn accepts_extension(&self, _extension: &str) -> bool {
            true
        }

        async fn transcribe(
            &self,
            audio: &Path,
            _language: Option<&str>,
        ) -> Result<TranscriptResult, TranscriptionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(audio.exists(), "engine must see the staged file");
            if self.text.trim().is_empty() {
                return Err(TranscriptionError::NoSpeechDetected);
            }
            Ok(TranscriptResult {
                text: self.text.clone(),
                duration_seconds: self.duration,
                confidence: Some(0.9),
                language_code: Some("en".to_string()),
            })
        }
    }

    enum SummarizerMode {
        Reply(String),
        Fail,
    }

    struct FixedSummarizer {
        mode: SummarizerMode,
    }

    #[async_trait]
    impl SummaryModel for FixedSummarizer {
        fn id(&self) -> &str {
            "fixed"
        }

        async fn summarize(&self, prompt: &str) -> Result<String, SummarizationError> {
            assert!(prompt.contains("**Transcript:**"));
            match &self.mode {
                SummarizerMode::Reply(text) => Ok(text.clone()),
                SummarizerMode::Fail => Err(SummarizationError::Unavailable(
                    "connection timed out".to_string(),
                )),
            }
        }
    }

    fn pipeline_with(
        engine: FixedEngine,
        summarizer: FixedSummarizer,
        dir: &Path,
    ) -> (Pipeline, Arc<FixedEngine>) {
        let engine = Arc::new(engine);
        let store = UploadStore::new(dir.to_path_buf()).unwrap();
        let pipeline = Pipeline::new(
            engine.clone(),
            Arc::new(summarizer),
            store,
            Duration::from_secs(5),
        );
        (pipeline, engine)
    }

    fn upload(filename: &str) -> UploadPayload {
        UploadPayload {
            bytes: b"RIFF....WAVEdata".to_vec(),
            filename: filename.to_string(),
            mime_type: "audio/wav".to_string(),
            language: None,
        }
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_success_reports_words_and_duration() {
        let tmp = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline_with(
            FixedEngine::speaking("we shipped the release on time", Some(30.0)),
            FixedSummarizer {
                mode: SummarizerMode::Reply("Release shipped on schedule.".to_string()),
            },
            tmp.path(),
        );

        let resp = pipeline.run(upload("meeting.wav")).await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.transcript, "we shipped the release on time");
        assert_eq!(resp.summary, "Release shipped on schedule.");
        assert_eq!(resp.word_count, 6);
        assert_eq!(resp.duration, Some(30.0));
        assert!(dir_is_empty(tmp.path()), "temp files must be cleaned up");
    }

    #[tokio::test]
    async fn test_summarizer_failure_falls_back_to_truncation() {
        let tmp = tempfile::tempdir().unwrap();
        let transcript = "the quarterly review covered hiring and budget";
        let (pipeline, _) = pipeline_with(
            FixedEngine::speaking(transcript, Some(12.0)),
            FixedSummarizer {
                mode: SummarizerMode::Fail,
            },
            tmp.path(),
        );

        let resp = pipeline.run(upload("review.mp3")).await.unwrap();
        assert!(resp.success, "transcript already paid for, request succeeds");
        assert_eq!(resp.summary, fallback_summary(transcript));
        assert_eq!(resp.transcript, transcript);
        assert!(dir_is_empty(tmp.path()));
    }

    #[tokio::test]
    async fn test_silent_audio_fails_with_no_speech() {
        let tmp = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline_with(
            FixedEngine::silent(),
            FixedSummarizer {
                mode: SummarizerMode::Reply("never called".to_string()),
            },
            tmp.path(),
        );

        let err = pipeline.run(upload("silence.wav")).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Transcription(TranscriptionError::NoSpeechDetected)
        ));
        assert!(err.is_caller_fault());
        assert!(dir_is_empty(tmp.path()), "cleanup also runs on failure");
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected_before_engine_call() {
        let tmp = tempfile::tempdir().unwrap();
        let (pipeline, engine) = pipeline_with(
            FixedEngine::speaking("text", None),
            FixedSummarizer {
                mode: SummarizerMode::Reply("s".to_string()),
            },
            tmp.path(),
        );

        let err = pipeline.run(upload("document.xyz")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        let msg = err.to_string();
        assert!(msg.contains("Invalid file type: .xyz"));
        assert!(msg.contains(".wav"), "error names the allowed set");
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
        assert!(dir_is_empty(tmp.path()));
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let (pipeline, engine) = pipeline_with(
            FixedEngine::speaking("text", None),
            FixedSummarizer {
                mode: SummarizerMode::Reply("s".to_string()),
            },
            tmp.path(),
        );

        let mut payload = upload("empty.wav");
        payload.bytes.clear();
        let err = pipeline.run(payload).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fallback_summary_is_deterministic_prefix() {
        let long: String = "word ".repeat(200);
        let a = fallback_summary(&long);
        let b = fallback_summary(&long);
        assert_eq!(a, b);
        assert!(a.starts_with("Summary: word word"));
        assert!(a.ends_with("..."));
        // 500 chars of transcript plus the fixed framing.
        assert_eq!(a.chars().count(), "Summary: ".len() + FALLBACK_SUMMARY_CHARS + 3);
    }

    #[test]
    fn test_fallback_summary_respects_char_boundaries() {
        let emoji = "🎙".repeat(600);
        let summary = fallback_summary(&emoji);
        assert_eq!(
            summary.chars().filter(|c| *c == '🎙').count(),
            FALLBACK_SUMMARY_CHARS
        );
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(Stage::Received < Stage::Validated);
        assert!(Stage::Validated < Stage::Normalized);
        assert!(Stage::Normalized < Stage::Transcribed);
        assert!(Stage::Transcribed < Stage::Summarized);
        assert!(Stage::Summarized < Stage::Completed);
        assert_eq!(Stage::Completed.as_str(), "completed");
    }
}
