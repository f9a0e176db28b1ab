//! Local whisper.cpp transcription engine.
//!
//! Spawns the configured whisper binary on an already-normalized WAV and
//! parses its JSON segment output. Only WAV is accepted, which forces the
//! pipeline to normalize everything else first.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use recap_types::{TranscriptResult, TranscriptionError};

use crate::types::TranscriptionEngine;

pub struct WhisperLocalEngine {
    binary: PathBuf,
    model: PathBuf,
    timeout: Duration,
}

impl WhisperLocalEngine {
    pub fn new(binary: PathBuf, model: PathBuf, timeout: Duration) -> Self {
        Self {
            binary,
            model,
            timeout,
        }
    }
}

/// Parse whisper.cpp `--output-format json` stdout: one JSON object per
/// line, each carrying a `text` field for its segment.
fn parse_segments(stdout: &str) -> Result<String, TranscriptionError> {
    let mut pieces = Vec::new();
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let segment: serde_json::Value = serde_json::from_str(line).map_err(|e| {
            TranscriptionError::EngineError(format!("failed to parse transcription output: {e}"))
        })?;
        if let Some(text) = segment.get("text").and_then(|t| t.as_str()) {
            let text = text.trim();
            if !text.is_empty() {
                pieces.push(text.to_string());
            }
        }
    }
    Ok(pieces.join(" "))
}

#[async_trait]
impl TranscriptionEngine for WhisperLocalEngine {
    fn id(&self) -> &str {
        "whisper-local"
    }

    fn accepts_extension(&self, extension: &str) -> bool {
        extension == "wav"
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptResult, TranscriptionError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-f")
            .arg(audio)
            .arg("-m")
            .arg(&self.model)
            .arg("--task")
            .arg("transcribe")
            .arg("--output-format")
            .arg("json")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(code) = language {
            cmd.arg("--language").arg(code);
        }

        let child = cmd.spawn().map_err(|e| {
            TranscriptionError::EngineUnavailable(format!(
                "failed to start {}: {e}",
                self.binary.display()
            ))
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                TranscriptionError::EngineUnavailable(format!(
                    "transcription did not complete within {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e| TranscriptionError::EngineError(format!("whisper process: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionError::EngineError(format!(
                "whisper exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = parse_segments(&stdout)?;
        if text.trim().is_empty() {
            return Err(TranscriptionError::NoSpeechDetected);
        }

        tracing::info!(chars = text.len(), "local whisper transcription completed");

        Ok(TranscriptResult {
            text,
            duration_seconds: None,
            confidence: None,
            language_code: language.map(String::from),
        })
    }
}
