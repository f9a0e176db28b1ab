//! Audio normalization via an ffmpeg subprocess.
//!
//! Converts any container or codec the engine cannot take directly into
//! mono 16 kHz PCM WAV, the rate most speech engines expect. The parameters
//! are fixed; they must not vary per request.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Fixed output sample rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Fixed output channel count.
pub const TARGET_CHANNELS: u32 = 1;

#[derive(Debug, Error)]
pub enum MediaError {
    /// ffmpeg could not parse the input. The caller's file is at fault.
    #[error("{0}")]
    Decode(String),
    #[error("media conversion timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn ffmpeg_args(input: &Path, output: &Path) -> Vec<std::ffi::OsString> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        input.as_os_str().to_os_string(),
        "-ar".into(),
        TARGET_SAMPLE_RATE.to_string().into(),
        "-ac".into(),
        TARGET_CHANNELS.to_string().into(),
        "-c:a".into(),
        "pcm_s16le".into(),
        output.as_os_str().to_os_string(),
    ]
}

/// Transcode `input` into a mono 16 kHz WAV at `output`.
///
/// The child process is spawned with `kill_on_drop`, so an aborted request
/// (dropped future) or an elapsed timeout kills ffmpeg rather than leaving
/// it running against a file that is about to be deleted.
pub async fn normalize_to_wav(
    input: &Path,
    output: &Path,
    timeout: Duration,
) -> Result<(), MediaError> {
    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        "normalizing media with ffmpeg"
    );

    let child = Command::new("ffmpeg")
        .args(ffmpeg_args(input, output))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let result = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| MediaError::Timeout(timeout))??;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        let detail = stderr.trim();
        tracing::warn!(status = %result.status, detail, "ffmpeg failed");
        return Err(MediaError::Decode(if detail.is_empty() {
            format!("ffmpeg exited with {}", result.status)
        } else {
            detail.to_string()
        }));
    }

    Ok(())
}
