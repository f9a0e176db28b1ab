//! Supported media extensions and MIME lookup.

use std::path::Path;

/// Audio extensions accepted by the upload endpoint.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "flac", "aac", "ogg", "wma"];

/// Video container extensions accepted by the upload endpoint.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "wmv", "flv", "m4v"];

/// Lowercased extension of a client-supplied filename, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_supported_extension(extension: &str) -> bool {
    AUDIO_EXTENSIONS.contains(&extension) || VIDEO_EXTENSIONS.contains(&extension)
}

/// Human-readable allowed set, used in validation error messages.
pub fn supported_extensions_hint() -> String {
    format!(
        "Please upload an audio file (.{}) or video file (.{})",
        AUDIO_EXTENSIONS.join(", ."),
        VIDEO_EXTENSIONS.join(", .")
    )
}

/// MIME type for a known extension, `application/octet-stream` otherwise.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "ogg" => "audio/ogg",
        "wma" => "audio/x-ms-wma",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "m4v" => "video/x-m4v",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of_lowercases() {
        assert_eq!(extension_of("Talk.MP4"), Some("mp4".to_string()));
        assert_eq!(extension_of("voice note.wav"), Some("wav".to_string()));
        assert_eq!(extension_of("noext"), None);
    }

    #[test]
    fn test_supported_sets() {
        assert!(is_supported_extension("mp3"));
        assert!(is_supported_extension("mkv"));
        assert!(!is_supported_extension("xyz"));
        assert!(!is_supported_extension("txt"));
    }

    #[test]
    fn test_hint_names_both_sets() {
        let hint = supported_extensions_hint();
        assert!(hint.contains(".wav"));
        assert!(hint.contains(".mp4"));
    }

    #[test]
    fn test_mime_lookup() {
        assert_eq!(mime_for_extension("wav"), "audio/wav");
        assert_eq!(mime_for_extension("mov"), "video/quicktime");
        assert_eq!(mime_for_extension("xyz"), "application/octet-stream");
    }
}
