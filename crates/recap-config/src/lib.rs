//! recap-config: process-wide configuration, read once at startup from the
//! environment (with `.env` support) and passed by reference from there on.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Which transcription engine to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionProvider {
    AssemblyAi,
    WhisperApi,
    WhisperLocal,
}

impl TranscriptionProvider {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "assemblyai" => Some(Self::AssemblyAi),
            "whisper-api" => Some(Self::WhisperApi),
            "whisper-local" => Some(Self::WhisperLocal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssemblyAi => "assemblyai",
            Self::WhisperApi => "whisper-api",
            Self::WhisperLocal => "whisper-local",
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: u64,
    /// Allowed CORS origins; empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Directory for staged uploads and normalized audio.
    pub upload_dir: PathBuf,
}

impl ServerConfig {
    /// Upload limit in whole megabytes, for user-facing messages.
    pub fn max_upload_mb(&self) -> u64 {
        self.max_upload_bytes / (1024 * 1024)
    }
}

/// Transcription engine selection and credentials.
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub provider: TranscriptionProvider,
    pub assemblyai_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub whisper_bin: Option<PathBuf>,
    pub whisper_model: Option<PathBuf>,
    /// Deadline for one transcription call, polling included.
    pub timeout: Duration,
}

/// Summarization model configuration.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Explicit completion length limit; there is no hidden default in the client.
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Top-level configuration. Read-only after startup.
#[derive(Debug, Clone)]
pub struct RecapConfig {
    pub server: ServerConfig,
    pub transcription: TranscriptionConfig,
    pub summary: SummaryConfig,
    /// Deadline for one ffmpeg normalization run.
    pub ffmpeg_timeout: Duration,
}

fn default_port() -> u16 {
    3001
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_max_upload_mb() -> u64 {
    100
}

fn default_summary_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_summary_model() -> String {
    "anthropic/claude-3.5-sonnet".to_string()
}

fn default_summary_max_tokens() -> u32 {
    500
}

fn default_upload_dir() -> PathBuf {
    std::env::temp_dir().join("recap-uploads")
}

/// Load configuration from the process environment, reading `.env` first
/// if present.
pub fn load_config() -> Result<RecapConfig, ConfigError> {
    let _ = dotenvy::dotenv();
    let vars: HashMap<String, String> = std::env::vars().collect();
    RecapConfig::from_vars(&vars)
}

impl RecapConfig {
    /// Build a config from an explicit variable map. `load_config` feeds the
    /// real environment through here; tests feed fixed maps.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: "PORT",
                value: raw,
            })?,
            None => default_port(),
        };

        let max_upload_mb = match get("MAX_UPLOAD_MB") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: "MAX_UPLOAD_MB",
                value: raw,
            })?,
            None => default_max_upload_mb(),
        };

        let provider = match get("TRANSCRIPTION_PROVIDER") {
            Some(raw) => {
                TranscriptionProvider::parse(&raw).ok_or(ConfigError::InvalidVar {
                    var: "TRANSCRIPTION_PROVIDER",
                    value: raw,
                })?
            }
            None => TranscriptionProvider::AssemblyAi,
        };

        let server = ServerConfig {
            host: get("HOST").unwrap_or_else(default_host),
            port,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_upload_dir),
        };

        let transcription = TranscriptionConfig {
            provider,
            assemblyai_api_key: get("ASSEMBLYAI_API_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            whisper_bin: get("WHISPER_BIN").map(PathBuf::from),
            whisper_model: get("WHISPER_MODEL").map(PathBuf::from),
            timeout: duration_var(&get, "TRANSCRIBE_TIMEOUT_SECS", 600)?,
        };

        let summary = SummaryConfig {
            api_key: get("OPENROUTER_API_KEY").unwrap_or_default(),
            base_url: get("OPENROUTER_BASE_URL").unwrap_or_else(default_summary_base_url),
            model: get("SUMMARY_MODEL").unwrap_or_else(default_summary_model),
            max_tokens: match get("SUMMARY_MAX_TOKENS") {
                Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                    var: "SUMMARY_MAX_TOKENS",
                    value: raw,
                })?,
                None => default_summary_max_tokens(),
            },
            timeout: duration_var(&get, "SUMMARY_TIMEOUT_SECS", 60)?,
        };

        Ok(Self {
            server,
            transcription,
            summary,
            ffmpeg_timeout: duration_var(&get, "FFMPEG_TIMEOUT_SECS", 300)?,
        })
    }

    /// Reject configurations whose selected providers have no credentials,
    /// so misconfiguration surfaces at startup rather than mid-request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.transcription.provider {
            TranscriptionProvider::AssemblyAi => {
                if self.transcription.assemblyai_api_key.is_none() {
                    return Err(ConfigError::MissingVar("ASSEMBLYAI_API_KEY"));
                }
            }
            TranscriptionProvider::WhisperApi => {
                if self.transcription.openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar("OPENAI_API_KEY"));
                }
            }
            TranscriptionProvider::WhisperLocal => {
                if self.transcription.whisper_bin.is_none() {
                    return Err(ConfigError::MissingVar("WHISPER_BIN"));
                }
                if self.transcription.whisper_model.is_none() {
                    return Err(ConfigError::MissingVar("WHISPER_MODEL"));
                }
            }
        }
        if self.summary.api_key.is_empty() {
            return Err(ConfigError::MissingVar("OPENROUTER_API_KEY"));
        }
        Ok(())
    }
}

fn duration_var(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    match get(var) {
        Some(raw) => {
            let secs: u64 = raw
                .parse()
                .map_err(|_| ConfigError::InvalidVar { var, value: raw })?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(Duration::from_secs(default_secs)),
    }
}
