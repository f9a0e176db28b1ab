//! recap-providers: clients for the external transcription and
//! summarization capabilities, behind trait seams so the pipeline can be
//! tested without network access.

pub mod assemblyai;
pub mod summarize;
pub mod types;
pub mod whisper_api;
pub mod whisper_local;

pub use assemblyai::AssemblyAiEngine;
pub use summarize::{OpenRouterSummarizer, PromptContext, build_summary_prompt};
pub use types::{SummaryModel, TranscriptionEngine};
pub use whisper_api::WhisperApiEngine;
pub use whisper_local::WhisperLocalEngine;
