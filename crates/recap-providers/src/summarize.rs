//! Transcript summarization via an OpenRouter-compatible chat completions
//! API, plus the deterministic prompt builder.

use std::time::Duration;

use async_trait::async_trait;

use recap_types::SummarizationError;

use crate::types::SummaryModel;

/// Transcript metadata folded into the prompt for context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    pub duration_seconds: Option<f64>,
    pub language_code: Option<String>,
}

/// Build the summarization prompt.
///
/// Pure function of its inputs: the same transcript and context always
/// produce a byte-identical string, so prompts are reproducible in tests
/// and across retries of the whole request.
pub fn build_summary_prompt(transcript: &str, ctx: &PromptContext) -> String {
    let mut prompt = String::from(
        "Please analyze this transcript and provide a comprehensive summary in bullet points. \
         Focus on the main topics, key insights, and important details:\n\n",
    );

    if let Some(secs) = ctx.duration_seconds {
        prompt.push_str(&format!("The recording is {secs:.0} seconds long.\n"));
    }
    if let Some(lang) = &ctx.language_code {
        prompt.push_str(&format!("The transcript language is {lang}.\n"));
    }
    if ctx.duration_seconds.is_some() || ctx.language_code.is_some() {
        prompt.push('\n');
    }

    prompt.push_str("**Transcript:**\n");
    prompt.push_str(transcript);
    prompt.push_str(
        "\n\n**Please provide:**\n\
         - **Main Topic/Theme:** What is this content primarily about?\n\
         - **Key Points:** What are the most important points discussed?\n\
         - **Important Details:** Any specific facts, numbers, or conclusions mentioned?\n\
         - **Actionable Items:** Any tasks, recommendations, or next steps mentioned?\n\
         - **Summary:** A brief overall summary in 1-2 sentences\n\n\
         Keep it well-organized and comprehensive while being concise.",
    );
    prompt
}

const DEFAULT_TEMPERATURE: f64 = 0.3;

pub struct OpenRouterSummarizer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    /// Explicit completion length limit. Passed through verbatim; this
    /// client never truncates output on its own.
    max_tokens: u32,
    timeout: Duration,
}

impl OpenRouterSummarizer {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens,
            timeout,
        }
    }

    async fn request(&self, prompt: &str) -> Result<String, SummarizationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": self.max_tokens,
            "temperature": DEFAULT_TEMPERATURE,
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SummarizationError::Unavailable(format!("request: {e}")))?;

        let status = resp.status();
        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SummarizationError::Provider(format!("parse response: {e}")))?;

        if !status.is_success() {
            let msg = json
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    SummarizationError::Unavailable(format!("auth failure ({status}): {msg}"))
                } else {
                    SummarizationError::Provider(format!("status {status}: {msg}"))
                },
            );
        }

        let content = json
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .unwrap_or("")
            .trim();
        if content.is_empty() {
            return Err(SummarizationError::Provider("empty completion".to_string()));
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl SummaryModel for OpenRouterSummarizer {
    fn id(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, prompt: &str) -> Result<String, SummarizationError> {
        let summary = tokio::time::timeout(self.timeout, self.request(prompt))
            .await
            .map_err(|_| {
                SummarizationError::Unavailable(format!(
                    "summarization did not complete within {:?}",
                    self.timeout
                ))
            })??;

        tracing::info!(model = %self.model, chars = summary.len(), "summary generated");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_deterministic() {
        let ctx = PromptContext {
            duration_seconds: Some(30.2),
            language_code: Some("en".to_string()),
        };
        let a = build_summary_prompt("we discussed the roadmap", &ctx);
        let b = build_summary_prompt("we discussed the roadmap", &ctx);
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_contains_transcript_and_context() {
        let ctx = PromptContext {
            duration_seconds: Some(30.0),
            language_code: None,
        };
        let prompt = build_summary_prompt("quarterly numbers looked strong", &ctx);
        assert!(prompt.contains("quarterly numbers looked strong"));
        assert!(prompt.contains("30 seconds long"));
        assert!(prompt.contains("**Transcript:**"));
    }

    #[test]
    fn test_prompt_without_metadata_skips_context_block() {
        let prompt = build_summary_prompt("hello", &PromptContext::default());
        assert!(!prompt.contains("seconds long"));
        assert!(!prompt.contains("transcript language"));
    }

    #[test]
    fn test_differing_inputs_differ() {
        let base = build_summary_prompt("hello", &PromptContext::default());
        let other = build_summary_prompt(
            "hello",
            &PromptContext {
                duration_seconds: Some(5.0),
                language_code: None,
            },
        );
        assert_ne!(base, other);
    }
}
