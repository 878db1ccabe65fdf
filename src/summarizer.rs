use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::SummarizerConfig;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const FALLBACK_LIMIT: usize = 500;
pub const NO_DESCRIPTION_PLACEHOLDER: &str = "Keine Beschreibung verfügbar.";

/// The summarization seam. Absent credential and failed call are handled
/// identically by callers: both land on [`fallback_summary`].
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Client for any OpenAI-compatible chat completions endpoint.
pub struct SummarizerClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    language: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

impl SummarizerClient {
    pub fn new(config: &SummarizerConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for SummarizerClient {
    async fn summarize(&self, text: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: format!(
                        "Fasse die folgende Videobeschreibung in wenigen Sätzen \
                         zusammen. Sprache: {}. Keine Links, keine Hashtags.",
                        self.language
                    ),
                },
                ChatMessage {
                    role: "user".into(),
                    content: text.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to call {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Summarizer API error ({}): {}", status, body);
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to parse summarizer response")?;

        body.choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("Empty response from summarizer"))
    }
}

/// Deterministic stand-in when no summarizer is configured or the call
/// failed: the first 500 characters of the description, with an ellipsis if
/// truncated. An empty description yields a fixed placeholder.
pub fn fallback_summary(description: &str) -> String {
    let description = description.trim();
    if description.is_empty() {
        return NO_DESCRIPTION_PLACEHOLDER.to_string();
    }
    let mut chars = description.char_indices();
    match chars.nth(FALLBACK_LIMIT) {
        Some((byte_idx, _)) => format!("{}...", &description[..byte_idx]),
        None => description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_empty_description() {
        assert_eq!(fallback_summary(""), NO_DESCRIPTION_PLACEHOLDER);
        assert_eq!(fallback_summary("   \n  "), NO_DESCRIPTION_PLACEHOLDER);
    }

    #[test]
    fn test_fallback_short_description_unchanged() {
        let desc = "Diese Woche: Hardware-Wallets und PSBT.";
        assert_eq!(fallback_summary(desc), desc);
    }

    #[test]
    fn test_fallback_exactly_500_unchanged() {
        let desc = "x".repeat(500);
        assert_eq!(fallback_summary(&desc), desc);
    }

    #[test]
    fn test_fallback_truncates_at_500() {
        let desc = "a".repeat(600);
        let summary = fallback_summary(&desc);
        assert_eq!(summary.len(), 503);
        assert!(summary.ends_with("..."));
        assert!(summary.starts_with(&"a".repeat(500)));
    }

    #[test]
    fn test_fallback_respects_char_boundaries() {
        let desc = "ü".repeat(600);
        let summary = fallback_summary(&desc);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), 503);
    }
}
