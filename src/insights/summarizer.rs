use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::LlmConfig;

pub const SYSTEM_PROMPT: &str = "You are an expert at analyzing customer reviews and extracting actionable insights. Respond in JSON format only.";

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("network: {0}")]
    Net(#[from] reqwest::Error),
    #[error("upstream status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream response had no completion text")]
    EmptyCompletion,
    #[error("unparseable summary: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Narrative fields returned by the external service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AiSummary {
    pub summary: String,
    pub key_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub insights: Vec<String>,
}

/// Text-completion seam: a prompt goes in, raw completion text comes out.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str) -> Result<String, InsightError>;
}

/// Remove an optional Markdown code fence (```` ```json ... ``` ````) around the payload.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    }
    if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Fence-strip and decode a completion into an [`AiSummary`].
pub fn parse_summary(raw: &str) -> Result<AiSummary, InsightError> {
    Ok(serde_json::from_str(strip_code_fence(raw))?)
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Debug, Clone)]
pub struct ChatCompletionsSummarizer {
    base_url: String,
    http: Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

impl ChatCompletionsSummarizer {
    /// `None` when no API key is configured.
    pub fn from_config(cfg: &LlmConfig) -> Result<Option<Self>, InsightError> {
        let Some(api_key) = cfg.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };
        let http = Client::builder()
            .user_agent(concat!("feedback-vault/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Some(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            http,
            api_key,
            model: cfg.model.clone(),
        }))
    }

    fn completion_text(body: &Value) -> Option<String> {
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
    }
}

#[async_trait]
impl Summarizer for ChatCompletionsSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, InsightError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InsightError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }
        let body: Value = resp.json().await?;
        Self::completion_text(&body).ok_or(InsightError::EmptyCompletion)
    }
}
