//! OpenRouter-backed [`Generator`].
//!
//! Sends one chat completion per content block and parses the model's JSON
//! reply into Q&A pairs. The request carries the block's stable key as an
//! idempotency header so a caching proxy can serve retries identically.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use sitebrief_shared::error::{Result, SiteBriefError};
use sitebrief_shared::types::QaPair;

use crate::{GenerationRequest, Generator};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

const SYSTEM_PROMPT: &str = "You turn website copy into knowledge for a voice agent. \
Given a passage, reply with a JSON array of objects with optional \"question\" \
and required \"answer\" fields. Keep answers short, factual, and speakable. \
Reply with the JSON array only.";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// [`Generator`] speaking OpenRouter's OpenAI-compatible chat API.
pub struct OpenRouterGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Point the generator at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Generator for OpenRouterGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<QaPair>> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Category: {}\n\nPassage:\n{}",
                        request.category, request.text
                    ),
                },
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", &request.request_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SiteBriefError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SiteBriefError::Generation(format!(
                "generation service returned HTTP {status}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SiteBriefError::Generation(format!("invalid response body: {e}")))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| SiteBriefError::Generation("response had no choices".into()))?;

        let pairs = parse_content(content)?;
        debug!(units = pairs.len(), key = %request.request_key, "generation complete");
        Ok(pairs)
    }
}

/// Parse the model's reply into Q&A pairs, tolerating a Markdown code fence.
fn parse_content(content: &str) -> Result<Vec<QaPair>> {
    let trimmed = strip_fence(content.trim());

    let pairs: Vec<QaPair> = serde_json::from_str(trimmed).map_err(|e| {
        SiteBriefError::Generation(format!(
            "model reply was not a JSON array of Q&A pairs: {e}"
        ))
    })?;

    Ok(pairs
        .into_iter()
        .filter(|p| !p.answer.trim().is_empty())
        .collect())
}

fn strip_fence(content: &str) -> &str {
    let without_open = content
        .strip_prefix("```json")
        .or_else(|| content.strip_prefix("```"))
        .unwrap_or(content);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
