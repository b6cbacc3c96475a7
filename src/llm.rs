//! LLM backend abstraction over the Anthropic messages API.
//!
//! [`LlmClient`] is the seam the conversation loop talks through; the
//! wire types mirror the messages API content-block model so a tool-use
//! block can be echoed back verbatim in the follow-up call. Generation is
//! deterministic (temperature pinned to 0) with a bounded output length.
//!
//! Transport or API failures are not retried here: a failed generation is
//! fatal to the turn and surfaces to the caller.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One content block of a message, in the messages-API shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageParam {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl MessageParam {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}

/// A generation result: final text, or a request to run tools.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmReply {
    pub stop_reason: Option<String>,
    pub content: Vec<ContentBlock>,
}

impl LlmReply {
    /// True when the model stopped to request tool execution.
    pub fn wants_tools(&self) -> bool {
        self.stop_reason.as_deref() == Some("tool_use")
    }

    /// First text block, or empty string when none is present.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .find_map(|b| match b {
                ContentBlock::Text { text } => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Every tool-use block in order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }
}

/// The generation backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        messages: &[MessageParam],
        tools: &[serde_json::Value],
    ) -> Result<LlmReply>;
}

/// Client for `POST https://api.anthropic.com/v1/messages`.
///
/// Requires `ANTHROPIC_API_KEY` in the environment.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn generate(
        &self,
        system: &str,
        messages: &[MessageParam],
        tools: &[serde_json::Value],
    ) -> Result<LlmReply> {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0.0,
            "system": system,
            "messages": messages,
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::Value::Array(tools.to_vec());
            body["tool_choice"] = serde_json::json!({"type": "auto"});
        }

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Anthropic API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Anthropic API error {}: {}", status, body_text);
        }

        let reply: LlmReply = response
            .json()
            .await
            .context("Failed to decode Anthropic API response")?;
        Ok(reply)
    }
}
