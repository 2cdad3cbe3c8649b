//! Utilities for querying the OpenAI API via the chat completions endpoint.
//!
//! For specific details on request/response schemas, see the [OpenAI API chat completions docs](https://platform.openai.com/docs/api-reference/chat/create).

use reqwest::{blocking::Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::MagicError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A `chat/completions` `messages` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

/// A `chat/completions` request body
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: String,
    pub temperature: f32,
    pub messages: &'a [ChatMessage],
}

/// The message of a `chat/completions` response choice. `content` is null
/// for refusals and tool calls.
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub role: Role,
    pub content: Option<String>,
}

/// A `chat/completions` response choice
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// A `chat/completions` response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// The first choice of a completion, reduced to what the handler needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub message: ChatMessage,
    pub usage: Option<Usage>,
}

/// Blocking client for the chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Self {
        OpenAiClient {
            client: Client::new(),
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Make one authenticated request to confirm the key is accepted.
    pub fn check_api_key(&self) -> Result<(), MagicError> {
        let response = self
            .client
            .get(self.url("/v1/models"))
            .bearer_auth(&self.api_key)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "API key check failed");
            return Err(MagicError::InvalidApiKey {
                status: status.as_u16(),
            });
        }
        debug!("API key accepted");
        Ok(())
    }

    /// Send a transcript and return the first choice's message.
    pub fn complete(&self, request: &ChatRequest) -> Result<Completion, MagicError> {
        debug!(
            model = %request.model,
            temperature = request.temperature,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(self.url("/v1/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "chat completion request failed");
            return Err(MagicError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_completion(&body)
    }
}

/// Decode a `chat/completions` body into its first choice.
pub fn parse_completion(body: &str) -> Result<Completion, MagicError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| MagicError::MalformedResponse(e.to_string()))?;

    if let Some(usage) = parsed.usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "completion usage"
        );
    }

    let choice = parsed.choices.into_iter().next().ok_or(MagicError::NoChoices)?;
    let content = choice.message.content.ok_or_else(|| {
        MagicError::MalformedResponse(format!(
            "first choice has no content (finish_reason: {})",
            choice.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })?;

    Ok(Completion {
        message: ChatMessage {
            role: choice.message.role,
            content,
        },
        usage: parsed.usage,
    })
}
