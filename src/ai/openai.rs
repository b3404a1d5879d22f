//! OpenAI-compatible chat-completions implementation of [`TextGenerator`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::generation::{GenerationError, GenerationRequest, TextGenerator};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f32 = 0.2;
const ERROR_BODY_CHARS: usize = 160;

/// Configuration for [`OpenAiTextGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiConfig {
    /// Base API URL (e.g., `https://api.openai.com/v1`).
    pub base_url: String,
    /// Model identifier sent in chat-completions requests.
    pub model: String,
    /// API key used for bearer authentication.
    pub api_key: Option<String>,
    /// HTTP timeout.
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OpenAiConfig {
    /// Constructs configuration with required API settings.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            timeout,
        }
    }
}

/// Text generator backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiTextGenerator {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiTextGenerator {
    /// Creates a generator from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Configuration`] when the HTTP client cannot
    /// be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| GenerationError::Configuration {
                message: format!("failed to configure AI HTTP client: {error}"),
            })?;
        Ok(Self { config, client })
    }

    fn extract_api_key(&self) -> Result<&str, GenerationError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenerationError::Configuration {
                message: concat!(
                    "AI API key is required (use --ai-api-key, ",
                    "PRDECK_AI_API_KEY, or OPENAI_API_KEY)"
                )
                .to_owned(),
            })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let api_key = self.extract_api_key()?;
        let payload = ChatCompletionsRequest {
            model: self.config.model.as_str(),
            messages: vec![
                ChatCompletionsMessage {
                    role: "system",
                    content: request.system_prompt.as_str(),
                },
                ChatCompletionsMessage {
                    role: "user",
                    content: request.prompt.as_str(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: request.constraints.max_tokens,
            response_format: request
                .constraints
                .schema_hint
                .as_ref()
                .map(|_| ResponseFormat {
                    kind: "json_object",
                }),
        };

        trace!(prompt = %request.prompt, "sending chat completion");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_transport_error(&error))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.map_or_else(
                |_| "(failed to read error response body)".to_owned(),
                |content| truncate_for_message(content.as_str(), ERROR_BODY_CHARS),
            );
            return Err(map_status_error(status, body));
        }

        let response_payload: ChatCompletionsResponse =
            response.json().await.map_err(|error| GenerationError::Api {
                message: format!("AI response JSON decoding failed: {error}"),
            })?;

        let text = response_payload
            .choices
            .first()
            .and_then(|choice| parse_content_value(&choice.message.content))
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .map(ToOwned::to_owned)
            .ok_or(GenerationError::EmptyResponse)?;

        debug!(chars = text.len(), "chat completion received");
        Ok(text)
    }
}

fn map_transport_error(error: &reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Transport {
            message: format!("AI request transport failed: {error}"),
        }
    }
}

fn map_status_error(status: StatusCode, body: String) -> GenerationError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited { message: body },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GenerationError::Timeout,
        _ => GenerationError::Api {
            message: format!("AI request failed with status {}: {body}", status.as_u16()),
        },
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionsMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionsMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
    Missing,
}

#[derive(Debug, Deserialize)]
struct ChatContentPart {
    text: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default = "missing_content")]
    content: ChatContent,
}

const fn missing_content() -> ChatContent {
    ChatContent::Missing
}

fn parse_content_value(content: &ChatContent) -> Option<&str> {
    match content {
        ChatContent::Text(text) => Some(text.as_str()),
        ChatContent::Parts(parts) => parts
            .iter()
            .find_map(|part| part.text.as_deref().or(part.content.as_deref())),
        ChatContent::Missing => None,
    }
}

/// Truncates `message` to `max_chars` characters, appending `...` when cut.
pub(crate) fn truncate_for_message(message: &str, max_chars: usize) -> String {
    let mut output = String::new();
    let mut chars = message.chars();

    for _ in 0..max_chars {
        let Some(character) = chars.next() else {
            return output;
        };
        output.push(character);
    }

    if chars.next().is_some() {
        output.push_str("...");
    }

    output
}

#[cfg(test)]
#[path = "openai_tests.rs"]
mod tests;
