use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{LlmMessage, LlmProvider, LlmRequest, LlmResponse, ProviderError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for any endpoint speaking the OpenAI chat-completions format
/// (OpenAI itself, Groq, Together, a local Ollama, ...).
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    RateLimit,
    ServerError,
    AuthError,
    InvalidRequest,
    Unknown,
}

impl ProviderErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimit,
            401 | 403 => Self::AuthError,
            400 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::AuthError => "auth_error",
            Self::InvalidRequest => "invalid_request",
            Self::Unknown => "unknown",
        }
    }
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self::with_timeout(api_key, api_base, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub(crate) fn to_api_request(request: LlmRequest) -> ApiRequest {
        ApiRequest {
            model: request.model,
            messages: to_api_messages(request.messages),
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let payload = Self::to_api_request(request);
        tracing::debug!(
            model = %payload.model,
            messages = payload.messages.len(),
            "sending chat completion"
        );

        let resp = match self
            .client
            .post(url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(ProviderError::Timeout(self.timeout).into());
            }
            Err(e) if e.is_connect() => {
                return Err(ProviderError::Connect(e.to_string()).into());
            }
            Err(e) => return Err(ProviderError::Transport(e.to_string()).into()),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<ApiErrorEnvelope>(&text).ok();
            return Err(format_api_error(status, parsed).into());
        }

        let body: ApiResponse = match resp.json().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return Err(ProviderError::Timeout(self.timeout).into());
            }
            Err(e) => return Err(ProviderError::Decode(e.to_string()).into()),
        };
        Ok(to_llm_response(body)?)
    }
}

fn to_api_messages(messages: Vec<LlmMessage>) -> Vec<ApiMessage> {
    messages
        .into_iter()
        .filter(|message| !message.content.is_empty())
        .map(|message| ApiMessage {
            role: message.role,
            content: message.content,
        })
        .collect()
}

fn to_llm_response(body: ApiResponse) -> std::result::Result<LlmResponse, ProviderError> {
    let choice = body.choices.first().ok_or(ProviderError::EmptyChoices)?;

    if choice.finish_reason.as_deref() == Some("length") {
        tracing::warn!("completion truncated at max_tokens");
    }
    Ok(LlmResponse::text(choice.message.content.clone().unwrap_or_default()))
}

fn format_api_error(status: StatusCode, parsed: Option<ApiErrorEnvelope>) -> ProviderError {
    let kind = ProviderErrorKind::from_status(status);
    let message = parsed
        .map(|envelope| match envelope.error.r#type {
            Some(kind) => format!("{} ({kind})", envelope.error.message),
            None => envelope.error.message,
        })
        .unwrap_or_default();
    ProviderError::Api {
        status: status.as_u16(),
        kind,
        message,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiResponse {
    pub choices: Vec<ApiChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiChoice {
    pub message: ApiAssistantMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiAssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub r#type: Option<String>,
    pub message: String,
}
