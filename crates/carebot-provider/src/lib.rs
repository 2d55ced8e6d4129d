pub mod openai;
pub mod types;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub use openai::{OpenAiProvider, ProviderErrorKind};
pub use types::*;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Failures raised by HTTP providers. Carried inside `anyhow::Error` so callers
/// can `downcast_ref` when they need to tell a timeout from a rejected request.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("inference api error (timeout): request timed out after {0:?}")]
    Timeout(Duration),
    #[error("inference api error (connect): {0}")]
    Connect(String),
    #[error("inference api error (transport): {0}")]
    Transport(String),
    #[error("inference api error ({status}, {}): {message}", .kind.as_str())]
    Api {
        status: u16,
        kind: ProviderErrorKind,
        message: String,
    },
    #[error("inference api error: malformed response payload: {0}")]
    Decode(String),
    #[error("inference api error: empty choices")]
    EmptyChoices,
}

/// Provider that answers every request with the same text. Used for offline
/// runs and tests.
pub struct StubProvider {
    reply: String,
}

impl StubProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn chat(&self, _request: LlmRequest) -> Result<LlmResponse> {
        Ok(LlmResponse::text(self.reply.clone()))
    }
}
