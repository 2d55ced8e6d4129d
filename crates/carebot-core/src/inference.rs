use std::sync::Arc;
use std::time::Duration;

use carebot_provider::{LlmProvider, LlmRequest, OpenAiProvider};

use crate::config::InferenceConfig;
use crate::error::ClassificationError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_MAX_TOKENS: u32 = 512;

/// Handle to the remote model shared by every adapter.
///
/// Cloning is cheap; the provider is behind an `Arc` and holds no per-call
/// mutable state, so concurrent requests can share one client.
#[derive(Clone)]
pub struct InferenceClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
    timeout: Duration,
    max_tokens: u32,
}

impl InferenceClient {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let provider = OpenAiProvider::with_timeout(
            config.api_key.clone(),
            config.base_url.clone(),
            timeout,
        );
        Self::new(Arc::new(provider), config.model.clone())
            .with_timeout(timeout)
            .with_max_tokens(config.max_tokens)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one prompt and returns the raw completion text.
    ///
    /// Single attempt. The call is bounded by the configured timeout
    /// regardless of what the provider does.
    pub async fn complete(
        &self,
        prompt: String,
        temperature: f32,
    ) -> Result<String, ClassificationError> {
        let request = LlmRequest::simple(self.model.clone(), prompt)
            .with_temperature(temperature)
            .with_max_tokens(self.max_tokens);

        match tokio::time::timeout(self.timeout, self.provider.chat(request)).await {
            Err(_) => Err(ClassificationError::Timeout(self.timeout)),
            Ok(Err(err)) => Err(err.into()),
            Ok(Ok(resp)) => Ok(resp.text),
        }
    }
}
