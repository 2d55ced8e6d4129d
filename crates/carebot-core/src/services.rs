use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use carebot_provider::LlmProvider;
use carebot_schema::{CallAnalysis, GrievanceRecord};

use crate::call_analysis::CallAnalyzer;
use crate::config::CareConfig;
use crate::error::ValidationError;
use crate::grievance::GrievanceClassifier;
use crate::inference::InferenceClient;
use crate::pipeline::{ChatPipeline, ChatTurnOutcome, ChatTurnRequest};
use crate::session::SessionStore;

/// Everything a front end needs, wired from one config and one inference
/// client.
#[derive(Clone)]
pub struct CareServices {
    config: Arc<CareConfig>,
    client: InferenceClient,
    pipeline: ChatPipeline,
    grievances: GrievanceClassifier,
    calls: CallAnalyzer,
}

impl CareServices {
    pub fn new(config: CareConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let client = InferenceClient::new(provider, config.inference.model.clone())
            .with_timeout(Duration::from_secs(config.inference.timeout_secs))
            .with_max_tokens(config.inference.max_tokens);
        Self::with_client(config, client)
    }

    /// Talks to the OpenAI-compatible endpoint named in `config.inference`.
    pub fn from_config(config: CareConfig) -> Result<Self> {
        crate::config::validate_config(&config)?;
        let client = InferenceClient::from_config(&config.inference);
        Ok(Self::with_client(config, client))
    }

    fn with_client(config: CareConfig, client: InferenceClient) -> Self {
        let sessions = SessionStore::new(config.session.ttl_secs);
        Self {
            pipeline: ChatPipeline::new(&config, client.clone(), sessions),
            grievances: GrievanceClassifier::new(client.clone()),
            calls: CallAnalyzer::new(client.clone()),
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &CareConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    pub fn sessions(&self) -> &SessionStore {
        self.pipeline.sessions()
    }

    pub async fn chat(&self, request: ChatTurnRequest) -> Result<ChatTurnOutcome, ValidationError> {
        self.pipeline.handle_turn(request).await
    }

    pub async fn grievance(&self, text: &str) -> Result<GrievanceRecord, ValidationError> {
        let text = ValidationError::require_text("text", text)?;
        Ok(self.grievances.classify_or_review(text).await)
    }

    pub async fn analyze_call(&self, transcript: &str) -> Result<CallAnalysis, ValidationError> {
        let transcript = ValidationError::require_text("transcript_text", transcript)?;
        Ok(self.calls.analyze_or_degraded(transcript).await)
    }
}
