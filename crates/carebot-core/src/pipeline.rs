//! One chat turn, end to end.
//!
//! Intent is matched locally first. Turns whose intent settles the reply on
//! its own (an explicit request for a human, a greeting, a farewell) skip the
//! remote sentiment call. Everything else is classified remotely, with
//! `NEUTRAL` standing in on failure, before the escalation policy and the
//! reply composer run.

use carebot_schema::{ConversationTurn, EscalationHandoff, Intent, Sentiment};
use serde::{Deserialize, Serialize};

use crate::composer::ResponseComposer;
use crate::config::{CareConfig, ReplyMode};
use crate::error::ValidationError;
use crate::escalation::EscalationPolicy;
use crate::inference::InferenceClient;
use crate::intent::IntentMatcher;
use crate::sentiment::SentimentClassifier;
use crate::session::SessionStore;

const GENERATIVE_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_voice_input: bool,
    #[serde(default)]
    pub simulated_voice_text: Option<String>,
}

impl ChatTurnRequest {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// The text the bot acts on: the simulated transcription for voice input
    /// when one was supplied, the typed message otherwise.
    pub fn processed_message(&self) -> &str {
        match self.simulated_voice_text.as_deref() {
            Some(voice) if self.is_voice_input && !voice.trim().is_empty() => voice,
            _ => &self.message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnOutcome {
    pub session_id: String,
    pub response: String,
    pub sentiment: Sentiment,
    /// Model confidence in `sentiment`, when it reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f32>,
    pub detected_intent: Intent,
    pub escalate_to_human: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<EscalationHandoff>,
    pub processed_message: String,
}

fn resolved_locally(intent: Intent) -> bool {
    matches!(
        intent,
        Intent::EscalationRequest | Intent::Greeting | Intent::Farewell
    )
}

fn generative_prompt(intent: Intent, sentiment: Sentiment, message: &str) -> String {
    format!(
        "You are an empathetic and helpful customer support assistant.\n\
         The customer's intent is '{intent}' and their emotional tone is '{sentiment}'.\n\
         Their message was: \"{message}\"\n\n\
         Write a concise, helpful reply. If the tone is negative, acknowledge the \
         frustration and assure them of help. For service or technical issues, offer \
         concrete next steps or ask for the details needed to diagnose the problem.\n\
         Keep the reply under 100 words.\n\n\
         Reply:"
    )
}

#[derive(Clone)]
pub struct ChatPipeline {
    matcher: IntentMatcher,
    sentiment: SentimentClassifier,
    policy: EscalationPolicy,
    composer: ResponseComposer,
    sessions: SessionStore,
    client: InferenceClient,
    reply_mode: ReplyMode,
}

impl ChatPipeline {
    pub fn new(config: &CareConfig, client: InferenceClient, sessions: SessionStore) -> Self {
        Self {
            matcher: IntentMatcher::from_rules_or_default(&config.intent_rules),
            sentiment: SentimentClassifier::new(client.clone()),
            policy: EscalationPolicy::new(&config.escalation),
            composer: ResponseComposer::new(),
            sessions,
            client,
            reply_mode: config.reply.mode,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn handle_turn(
        &self,
        request: ChatTurnRequest,
    ) -> Result<ChatTurnOutcome, ValidationError> {
        let text = ValidationError::require_text("message", request.processed_message())?;

        let handle = self.sessions.get_or_create(request.session_id.as_deref()).await;
        let mut session = handle.lock().await;

        let intent = self.matcher.match_intent(text);
        let classified = if resolved_locally(intent) {
            None
        } else {
            Some(self.sentiment.sentiment_or_neutral(text).await)
        };
        let sentiment = classified.map(|r| r.label).unwrap_or_default();

        session.push_turn(ConversationTurn::customer(text, intent, classified.map(|r| r.label)));
        let counters = self.policy.counters(&session);
        let reason = self.policy.reason(intent, sentiment, &counters);

        tracing::info!(
            session_id = %session.id,
            user_id = request.user_id.as_deref().unwrap_or("guest"),
            voice = request.is_voice_input,
            intent = intent.as_str(),
            sentiment = sentiment.as_str(),
            turn = counters.turn_count,
            "chat turn classified"
        );

        let mut response = match (reason, self.reply_mode) {
            (None, ReplyMode::Generative) => self.generative_reply(intent, sentiment, text).await,
            _ => self.composer.compose_reply(intent, sentiment),
        };
        if reason.is_some() {
            response.push_str("\n\n");
            response.push_str(self.composer.escalation_notice());
        }
        session.push_turn(ConversationTurn::bot(response.clone()));

        let handoff = reason.map(|reason| {
            session.escalated = true;
            tracing::warn!(
                session_id = %session.id,
                ?reason,
                "escalating conversation to a human agent"
            );
            self.policy.handoff(&session, reason)
        });

        Ok(ChatTurnOutcome {
            session_id: session.id.clone(),
            response,
            sentiment,
            sentiment_score: classified.and_then(|r| r.score),
            detected_intent: intent,
            escalate_to_human: handoff.is_some(),
            handoff,
            processed_message: text.to_string(),
        })
    }

    async fn generative_reply(&self, intent: Intent, sentiment: Sentiment, text: &str) -> String {
        let prompt = generative_prompt(intent, sentiment, text);
        match self.client.complete(prompt, GENERATIVE_TEMPERATURE).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                tracing::error!("generative reply was empty, using template");
                self.composer.compose_reply(intent, sentiment)
            }
            Err(err) => {
                tracing::error!(error = %err, "generative reply failed, using template");
                self.composer.compose_reply(intent, sentiment)
            }
        }
    }
}
