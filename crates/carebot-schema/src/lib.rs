pub mod records;

pub use records::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of intents the bot can recognise locally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Farewell,
    PasswordReset,
    OrderStatus,
    ReturnsAndRefunds,
    BillingQuery,
    TechnicalSupport,
    ServiceIssue,
    ProductInquiry,
    EscalationRequest,
    #[default]
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Farewell => "farewell",
            Self::PasswordReset => "password_reset",
            Self::OrderStatus => "order_status",
            Self::ReturnsAndRefunds => "returns_and_refunds",
            Self::BillingQuery => "billing_query",
            Self::TechnicalSupport => "technical_support",
            Self::ServiceIssue => "service_issue",
            Self::ProductInquiry => "product_inquiry",
            Self::EscalationRequest => "escalation_request",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Self::Positive, Self::Negative, Self::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sentiment label with the model's confidence in it, when it gave one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SentimentReading {
    pub label: Sentiment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl SentimentReading {
    pub fn new(label: Sentiment, score: Option<f32>) -> Self {
        Self {
            label,
            score: score.map(|s| s.clamp(0.0, 1.0)),
        }
    }
}

impl From<Sentiment> for SentimentReading {
    fn from(label: Sentiment) -> Self {
        Self { label, score: None }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Customer,
    Bot,
}

/// One recorded utterance. Turns are never edited after being appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_intent: Option<Intent>,
}

impl ConversationTurn {
    pub fn customer(
        text: impl Into<String>,
        intent: Intent,
        sentiment: Option<Sentiment>,
    ) -> Self {
        Self {
            speaker: Speaker::Customer,
            text: text.into(),
            timestamp: Utc::now(),
            detected_sentiment: sentiment,
            detected_intent: Some(intent),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Bot,
            text: text.into(),
            timestamp: Utc::now(),
            detected_sentiment: None,
            detected_intent: None,
        }
    }

    pub fn is_customer(&self) -> bool {
        self.speaker == Speaker::Customer
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub turns: Vec<ConversationTurn>,
    pub escalated: bool,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            turns: Vec::new(),
            escalated: false,
            created_at: now,
            last_active: now,
        }
    }

    pub fn push_turn(&mut self, turn: ConversationTurn) {
        self.last_active = turn.timestamp;
        self.turns.push(turn);
    }

    pub fn customer_turns(&self) -> impl DoubleEndedIterator<Item = &ConversationTurn> {
        self.turns.iter().filter(|t| t.is_customer())
    }

    pub fn is_expired(&self, ttl_seconds: i64) -> bool {
        let elapsed = Utc::now() - self.last_active;
        elapsed.num_seconds() >= ttl_seconds
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    ExplicitRequest,
    RepeatedNegativeSentiment,
    BotCannotHelp,
    CriticalKeyword,
}

/// Payload handed to a human agent. Carries the whole conversation as recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationHandoff {
    pub session_id: String,
    pub reason: EscalationReason,
    pub turns: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_wire_names_match_as_str() {
        for intent in [
            Intent::Greeting,
            Intent::PasswordReset,
            Intent::ReturnsAndRefunds,
            Intent::EscalationRequest,
            Intent::Unknown,
        ] {
            let json = serde_json::to_string(&intent).unwrap();
            assert_eq!(json, format!("\"{}\"", intent.as_str()));
        }
    }

    #[test]
    fn sentiment_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&Sentiment::Negative).unwrap(),
            "\"NEGATIVE\""
        );
        let parsed: Sentiment = serde_json::from_str("\"POSITIVE\"").unwrap();
        assert_eq!(parsed, Sentiment::Positive);
    }

    #[test]
    fn sentiment_reading_clamps_score() {
        let reading = SentimentReading::new(Sentiment::Negative, Some(1.7));
        assert_eq!(reading.score, Some(1.0));
        let json = serde_json::to_value(SentimentReading::from(Sentiment::Neutral)).unwrap();
        assert_eq!(json, serde_json::json!({"label": "NEUTRAL"}));
    }

    #[test]
    fn session_push_turn_keeps_order_and_updates_activity() {
        let mut session = Session::new("s-1");
        session.push_turn(ConversationTurn::customer("hi", Intent::Greeting, None));
        session.push_turn(ConversationTurn::bot("hello"));
        session.push_turn(ConversationTurn::customer(
            "where is my order",
            Intent::OrderStatus,
            Some(Sentiment::Neutral),
        ));

        assert_eq!(session.turns.len(), 3);
        assert_eq!(session.customer_turns().count(), 2);
        assert_eq!(session.turns[1].speaker, Speaker::Bot);
        assert_eq!(session.last_active, session.turns[2].timestamp);
    }

    #[test]
    fn session_is_expired() {
        let mut session = Session::new("s-2");
        session.last_active = Utc::now() - chrono::TimeDelta::try_seconds(100).unwrap();
        assert!(session.is_expired(50));
        assert!(!Session::new("s-3").is_expired(50));
    }

    #[test]
    fn bot_turn_omits_classifier_fields_on_the_wire() {
        let json = serde_json::to_value(ConversationTurn::bot("ok")).unwrap();
        assert!(json.get("detected_sentiment").is_none());
        assert!(json.get("detected_intent").is_none());
        assert_eq!(json["speaker"], "bot");
    }
}
