//! Local, rule-based intent recognition.
//!
//! Rules are evaluated in declaration order and the first rule with a
//! matching phrase wins. Matching is case-insensitive. By default a phrase
//! must cover whole words; a rule marked `match: substring` accepts the
//! phrase anywhere, inflections included.

use carebot_schema::Intent;
use serde::{Deserialize, Serialize};

use crate::text::{contains_phrase, find_substring, normalize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhraseMatch {
    #[default]
    Word,
    Substring,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentRule {
    pub intent: Intent,
    #[serde(default, rename = "match")]
    pub matching: PhraseMatch,
    pub phrases: Vec<String>,
}

impl IntentRule {
    pub fn new(intent: Intent, phrases: &[&str]) -> Self {
        Self {
            intent,
            matching: PhraseMatch::Word,
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn with_matching(mut self, matching: PhraseMatch) -> Self {
        self.matching = matching;
        self
    }

    fn matches(&self, normalized: &str) -> bool {
        self.phrases.iter().any(|phrase| match self.matching {
            PhraseMatch::Word => contains_phrase(normalized, phrase),
            PhraseMatch::Substring => find_substring(normalized, phrase).is_some(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct IntentMatcher {
    rules: Vec<IntentRule>,
}

impl IntentMatcher {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    /// Uses `rules` when non-empty, the built-in table otherwise.
    pub fn from_rules_or_default(rules: &[IntentRule]) -> Self {
        if rules.is_empty() {
            Self::default()
        } else {
            Self::new(rules.to_vec())
        }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    pub fn match_intent(&self, text: &str) -> Intent {
        let normalized = normalize(text);
        self.rules
            .iter()
            .find(|rule| rule.matches(&normalized))
            .map(|rule| rule.intent)
            .unwrap_or(Intent::Unknown)
    }
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

pub fn default_rules() -> Vec<IntentRule> {
    vec![
        IntentRule::new(
            Intent::EscalationRequest,
            &[
                "human agent",
                "talk to a human",
                "speak to a human",
                "talk to human",
                "speak to human",
                "real person",
                "live agent",
                "talk to an agent",
                "speak to an agent",
                "customer representative",
                "connect me",
                "escalate",
                "supervisor",
            ],
        )
        .with_matching(PhraseMatch::Substring),
        IntentRule::new(
            Intent::PasswordReset,
            &[
                "reset my password",
                "reset password",
                "password reset",
                "forgot my password",
                "forgot password",
                "can't log in",
                "cannot log in",
                "can't login",
                "cannot login",
                "locked out",
            ],
        ),
        IntentRule::new(
            Intent::OrderStatus,
            &[
                "where is my order",
                "order status",
                "track my order",
                "tracking number",
                "has my order shipped",
            ],
        ),
        IntentRule::new(
            Intent::ReturnsAndRefunds,
            &["refund", "return policy", "return my", "exchange", "money back"],
        ),
        IntentRule::new(
            Intent::BillingQuery,
            &["bill", "billing", "invoice", "charged", "overcharged", "payment"],
        ),
        IntentRule::new(
            Intent::ServiceIssue,
            &["gas leak", "technician", "appliance", "poor service", "repair"],
        ),
        IntentRule::new(
            Intent::TechnicalSupport,
            &[
                "not working",
                "internet down",
                "no internet",
                "error message",
                "keeps crashing",
                "outage",
            ],
        ),
        IntentRule::new(
            Intent::ProductInquiry,
            &["compatible", "features", "specifications", "does it support"],
        ),
        IntentRule::new(Intent::Farewell, &["goodbye", "bye", "that's all"]),
        IntentRule::new(
            Intent::Greeting,
            &["hello", "hi", "hey", "good morning", "good evening"],
        ),
    ]
}
