//! Decides when a conversation leaves L1 automation.
//!
//! Rules are checked in a fixed order and the first one that fires names the
//! [`EscalationReason`]:
//!
//! 1. the customer asked for a human;
//! 2. negative sentiment once the session has more customer turns than
//!    `negative_turn_threshold`;
//! 3. more than `unknown_turn_limit` consecutive customer turns the bot could
//!    not classify;
//! 4. a critical phrase in the current customer turn.

use carebot_schema::{EscalationHandoff, EscalationReason, Intent, Sentiment, Session};
use chrono::Utc;

use crate::config::EscalationConfig;
use crate::text::{contains_phrase, normalize};

/// Per-session counters derived from the recorded customer turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnCounters {
    /// Customer turns so far, the current one included.
    pub turn_count: usize,
    /// Trailing run of customer turns whose intent was `unknown`.
    pub consecutive_unknown: usize,
    /// The latest customer turn mentions a critical phrase. Earlier turns do
    /// not count, so one urgent message escalates once.
    pub critical_phrase: bool,
}

#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    negative_turn_threshold: usize,
    unknown_turn_limit: usize,
    critical_phrases: Vec<String>,
}

impl EscalationPolicy {
    pub fn new(config: &EscalationConfig) -> Self {
        Self {
            negative_turn_threshold: config.negative_turn_threshold,
            unknown_turn_limit: config.unknown_turn_limit,
            critical_phrases: config.critical_phrases.clone(),
        }
    }

    pub fn counters(&self, session: &Session) -> TurnCounters {
        let turn_count = session.customer_turns().count();
        let consecutive_unknown = session
            .customer_turns()
            .rev()
            .take_while(|t| t.detected_intent.unwrap_or_default() == Intent::Unknown)
            .count();
        let critical_phrase = session.customer_turns().next_back().is_some_and(|t| {
            let normalized = normalize(&t.text);
            self.critical_phrases
                .iter()
                .any(|p| contains_phrase(&normalized, p))
        });

        TurnCounters {
            turn_count,
            consecutive_unknown,
            critical_phrase,
        }
    }

    pub fn reason(
        &self,
        intent: Intent,
        sentiment: Sentiment,
        counters: &TurnCounters,
    ) -> Option<EscalationReason> {
        if intent == Intent::EscalationRequest {
            return Some(EscalationReason::ExplicitRequest);
        }
        if sentiment == Sentiment::Negative && counters.turn_count > self.negative_turn_threshold {
            return Some(EscalationReason::RepeatedNegativeSentiment);
        }
        if intent == Intent::Unknown && counters.consecutive_unknown > self.unknown_turn_limit {
            return Some(EscalationReason::BotCannotHelp);
        }
        if counters.critical_phrase {
            return Some(EscalationReason::CriticalKeyword);
        }
        None
    }

    pub fn should_escalate(
        &self,
        intent: Intent,
        sentiment: Sentiment,
        counters: &TurnCounters,
    ) -> bool {
        self.reason(intent, sentiment, counters).is_some()
    }

    /// Builds the agent payload with every recorded turn, in order.
    pub fn handoff(&self, session: &Session, reason: EscalationReason) -> EscalationHandoff {
        EscalationHandoff {
            session_id: session.id.clone(),
            reason,
            turns: session.turns.clone(),
            created_at: Utc::now(),
        }
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(&EscalationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use carebot_schema::ConversationTurn;

    use super::*;

    fn session_with(turns: &[(&str, Intent)]) -> Session {
        let mut session = Session::new("s-1");
        for (text, intent) in turns {
            session.push_turn(ConversationTurn::customer(*text, *intent, None));
            session.push_turn(ConversationTurn::bot("ok"));
        }
        session
    }

    #[test]
    fn explicit_request_escalates_regardless_of_sentiment() {
        let policy = EscalationPolicy::default();
        let counters = TurnCounters {
            turn_count: 1,
            ..TurnCounters::default()
        };
        for sentiment in Sentiment::ALL {
            assert_eq!(
                policy.reason(Intent::EscalationRequest, sentiment, &counters),
                Some(EscalationReason::ExplicitRequest)
            );
        }
    }

    #[test]
    fn negative_sentiment_needs_more_turns_than_threshold() {
        let policy = EscalationPolicy::default();
        let two = TurnCounters {
            turn_count: 2,
            ..TurnCounters::default()
        };
        let three = TurnCounters {
            turn_count: 3,
            ..TurnCounters::default()
        };
        assert!(!policy.should_escalate(Intent::BillingQuery, Sentiment::Negative, &two));
        assert_eq!(
            policy.reason(Intent::BillingQuery, Sentiment::Negative, &three),
            Some(EscalationReason::RepeatedNegativeSentiment)
        );
        assert!(!policy.should_escalate(Intent::BillingQuery, Sentiment::Neutral, &three));
    }

    #[test]
    fn unknown_streak_escalates_past_limit() {
        let policy = EscalationPolicy::default();
        let session = session_with(&[
            ("blah", Intent::Unknown),
            ("blah blah", Intent::Unknown),
            ("still blah", Intent::Unknown),
        ]);
        let counters = policy.counters(&session);
        assert_eq!(counters.consecutive_unknown, 3);
        assert_eq!(
            policy.reason(Intent::Unknown, Sentiment::Neutral, &counters),
            Some(EscalationReason::BotCannotHelp)
        );
    }

    #[test]
    fn unknown_streak_is_reset_by_recognised_turn() {
        let policy = EscalationPolicy::default();
        let session = session_with(&[
            ("blah", Intent::Unknown),
            ("blah", Intent::Unknown),
            ("where is my order", Intent::OrderStatus),
            ("blah", Intent::Unknown),
        ]);
        let counters = policy.counters(&session);
        assert_eq!(counters.turn_count, 4);
        assert_eq!(counters.consecutive_unknown, 1);
        assert!(!policy.should_escalate(Intent::Unknown, Sentiment::Neutral, &counters));
    }

    #[test]
    fn critical_phrase_in_current_turn_escalates() {
        let policy = EscalationPolicy::default();
        let session = session_with(&[
            ("hello", Intent::Greeting),
            ("I smell a gas leak in the kitchen", Intent::ServiceIssue),
        ]);
        let counters = policy.counters(&session);
        assert!(counters.critical_phrase);
        assert_eq!(
            policy.reason(Intent::ServiceIssue, Sentiment::Neutral, &counters),
            Some(EscalationReason::CriticalKeyword)
        );
    }

    #[test]
    fn critical_phrase_in_earlier_turn_does_not_retrigger() {
        let policy = EscalationPolicy::default();
        let session = session_with(&[
            ("where is my order, it is urgent", Intent::OrderStatus),
            ("ok thanks, bye", Intent::Farewell),
        ]);
        let counters = policy.counters(&session);
        assert!(!counters.critical_phrase);
        assert_eq!(policy.reason(Intent::Farewell, Sentiment::Neutral, &counters), None);
    }

    #[test]
    fn critical_phrase_respects_word_boundaries() {
        let policy = EscalationPolicy::default();
        let session = session_with(&[("my firewall settings", Intent::TechnicalSupport)]);
        assert!(!policy.counters(&session).critical_phrase);
    }

    #[test]
    fn thresholds_come_from_config() {
        let policy = EscalationPolicy::new(&EscalationConfig {
            negative_turn_threshold: 0,
            unknown_turn_limit: 5,
            critical_phrases: Vec::new(),
        });
        let first = TurnCounters {
            turn_count: 1,
            consecutive_unknown: 3,
            critical_phrase: false,
        };
        assert!(policy.should_escalate(Intent::Greeting, Sentiment::Negative, &first));
        assert!(!policy.should_escalate(Intent::Unknown, Sentiment::Neutral, &first));
    }

    #[test]
    fn handoff_carries_full_history_in_order() {
        let policy = EscalationPolicy::default();
        let session = session_with(&[
            ("hello", Intent::Greeting),
            ("my bill is wrong", Intent::BillingQuery),
            ("I want to talk to a human agent now", Intent::EscalationRequest),
        ]);
        let handoff = policy.handoff(&session, EscalationReason::ExplicitRequest);
        assert_eq!(handoff.session_id, "s-1");
        assert_eq!(handoff.turns.len(), 6);
        assert_eq!(handoff.turns, session.turns);
        assert_eq!(handoff.turns[0].text, "hello");
    }
}
