pub mod call_analysis;
pub mod composer;
pub mod config;
pub mod error;
pub mod escalation;
pub mod grievance;
pub mod inference;
pub mod intent;
pub mod pipeline;
pub mod sentiment;
pub mod services;
pub mod session;
pub mod text;

pub use call_analysis::CallAnalyzer;
pub use composer::ResponseComposer;
pub use config::{load_config, validate_config, CareConfig, ReplyMode};
pub use error::{ClassificationError, ValidationError};
pub use escalation::{EscalationPolicy, TurnCounters};
pub use grievance::GrievanceClassifier;
pub use inference::InferenceClient;
pub use intent::{IntentMatcher, IntentRule, PhraseMatch};
pub use pipeline::{ChatPipeline, ChatTurnOutcome, ChatTurnRequest};
pub use sentiment::SentimentClassifier;
pub use services::CareServices;
pub use session::{SessionHandle, SessionStore};
