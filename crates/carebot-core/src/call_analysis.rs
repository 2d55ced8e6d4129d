use std::collections::BTreeSet;

use carebot_schema::{CallAnalysis, Priority, Sentiment};

use crate::error::ClassificationError;
use crate::grievance::PRIORITY_KEYWORDS;
use crate::inference::InferenceClient;
use crate::sentiment::parse_sentiment_label;
use crate::text::{earliest_keyword, labelled_value};

const CALL_ANALYSIS_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Tags,
    Sentiment,
    Urgency,
}

/// Longer aliases first so `Tags and Entities:` is not read as `Tags`.
const SECTION_MARKERS: &[(&str, Section)] = &[
    ("summary", Section::Summary),
    ("tags and entities", Section::Tags),
    ("tags", Section::Tags),
    ("overall sentiment", Section::Sentiment),
    ("sentiment", Section::Sentiment),
    ("urgency", Section::Urgency),
];

fn call_analysis_prompt(transcript: &str) -> String {
    format!(
        "Analyze the following customer call transcript.\n\
         Respond using exactly these four sections, each starting on its own line:\n\
         SUMMARY: a concise, professional summary in 3-5 sentences.\n\
         TAGS: a comma-separated list of topic tags and key entities \
         (for example: billing, incorrect charge, account id: 12345).\n\
         SENTIMENT: one of POSITIVE, NEGATIVE or NEUTRAL for the call overall.\n\
         URGENCY: one of low, medium or high.\n\n\
         Transcript: \"{transcript}\""
    )
}

fn section_marker(line: &str) -> Option<(Section, &str)> {
    SECTION_MARKERS
        .iter()
        .find_map(|(label, section)| labelled_value(line, label).map(|value| (*section, value)))
}

#[derive(Debug, Default)]
struct Sections {
    summary: Option<String>,
    tags: Option<String>,
    sentiment: Option<String>,
    urgency: Option<String>,
}

impl Sections {
    fn slot(&mut self, section: Section) -> &mut Option<String> {
        match section {
            Section::Summary => &mut self.summary,
            Section::Tags => &mut self.tags,
            Section::Sentiment => &mut self.sentiment,
            Section::Urgency => &mut self.urgency,
        }
    }

    fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.tags.is_none()
            && self.sentiment.is_none()
            && self.urgency.is_none()
    }
}

fn split_sections(raw: &str) -> Sections {
    let mut sections = Sections::default();
    let mut current: Option<Section> = None;

    for line in raw.lines() {
        if let Some((section, value)) = section_marker(line) {
            current = Some(section);
            // A repeated marker starts over; the last occurrence wins.
            *sections.slot(section) = Some(value.to_string());
            continue;
        }
        if let Some(section) = current {
            if let Some(body) = sections.slot(section) {
                if !body.is_empty() {
                    body.push('\n');
                }
                body.push_str(line.trim());
            }
        }
    }

    sections
}

fn is_bullet(c: char) -> bool {
    matches!(c, '-' | '*' | '\u{2022}') || c.is_whitespace()
}

pub fn parse_tags(body: &str) -> BTreeSet<String> {
    body.split([',', '\n'])
        .map(|tag| {
            tag.trim()
                .trim_start_matches(is_bullet)
                .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c.is_whitespace())
                .to_lowercase()
        })
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Parses a sectioned model response. Sections that are missing get their
/// default; `None` only when no section marker is present at all.
pub fn parse_call_analysis(transcript: &str, raw: &str) -> Option<CallAnalysis> {
    let sections = split_sections(raw);
    if sections.is_empty() {
        return None;
    }

    let tags = sections.tags.as_deref().map(parse_tags).unwrap_or_default();
    let key_entities = tags.iter().filter(|t| t.contains(':')).cloned().collect();

    Some(CallAnalysis {
        transcript: transcript.to_string(),
        summary: sections.summary.unwrap_or_default().trim().to_string(),
        tags,
        overall_sentiment: sections
            .sentiment
            .as_deref()
            .and_then(parse_sentiment_label)
            .unwrap_or(Sentiment::Neutral),
        key_entities,
        urgency: sections
            .urgency
            .as_deref()
            .and_then(|body| earliest_keyword(body, PRIORITY_KEYWORDS))
            .unwrap_or(Priority::Medium),
        degraded: false,
    })
}

#[derive(Clone)]
pub struct CallAnalyzer {
    client: InferenceClient,
}

impl CallAnalyzer {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }

    pub async fn analyze_call(
        &self,
        transcript: &str,
    ) -> Result<CallAnalysis, ClassificationError> {
        let raw = self
            .client
            .complete(call_analysis_prompt(transcript), CALL_ANALYSIS_TEMPERATURE)
            .await?;
        parse_call_analysis(transcript, &raw).ok_or(ClassificationError::Unparseable(raw))
    }

    pub async fn analyze_or_degraded(&self, transcript: &str) -> CallAnalysis {
        match self.analyze_call(transcript).await {
            Ok(analysis) => analysis,
            Err(err) => {
                tracing::error!(error = %err, "call analysis failed, returning empty analysis");
                CallAnalysis {
                    degraded: true,
                    ..CallAnalysis::empty(transcript)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::inference::testing::ScriptedProvider;

    const FULL: &str = "SUMMARY: Customer reported a double charge on the March invoice.\n\
                        The agent issued a refund.\n\
                        TAGS: Billing, incorrect charge, account ID: 12345, billing\n\
                        SENTIMENT: Negative\n\
                        URGENCY: high";

    #[test]
    fn parses_all_sections() {
        let analysis = parse_call_analysis("t", FULL).unwrap();
        assert_eq!(
            analysis.summary,
            "Customer reported a double charge on the March invoice.\nThe agent issued a refund."
        );
        let tags: Vec<_> = analysis.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, ["account id: 12345", "billing", "incorrect charge"]);
        assert_eq!(analysis.key_entities, ["account id: 12345"]);
        assert_eq!(analysis.overall_sentiment, Sentiment::Negative);
        assert_eq!(analysis.urgency, Priority::High);
        assert!(!analysis.degraded);
    }

    #[test]
    fn missing_tags_section_keeps_the_rest() {
        let raw = "SUMMARY: Router replaced.\nSENTIMENT: POSITIVE";
        let analysis = parse_call_analysis("t", raw).unwrap();
        assert!(analysis.tags.is_empty());
        assert!(analysis.key_entities.is_empty());
        assert_eq!(analysis.summary, "Router replaced.");
        assert_eq!(analysis.overall_sentiment, Sentiment::Positive);
        assert_eq!(analysis.urgency, Priority::Medium);
    }

    #[test]
    fn markdown_and_aliases_are_recognised() {
        let raw = "## Summary\nShort call about delivery.\n\n\
                   **Tags and Entities:**\n- delivery\n- order number: A-77\n\
                   **Overall Sentiment:** neutral";
        let analysis = parse_call_analysis("t", raw).unwrap();
        assert_eq!(analysis.summary, "Short call about delivery.");
        assert!(analysis.tags.contains("delivery"));
        assert!(analysis.tags.contains("order number: a-77"));
        assert_eq!(analysis.key_entities, ["order number: a-77"]);
        assert_eq!(analysis.overall_sentiment, Sentiment::Neutral);
    }

    #[test]
    fn unknown_sentiment_label_defaults_to_neutral() {
        let raw = "SUMMARY: ok\nSENTIMENT: mixed";
        let analysis = parse_call_analysis("t", raw).unwrap();
        assert_eq!(analysis.overall_sentiment, Sentiment::Neutral);
    }

    #[test]
    fn response_without_markers_is_rejected() {
        assert!(parse_call_analysis("t", "I could not analyze this call.").is_none());
    }

    #[tokio::test]
    async fn analyze_call_uses_one_remote_call() {
        let provider = Arc::new(ScriptedProvider::new(&[FULL]));
        let analyzer = CallAnalyzer::new(InferenceClient::new(provider.clone(), "m"));
        let analysis = analyzer.analyze_call("agent: hello").await.unwrap();
        assert_eq!(analysis.transcript, "agent: hello");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn failure_returns_degraded_analysis() {
        let analyzer = CallAnalyzer::new(InferenceClient::new(
            Arc::new(ScriptedProvider::failing("503 overloaded")),
            "m",
        ));
        let analysis = analyzer.analyze_or_degraded("agent: hello").await;
        assert!(analysis.degraded);
        assert!(analysis.summary.is_empty());
        assert!(analysis.tags.is_empty());
        assert_eq!(analysis.overall_sentiment, Sentiment::Neutral);
        assert_eq!(analysis.transcript, "agent: hello");
    }
}
