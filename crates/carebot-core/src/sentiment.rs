use carebot_schema::{Sentiment, SentimentReading};

use crate::error::ClassificationError;
use crate::inference::InferenceClient;

const SENTIMENT_TEMPERATURE: f32 = 0.0;

fn sentiment_prompt(text: &str) -> String {
    format!(
        "Analyze the emotional tone of the following customer text.\n\
         Respond ONLY with a JSON object containing 'label' (POSITIVE, NEGATIVE or \
         NEUTRAL) and 'score' (0.0 to 1.0, your confidence in the label).\n\
         Do not include any explanation.\n\n\
         Example: {{\"label\": \"NEGATIVE\", \"score\": 0.88}}\n\n\
         Text: \"{text}\""
    )
}

/// Picks the label whose first occurrence in `raw` comes earliest.
pub fn parse_sentiment_label(raw: &str) -> Option<Sentiment> {
    let upper = raw.to_ascii_uppercase();
    Sentiment::ALL
        .iter()
        .filter_map(|label| upper.find(label.as_str()).map(|pos| (pos, *label)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, label)| label)
}

/// `score` of the first `{...}` object in `raw`, if it holds a number.
fn parse_score(raw: &str) -> Option<f32> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    let value: serde_json::Value = serde_json::from_str(raw.get(start..=end)?).ok()?;
    value.get("score")?.as_f64().map(|score| score as f32)
}

/// Label plus optional confidence. The label may come bare or inside a JSON
/// object; a score is only read from JSON.
pub fn parse_sentiment(raw: &str) -> Option<SentimentReading> {
    let label = parse_sentiment_label(raw)?;
    Some(SentimentReading::new(label, parse_score(raw)))
}

#[derive(Clone)]
pub struct SentimentClassifier {
    client: InferenceClient,
}

impl SentimentClassifier {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }

    pub async fn classify_sentiment(
        &self,
        text: &str,
    ) -> Result<SentimentReading, ClassificationError> {
        let raw = self
            .client
            .complete(sentiment_prompt(text), SENTIMENT_TEMPERATURE)
            .await?;
        parse_sentiment(&raw).ok_or(ClassificationError::Unparseable(raw))
    }

    /// Never fails: any classification error is logged once and reported as
    /// `NEUTRAL` without a score.
    pub async fn sentiment_or_neutral(&self, text: &str) -> SentimentReading {
        match self.classify_sentiment(text).await {
            Ok(reading) => reading,
            Err(err) => {
                tracing::error!(error = %err, "sentiment classification failed, using NEUTRAL");
                SentimentReading::default()
            }
        }
    }
}
