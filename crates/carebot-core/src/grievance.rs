//! Grievance classification and department routing.
//!
//! Category and priority are parsed independently from the model output so a
//! malformed priority never costs a correct category. Each field is read from
//! a JSON object when the model returned one, else from a labelled line, else
//! from a keyword scan of the whole response.
//!
//! The routed department follows from the category. The model may name further
//! departments for issues that span several; only known department names are
//! kept.

use carebot_schema::{GrievanceCategory, GrievanceRecord, Priority};
use serde_json::Value;

use crate::error::ClassificationError;
use crate::inference::InferenceClient;
use crate::text::{contains_phrase, earliest_keyword, labelled_value, normalize};

const GRIEVANCE_TEMPERATURE: f32 = 0.0;

const CATEGORY_KEYWORDS: &[(GrievanceCategory, &[&str])] = &[
    (
        GrievanceCategory::Billing,
        &["billing", "bill", "payment", "invoice", "charge"],
    ),
    (GrievanceCategory::Technical, &["technical", "tech"]),
    (
        GrievanceCategory::Delivery,
        &["delivery", "shipping", "logistics"],
    ),
    (
        GrievanceCategory::ServiceQuality,
        &["service quality", "service-quality", "quality"],
    ),
    (GrievanceCategory::Other, &["other"]),
];

pub(crate) const PRIORITY_KEYWORDS: &[(Priority, &[&str])] = &[
    (Priority::Low, &["low"]),
    (Priority::Medium, &["medium", "moderate"]),
    (Priority::High, &["high", "urgent", "critical"]),
];

/// Departments a grievance may be routed to, matched case-insensitively.
pub const ROUTING_DEPARTMENTS: &[&str] = &[
    "Billing",
    "Technical Support",
    "Logistics",
    "Quality Assurance",
    "Customer Service",
    "Product Support",
    "Network Operations",
    "Safety",
    "Legal",
    "Compliance",
];

fn grievance_prompt(text: &str) -> String {
    format!(
        "You are a grievance management expert. Classify the following customer grievance.\n\
         Choose exactly one category: billing, technical, delivery, service-quality, other.\n\
         Assign exactly one priority: low, medium, high.\n\
         If the issue spans several departments, list every one that should be involved, \
         chosen from: {departments}.\n\
         Respond with exactly three lines and nothing else:\n\
         Category: <category>\n\
         Priority: <priority>\n\
         Routing: <comma-separated departments>\n\n\
         Grievance Text: \"{text}\"",
        departments = ROUTING_DEPARTMENTS.join(", ")
    )
}

/// One field of the model output, located by the first strategy that finds it.
fn field_value(raw: &str, labels: &[&str]) -> Option<String> {
    if let Some(object) = json_object(raw) {
        for label in labels {
            if let Some(value) = object.get(*label).and_then(Value::as_str) {
                return Some(value.to_string());
            }
        }
    }
    raw.lines().find_map(|line| {
        labels
            .iter()
            .find_map(|label| labelled_value(line, label))
            .map(str::to_string)
    })
}

fn json_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&raw[start..=end]).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

pub fn parse_category(raw: &str) -> GrievanceCategory {
    let source = field_value(raw, &["category", "classification"]);
    earliest_keyword(source.as_deref().unwrap_or(raw), CATEGORY_KEYWORDS).unwrap_or_default()
}

pub fn parse_priority(raw: &str) -> Priority {
    let source = field_value(raw, &["priority"]);
    earliest_keyword(source.as_deref().unwrap_or(raw), PRIORITY_KEYWORDS).unwrap_or_default()
}

/// Known departments named in the routing field, in the order given.
/// Unlike category and priority there is no whole-text fallback: prose
/// mentioning a department is not a routing decision.
pub fn parse_routing(raw: &str) -> Vec<String> {
    let items: Vec<String> = match json_object(raw).and_then(|o| routing_from_json(&o)) {
        Some(items) => items,
        None => field_value(raw, &["suggested_routing", "suggested routing", "routing"])
            .map(|value| value.split([',', ';']).map(str::to_string).collect())
            .unwrap_or_default(),
    };

    let mut departments: Vec<String> = Vec::new();
    for item in &items {
        let normalized = normalize(item);
        let known = ROUTING_DEPARTMENTS
            .iter()
            .find(|department| contains_phrase(&normalized, department))
            .copied();
        if let Some(department) = known {
            if !departments.iter().any(|d| d == department) {
                departments.push(department.to_string());
            }
        }
    }
    departments
}

fn routing_from_json(object: &serde_json::Map<String, Value>) -> Option<Vec<String>> {
    let value = object
        .get("suggested_routing")
        .or_else(|| object.get("routing"))?;
    match value {
        Value::String(single) => Some(vec![single.clone()]),
        Value::Array(list) => Some(
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

#[derive(Clone)]
pub struct GrievanceClassifier {
    client: InferenceClient,
}

impl GrievanceClassifier {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }

    pub async fn classify_grievance(
        &self,
        text: &str,
    ) -> Result<GrievanceRecord, ClassificationError> {
        let raw = self
            .client
            .complete(grievance_prompt(text), GRIEVANCE_TEMPERATURE)
            .await?;
        let category = parse_category(&raw);
        let priority = parse_priority(&raw);
        let record =
            GrievanceRecord::new(text, category, priority).with_routing(parse_routing(&raw));
        tracing::debug!(
            category = category.as_str(),
            priority = priority.as_str(),
            routing = ?record.suggested_routing,
            "grievance classified"
        );
        Ok(record)
    }

    /// Keeps the grievance when classification fails: the record is routed to
    /// customer service and flagged for manual review.
    pub async fn classify_or_review(&self, text: &str) -> GrievanceRecord {
        match self.classify_grievance(text).await {
            Ok(record) => record,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "grievance classification failed, flagging for manual review"
                );
                GrievanceRecord::manual_review(text)
            }
        }
    }
}
