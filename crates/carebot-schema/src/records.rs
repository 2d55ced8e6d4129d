use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Sentiment;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GrievanceCategory {
    Billing,
    Technical,
    Delivery,
    ServiceQuality,
    #[default]
    Other,
}

impl GrievanceCategory {
    pub const ALL: [GrievanceCategory; 5] = [
        Self::Billing,
        Self::Technical,
        Self::Delivery,
        Self::ServiceQuality,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Billing => "billing",
            Self::Technical => "technical",
            Self::Delivery => "delivery",
            Self::ServiceQuality => "service-quality",
            Self::Other => "other",
        }
    }

    /// Department a grievance of this category is routed to.
    pub fn department(&self) -> &'static str {
        match self {
            Self::Billing => "Billing",
            Self::Technical => "Technical Support",
            Self::Delivery => "Logistics",
            Self::ServiceQuality => "Quality Assurance",
            Self::Other => "Customer Service",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrievanceRecord {
    pub raw_text: String,
    pub category: GrievanceCategory,
    pub priority: Priority,
    pub routed_department: String,
    /// Every department that should see the grievance, `routed_department`
    /// first. Longer than one entry when the issue spans departments.
    #[serde(default)]
    pub suggested_routing: Vec<String>,
    #[serde(default)]
    pub needs_manual_review: bool,
}

impl GrievanceRecord {
    pub fn new(
        raw_text: impl Into<String>,
        category: GrievanceCategory,
        priority: Priority,
    ) -> Self {
        let department = category.department().to_string();
        Self {
            raw_text: raw_text.into(),
            category,
            priority,
            suggested_routing: vec![department.clone()],
            routed_department: department,
            needs_manual_review: false,
        }
    }

    /// Appends extra departments, skipping ones already listed.
    pub fn with_routing(mut self, departments: impl IntoIterator<Item = String>) -> Self {
        for department in departments {
            if !self.suggested_routing.contains(&department) {
                self.suggested_routing.push(department);
            }
        }
        self
    }

    /// Record kept when the grievance could not be classified automatically.
    pub fn manual_review(raw_text: impl Into<String>) -> Self {
        Self {
            needs_manual_review: true,
            ..Self::new(raw_text, GrievanceCategory::default(), Priority::default())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallAnalysis {
    pub transcript: String,
    pub summary: String,
    pub tags: BTreeSet<String>,
    pub overall_sentiment: Sentiment,
    /// Tags shaped like `name: value` (order numbers, account ids, amounts).
    #[serde(default)]
    pub key_entities: Vec<String>,
    #[serde(default)]
    pub urgency: Priority,
    #[serde(default)]
    pub degraded: bool,
}

impl CallAnalysis {
    pub fn empty(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            summary: String::new(),
            tags: BTreeSet::new(),
            overall_sentiment: Sentiment::default(),
            key_entities: Vec::new(),
            urgency: Priority::default(),
            degraded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_is_derived_from_category() {
        let record =
            GrievanceRecord::new("double charge", GrievanceCategory::Billing, Priority::High);
        assert_eq!(record.routed_department, "Billing");
        assert_eq!(record.suggested_routing, ["Billing"]);
        assert!(!record.needs_manual_review);

        for category in GrievanceCategory::ALL {
            let record = GrievanceRecord::new("x", category, Priority::Low);
            assert_eq!(record.routed_department, category.department());
        }
    }

    #[test]
    fn extra_routing_keeps_primary_first_without_duplicates() {
        let record = GrievanceRecord::new("x", GrievanceCategory::Billing, Priority::High)
            .with_routing(["Technical Support".to_string(), "Billing".to_string()]);
        assert_eq!(record.suggested_routing, ["Billing", "Technical Support"]);
    }

    #[test]
    fn manual_review_record_uses_defaults() {
        let record = GrievanceRecord::manual_review("something broke");
        assert!(record.needs_manual_review);
        assert_eq!(record.category, GrievanceCategory::Other);
        assert_eq!(record.priority, Priority::Medium);
        assert_eq!(record.routed_department, "Customer Service");
        assert_eq!(record.suggested_routing, ["Customer Service"]);
        assert_eq!(record.raw_text, "something broke");
    }

    #[test]
    fn category_wire_name_is_kebab_case() {
        let json = serde_json::to_string(&GrievanceCategory::ServiceQuality).unwrap();
        assert_eq!(json, "\"service-quality\"");
        for category in GrievanceCategory::ALL {
            assert_eq!(
                serde_json::to_string(&category).unwrap(),
                format!("\"{}\"", category.as_str())
            );
        }
    }

    #[test]
    fn empty_call_analysis_has_neutral_defaults() {
        let analysis = CallAnalysis::empty("agent: hello");
        assert!(analysis.summary.is_empty());
        assert!(analysis.tags.is_empty());
        assert_eq!(analysis.overall_sentiment, Sentiment::Neutral);
        assert_eq!(analysis.urgency, Priority::Medium);
        assert!(!analysis.degraded);
    }
}
