use std::time::Duration;

use carebot_provider::ProviderError;
use thiserror::Error;

/// A remote classification step could not produce a usable label.
///
/// Every caller pairs this with a fallback value; it is never shown to the
/// customer as-is.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("inference request timed out after {0:?}")]
    Timeout(Duration),
    #[error("inference request failed: {0}")]
    Remote(String),
    #[error("unrecognised model output: {0:?}")]
    Unparseable(String),
}

impl From<anyhow::Error> for ClassificationError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ProviderError>() {
            Some(ProviderError::Timeout(after)) => Self::Timeout(*after),
            _ => Self::Remote(format!("{err:#}")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`{field}` must not be empty")]
    EmptyText { field: &'static str },
}

impl ValidationError {
    /// Returns the trimmed text, or an error when nothing is left.
    pub fn require_text<'a>(field: &'static str, value: &'a str) -> Result<&'a str, Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Err(Self::EmptyText { field })
        } else {
            Ok(trimmed)
        }
    }
}
