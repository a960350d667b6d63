//! Classifier trait: the seam to the external intent classifier.
//!
//! Classification is done by a remote language model that lives outside
//! this workspace. The pipeline only needs labels and a reason; when the
//! classifier fails it falls back to [`IntentResult::fallback`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;
use crate::message::IntentLabels;

/// The outcome of classifying one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    #[serde(rename = "intent")]
    pub labels: IntentLabels,
    pub reason: String,
}

impl IntentResult {
    /// `UNCLEAR` with the failure as the reason.
    pub fn fallback(error: &ClassifierError) -> Self {
        Self {
            labels: IntentLabels::unclear(),
            reason: error.to_string(),
        }
    }
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// The classifier name (e.g., "static", "openai").
    fn name(&self) -> &str;

    async fn classify(&self, text: &str) -> Result<IntentResult, ClassifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::IntentLabel;

    #[test]
    fn fallback_is_unclear() {
        let err = ClassifierError::Unreachable("connection refused".into());
        let result = IntentResult::fallback(&err);
        assert_eq!(result.labels.primary(), Some(&IntentLabel::Unclear));
        assert!(result.reason.contains("connection refused"));
    }

    #[test]
    fn serializes_labels_as_intent() {
        let result = IntentResult {
            labels: IntentLabels::unclear(),
            reason: "n/a".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["intent"][0], "UNCLEAR");
    }
}
