//! Built-in classifiers.
//!
//! The real classifier is a remote model behind [`IntentClassifier`]; the
//! static one here answers every message with a fixed label set, which is
//! what the CLI `--label` flags and the test suites need.

use async_trait::async_trait;
use contextkeeper_core::classifier::{IntentClassifier, IntentResult};
use contextkeeper_core::error::ClassifierError;
use contextkeeper_core::message::IntentLabels;

pub struct StaticClassifier {
    labels: IntentLabels,
    reason: String,
}

impl StaticClassifier {
    pub fn new(labels: IntentLabels) -> Self {
        Self {
            labels,
            reason: "Labels supplied by caller".to_string(),
        }
    }

    /// Always answers `UNCLEAR`.
    pub fn unclear() -> Self {
        Self::new(IntentLabels::unclear())
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

#[async_trait]
impl IntentClassifier for StaticClassifier {
    fn name(&self) -> &str {
        "static"
    }

    async fn classify(&self, _text: &str) -> Result<IntentResult, ClassifierError> {
        Ok(IntentResult {
            labels: self.labels.clone(),
            reason: self.reason.clone(),
        })
    }
}
