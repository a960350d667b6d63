//! Message and context item domain types.
//!
//! These are the value objects that flow through the store:
//! the classifier labels a message, the keyword engine scores it, and the
//! context store files it into one or more tiers. None of them is mutated
//! after construction; tiers are changed by replacing or evicting whole items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An intent label produced by the external classifier.
///
/// Known labels drive tier routing. Anything else is carried through
/// verbatim as [`IntentLabel::Other`] so snapshots round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IntentLabel {
    ProblemDefinition,
    ConstraintAddition,
    Refinement,
    Question,
    Unclear,
    Other(String),
}

impl IntentLabel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ProblemDefinition => "PROBLEM_DEFINITION",
            Self::ConstraintAddition => "CONSTRAINT_ADDITION",
            Self::Refinement => "REFINEMENT",
            Self::Question => "QUESTION",
            Self::Unclear => "UNCLEAR",
            Self::Other(label) => label,
        }
    }

    /// Whether this is one of the labels the classifier is prompted with.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for IntentLabel {
    fn from(s: &str) -> Self {
        match s {
            "PROBLEM_DEFINITION" => Self::ProblemDefinition,
            "CONSTRAINT_ADDITION" => Self::ConstraintAddition,
            "REFINEMENT" => Self::Refinement,
            "QUESTION" => Self::Question,
            "UNCLEAR" => Self::Unclear,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for IntentLabel {
    fn from(s: String) -> Self {
        match Self::from(s.as_str()) {
            Self::Other(_) => Self::Other(s),
            known => known,
        }
    }
}

impl From<IntentLabel> for String {
    fn from(label: IntentLabel) -> Self {
        match label {
            IntentLabel::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IntentLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IntentLabel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// An insertion-ordered set of intent labels. Duplicates are dropped on
/// construction, so `[A, B, A]` becomes `[A, B]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<IntentLabel>", into = "Vec<IntentLabel>")]
pub struct IntentLabels(Vec<IntentLabel>);

impl IntentLabels {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// The single-label fallback used when classification fails.
    pub fn unclear() -> Self {
        Self(vec![IntentLabel::Unclear])
    }

    pub fn contains(&self, label: &IntentLabel) -> bool {
        self.0.contains(label)
    }

    /// First label, if any. Drives guidance selection.
    pub fn primary(&self) -> Option<&IntentLabel> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IntentLabel> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<IntentLabel>> for IntentLabels {
    fn from(labels: Vec<IntentLabel>) -> Self {
        let mut unique: Vec<IntentLabel> = Vec::with_capacity(labels.len());
        for label in labels {
            if !unique.contains(&label) {
                unique.push(label);
            }
        }
        Self(unique)
    }
}

impl From<IntentLabels> for Vec<IntentLabel> {
    fn from(labels: IntentLabels) -> Self {
        labels.0
    }
}

impl<L: Into<IntentLabel>> FromIterator<L> for IntentLabels {
    fn from_iter<I: IntoIterator<Item = L>>(iter: I) -> Self {
        Self::from(iter.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

impl<'a> IntoIterator for &'a IntentLabels {
    type Item = &'a IntentLabel;
    type IntoIter = std::slice::Iter<'a, IntentLabel>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A scored keyword. Serialized as `{"keyword": ..., "score": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    #[serde(rename = "keyword")]
    pub term: String,
    pub score: f64,
}

impl Keyword {
    pub fn new(term: impl Into<String>, score: f64) -> Self {
        Self {
            term: term.into(),
            score,
        }
    }
}

/// A single message in the Turn Context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the message was stored
    pub timestamp: DateTime<Utc>,

    /// Labels assigned by the classifier
    #[serde(default)]
    pub intent_labels: IntentLabels,

    /// Keywords extracted for this message, highest score first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<Keyword>,
}

impl Message {
    pub fn new(
        role: Role,
        content: impl Into<String>,
        intent_labels: IntentLabels,
        keywords: Vec<Keyword>,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            intent_labels,
            keywords,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>, intent_labels: IntentLabels) -> Self {
        Self::new(Role::User, content, intent_labels, Vec::new())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, IntentLabels::new(), Vec::new())
    }
}

/// An item retained in the Core or Evolving tier.
///
/// Always user-authored, so it carries no role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub content: String,
    pub keywords: Vec<Keyword>,
    pub timestamp: DateTime<Utc>,
    pub intent_labels: IntentLabels,
}

impl From<&Message> for ContextItem {
    fn from(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            keywords: message.keywords.clone(),
            timestamp: message.timestamp,
            intent_labels: message.intent_labels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_deduplicate_in_order() {
        let labels: IntentLabels = ["REFINEMENT", "QUESTION", "REFINEMENT"].into_iter().collect();
        let names: Vec<&str> = labels.iter().map(IntentLabel::as_str).collect();
        assert_eq!(names, vec!["REFINEMENT", "QUESTION"]);
        assert_eq!(labels.primary(), Some(&IntentLabel::Refinement));
    }

    #[test]
    fn unknown_label_round_trips() {
        let label = IntentLabel::from("SMALL_TALK");
        assert!(!label.is_recognized());
        let json = serde_json::to_string(&label).unwrap();
        assert_eq!(json, "\"SMALL_TALK\"");
        let back: IntentLabel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, label);
    }

    #[test]
    fn keyword_uses_keyword_field_name() {
        let json = serde_json::to_string(&Keyword::new("rust", 0.5)).unwrap();
        assert!(json.contains("\"keyword\":\"rust\""));
    }

    #[test]
    fn message_serialization_keeps_timestamp_precision() {
        let msg = Message::user(
            "Only open-source models",
            vec![IntentLabel::ConstraintAddition].into(),
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert!("system".parse::<Role>().is_err());
    }
}
