//! Task guidance: what the assistant should focus on next, derived from the
//! primary intent label and the session's current shape.

use contextkeeper_core::message::{IntentLabel, IntentLabels, Keyword};
use contextkeeper_memory::ContextStats;
use serde::Serialize;

/// Number of keyword terms surfaced as key topics.
const KEY_TOPIC_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskGuidance {
    pub current_focus: String,
    pub next_actions: Vec<String>,
    pub priority_level: Priority,
    pub context_awareness: ContextAwareness,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextAwareness {
    pub has_core_problem: bool,
    pub active_constraints: usize,
    pub conversation_continuity: bool,
    pub key_topics: Vec<String>,
}

struct GuidanceTemplate {
    focus: &'static str,
    next_actions: [&'static str; 3],
    priority: Priority,
}

const PROBLEM_DEFINITION: GuidanceTemplate = GuidanceTemplate {
    focus: "Define and understand the new problem",
    next_actions: [
        "Clarify the details of the problem",
        "Organize requirements and constraints",
        "Consider solution approaches",
    ],
    priority: Priority::High,
};

const CONSTRAINT_ADDITION: GuidanceTemplate = GuidanceTemplate {
    focus: "Add and apply the new constraint",
    next_actions: [
        "Integrate the constraint into the existing plan",
        "Assess the constraint's impact",
        "Consider alternatives",
    ],
    priority: Priority::High,
};

const REFINEMENT: GuidanceTemplate = GuidanceTemplate {
    focus: "Refine and improve the requirements",
    next_actions: [
        "Update the existing requirements",
        "Write a detailed specification",
        "Adjust the implementation plan",
    ],
    priority: Priority::Medium,
};

const QUESTION: GuidanceTemplate = GuidanceTemplate {
    focus: "Answer the question and provide information",
    next_actions: [
        "Analyze what is being asked",
        "Gather relevant information",
        "Provide an appropriate answer",
    ],
    priority: Priority::Medium,
};

const UNCLEAR: GuidanceTemplate = GuidanceTemplate {
    focus: "Clarify what the user means",
    next_actions: [
        "Ask for more information",
        "Confirm the intent",
        "Ask for concrete examples",
    ],
    priority: Priority::Low,
};

fn template_for(label: Option<&IntentLabel>) -> &'static GuidanceTemplate {
    match label {
        Some(IntentLabel::ProblemDefinition) => &PROBLEM_DEFINITION,
        Some(IntentLabel::ConstraintAddition) => &CONSTRAINT_ADDITION,
        Some(IntentLabel::Refinement) => &REFINEMENT,
        Some(IntentLabel::Question) => &QUESTION,
        Some(IntentLabel::Unclear | IntentLabel::Other(_)) | None => &UNCLEAR,
    }
}

/// Build guidance from the primary (first) label. Empty or unrecognized
/// label sets get the `UNCLEAR` template.
pub fn build_guidance(
    labels: &IntentLabels,
    stats: &ContextStats,
    keywords: &[Keyword],
) -> TaskGuidance {
    let template = template_for(labels.primary());
    TaskGuidance {
        current_focus: template.focus.to_string(),
        next_actions: template.next_actions.iter().map(|s| s.to_string()).collect(),
        priority_level: template.priority,
        context_awareness: ContextAwareness {
            has_core_problem: stats.has_core_problem,
            active_constraints: stats.evolving_items_count,
            conversation_continuity: stats.recent_messages_count > 0,
            key_topics: keywords
                .iter()
                .take(KEY_TOPIC_LIMIT)
                .map(|k| k.term.clone())
                .collect(),
        },
    }
}
