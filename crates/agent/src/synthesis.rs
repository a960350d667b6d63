//! Prompt synthesis: one store's state plus the current message, rendered
//! into the final prompt for the main language model.
//!
//! The prompt always has four sections, in this order:
//!
//! 1. **Mission**: the standing problem and its key terms
//! 2. **Constraints**: every evolving item, oldest first
//! 3. **Recent Conversation**: the last few turns, verbatim
//! 4. **User's Current Message**: the input, unmodified
//!
//! Each section falls back to an explicit placeholder when its tier is
//! empty. Synthesis is deterministic and reads the store only through
//! [`HierarchicalContextStore::get_context_summary`] and the keyword label
//! helpers.

use contextkeeper_memory::{ContextStats, ContextSummary, HierarchicalContextStore};
use serde::Serialize;

// ── Placeholders ──────────────────────────────────────────────────────────

pub const NO_CORE_PLACEHOLDER: &str = "(No clear problem has been defined yet. \
     First work out what the user is trying to achieve, then help them get there.)";

pub const NO_CONSTRAINTS_PLACEHOLDER: &str = "(No constraints or decisions yet.)";

pub const DIALOGUE_START_PLACEHOLDER: &str = "(This is the start of the dialogue.)";

// ── Debug info ────────────────────────────────────────────────────────────

/// Everything that went into one synthesized prompt.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisDebugInfo {
    pub input: DebugInput,
    pub processing: DebugSections,
    pub output: DebugOutput,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugInput {
    pub current_message: String,
    pub context_summary: ContextSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugSections {
    pub core_formatted: String,
    pub evolving_formatted: String,
    pub turn_formatted: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugOutput {
    pub synthesized_prompt: String,
    /// Length in characters, not bytes.
    pub prompt_length: usize,
    pub stats: ContextStats,
}

// ── Engine ────────────────────────────────────────────────────────────────

/// Renders prompts from a borrowed context store. Holds no state of its own.
pub struct PromptSynthesisEngine<'a> {
    store: &'a HierarchicalContextStore,
}

impl<'a> PromptSynthesisEngine<'a> {
    pub fn new(store: &'a HierarchicalContextStore) -> Self {
        Self { store }
    }

    pub fn synthesize_prompt(&self, current_message: &str) -> String {
        let summary = self.store.get_context_summary();
        let sections = self.format_sections(&summary);
        render(&sections, current_message)
    }

    pub fn get_context_stats(&self) -> ContextStats {
        self.store.get_stats()
    }

    pub fn create_debug_info(&self, current_message: &str) -> SynthesisDebugInfo {
        let summary = self.store.get_context_summary();
        let sections = self.format_sections(&summary);
        let prompt = render(&sections, current_message);

        SynthesisDebugInfo {
            input: DebugInput {
                current_message: current_message.to_string(),
                context_summary: summary,
            },
            output: DebugOutput {
                prompt_length: prompt.chars().count(),
                synthesized_prompt: prompt,
                stats: self.get_context_stats(),
            },
            processing: sections,
        }
    }

    fn format_sections(&self, summary: &ContextSummary) -> DebugSections {
        DebugSections {
            core_formatted: self.format_core(summary.core_problem.as_deref()),
            evolving_formatted: self.format_evolving(&summary.evolving_items),
            turn_formatted: format_turn(&summary.recent_conversation),
        }
    }

    fn format_core(&self, core_problem: Option<&str>) -> String {
        let Some(problem) = core_problem else {
            return NO_CORE_PLACEHOLDER.to_string();
        };
        let mut formatted = format!("**Primary problem**: {problem}");
        if let Some(terms) = self.store.core_keywords_text() {
            formatted.push('\n');
            formatted.push_str(&terms);
        }
        formatted
    }

    fn format_evolving(&self, items: &[String]) -> String {
        if items.is_empty() {
            return NO_CONSTRAINTS_PLACEHOLDER.to_string();
        }
        let mut formatted = items
            .iter()
            .map(|item| format!("- {item}"))
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(terms) = self.store.evolving_keywords_text() {
            formatted.push_str("\n\n");
            formatted.push_str(&terms);
        }
        formatted
    }
}

fn format_turn(recent_conversation: &str) -> String {
    if recent_conversation.trim().is_empty() {
        DIALOGUE_START_PLACEHOLDER.to_string()
    } else {
        recent_conversation.to_string()
    }
}

fn render(sections: &DebugSections, current_message: &str) -> String {
    format!(
        "# Mission\n\
         You are an AI assistant helping the user solve their problem. \
         Keep the following core goal in mind at all times.\n\
         \n\
         {core}\n\
         \n\
         # Constraints\n\
         Every response must satisfy the following conditions and decisions.\n\
         {evolving}\n\
         \n\
         # Recent Conversation\n\
         {turn}\n\
         \n\
         # User's Current Message\n\
         {current_message}",
        core = sections.core_formatted,
        evolving = sections.evolving_formatted,
        turn = sections.turn_formatted,
    )
}
