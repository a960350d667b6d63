//! Hierarchical context store: three tiers of conversation memory.
//!
//! | Tier | Holds | Mutation |
//! |------|-------|----------|
//! | Core | the standing problem definition | replaced by each `PROBLEM_DEFINITION` |
//! | Evolving | constraints and refinements | appended, never evicted |
//! | Turn | the most recent raw messages | appended, oldest evicted past `max_turns` |
//!
//! Which of Core / Evolving a message reaches is decided by a
//! [`RoutingPolicy`]. Every message, whatever its labels, enters the Turn
//! Context.

use std::collections::VecDeque;

use contextkeeper_core::error::ContextError;
use contextkeeper_core::message::{ContextItem, IntentLabels, Keyword, Message, Role};
use contextkeeper_core::snapshot::{ContextSnapshot, TurnSnapshot};
use serde::Serialize;

use crate::routing::{RoutingPolicy, TierAction};

/// Default Turn Context cap (about three user/assistant pairs).
pub const DEFAULT_MAX_TURNS: usize = 6;

/// How many of the most recent turns the summary renders.
pub const RECENT_WINDOW: usize = 4;

const CORE_KEYWORD_LIMIT: usize = 5;
const EVOLVING_KEYWORDS_PER_ITEM: usize = 3;
const EVOLVING_KEYWORD_LIMIT: usize = 8;

/// A read-only view of all three tiers, detached from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSummary {
    pub core_problem: Option<String>,
    pub evolving_items: Vec<String>,
    /// `"{role}: {content}"` per line, oldest first, last [`RECENT_WINDOW`] turns.
    pub recent_conversation: String,
    pub core_keywords: Vec<Keyword>,
    pub evolving_keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextStats {
    pub has_core_problem: bool,
    pub evolving_items_count: usize,
    pub recent_messages_count: usize,
    pub total_keywords: usize,
}

#[derive(Debug, Clone)]
pub struct HierarchicalContextStore {
    core: Option<ContextItem>,
    evolving: Vec<ContextItem>,
    turn: VecDeque<Message>,
    max_turns: usize,
    policy: RoutingPolicy,
}

impl HierarchicalContextStore {
    pub fn new() -> Self {
        Self::with_max_turns(DEFAULT_MAX_TURNS)
    }

    /// Create an empty store with a Turn Context cap. A cap of zero is
    /// raised to one.
    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            core: None,
            evolving: Vec::new(),
            turn: VecDeque::new(),
            max_turns: max_turns.max(1),
            policy: RoutingPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Change the Turn Context cap, evicting the oldest messages that no
    /// longer fit. A cap of zero is raised to one.
    pub fn set_max_turns(&mut self, max_turns: usize) {
        self.max_turns = max_turns.max(1);
        self.evict_overflow();
    }

    pub fn core(&self) -> Option<&ContextItem> {
        self.core.as_ref()
    }

    pub fn evolving(&self) -> &[ContextItem] {
        &self.evolving
    }

    pub fn turn(&self) -> impl ExactSizeIterator<Item = &Message> {
        self.turn.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_none() && self.evolving.is_empty() && self.turn.is_empty()
    }

    /// Store a message in the Turn Context and, depending on its role and
    /// labels, in the Core and Evolving tiers.
    pub fn store_message(
        &mut self,
        content: &str,
        intent_labels: IntentLabels,
        role: Role,
        keywords: Option<Vec<Keyword>>,
    ) {
        let message = Message::new(role, content, intent_labels, keywords.unwrap_or_default());
        let actions = self.policy.route(message.role, &message.intent_labels);

        for action in actions {
            match action {
                TierAction::ReplaceCore => self.core = Some(ContextItem::from(&message)),
                TierAction::AppendEvolving => self.evolving.push(ContextItem::from(&message)),
            }
        }

        self.turn.push_back(message);
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.turn.len() > self.max_turns {
            self.turn.pop_front();
        }
    }

    pub fn get_context_summary(&self) -> ContextSummary {
        let skip = self.turn.len().saturating_sub(RECENT_WINDOW);
        let recent_conversation = self
            .turn
            .iter()
            .skip(skip)
            .map(|msg| format!("{}: {}", msg.role, msg.content))
            .collect::<Vec<_>>()
            .join("\n");

        ContextSummary {
            core_problem: self.core.as_ref().map(|item| item.content.clone()),
            evolving_items: self.evolving.iter().map(|item| item.content.clone()).collect(),
            recent_conversation: recent_conversation.trim().to_string(),
            core_keywords: self
                .core
                .as_ref()
                .map(|item| item.keywords.clone())
                .unwrap_or_default(),
            evolving_keywords: self
                .evolving
                .iter()
                .flat_map(|item| item.keywords.iter().cloned())
                .collect(),
        }
    }

    /// Top core keywords as a single label line, or `None` if there are none.
    pub fn core_keywords_text(&self) -> Option<String> {
        let core = self.core.as_ref()?;
        if core.keywords.is_empty() {
            return None;
        }
        let terms: Vec<&str> = core
            .keywords
            .iter()
            .take(CORE_KEYWORD_LIMIT)
            .map(|k| k.term.as_str())
            .collect();
        Some(format!("Key terms: {}", terms.join(", ")))
    }

    /// Leading keywords of each evolving item, de-duplicated in first-seen
    /// order, as a single label line.
    pub fn evolving_keywords_text(&self) -> Option<String> {
        let mut terms: Vec<&str> = Vec::new();
        for item in &self.evolving {
            for keyword in item.keywords.iter().take(EVOLVING_KEYWORDS_PER_ITEM) {
                if !terms.contains(&keyword.term.as_str()) {
                    terms.push(&keyword.term);
                }
            }
        }
        if terms.is_empty() {
            return None;
        }
        terms.truncate(EVOLVING_KEYWORD_LIMIT);
        Some(format!("Constraint terms: {}", terms.join(", ")))
    }

    pub fn get_stats(&self) -> ContextStats {
        let core_keywords = self.core.as_ref().map_or(0, |item| item.keywords.len());
        let evolving_keywords: usize = self.evolving.iter().map(|item| item.keywords.len()).sum();
        ContextStats {
            has_core_problem: self.core.is_some(),
            evolving_items_count: self.evolving.len(),
            recent_messages_count: self.turn.len(),
            total_keywords: core_keywords + evolving_keywords,
        }
    }

    pub fn export_state(&self) -> ContextSnapshot {
        ContextSnapshot {
            core: self.core.clone(),
            evolving: self.evolving.clone(),
            turn: TurnSnapshot {
                max_turns: self.max_turns,
                messages: self.turn.iter().cloned().collect(),
            },
        }
    }

    pub fn export_json(&self) -> contextkeeper_core::Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_state())?)
    }

    /// Replace the entire store state with a snapshot.
    ///
    /// The snapshot is validated first; on error the store is unchanged.
    pub fn import_state(&mut self, snapshot: ContextSnapshot) -> Result<(), ContextError> {
        snapshot.validate()?;
        self.core = snapshot.core;
        self.evolving = snapshot.evolving;
        self.turn = snapshot.turn.messages.into();
        self.max_turns = snapshot.turn.max_turns;
        Ok(())
    }

    pub fn import_json(&mut self, json: &str) -> Result<(), ContextError> {
        let snapshot = ContextSnapshot::from_json(json)?;
        self.import_state(snapshot)
    }

    /// Empty all three tiers. Configuration is kept.
    pub fn clear_all(&mut self) {
        self.core = None;
        self.evolving.clear();
        self.turn.clear();
    }
}

impl Default for HierarchicalContextStore {
    fn default() -> Self {
        Self::new()
    }
}
