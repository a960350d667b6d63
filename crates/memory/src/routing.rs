//! Label-to-tier routing policy.
//!
//! Which long-lived tier a message touches is decided by a table mapping
//! intent labels to tier actions. The table is evaluated once per message;
//! each action fires at most once no matter how many labels map to it.
//! Messages whose labels match nothing (including `UNCLEAR` or an empty
//! set) only ever land in the Turn Context.

use contextkeeper_core::message::{IntentLabel, IntentLabels, Role};

/// A mutation of a long-lived tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierAction {
    /// Overwrite the Core Context slot.
    ReplaceCore,
    /// Append one item to the Evolving Context.
    AppendEvolving,
}

#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    rules: Vec<(IntentLabel, TierAction)>,
}

impl RoutingPolicy {
    pub fn new(rules: Vec<(IntentLabel, TierAction)>) -> Self {
        Self { rules }
    }

    /// Actions for a message, in rule-table order, without duplicates.
    ///
    /// Assistant messages never reach the long-lived tiers.
    pub fn route(&self, role: Role, labels: &IntentLabels) -> Vec<TierAction> {
        if role != Role::User {
            return Vec::new();
        }
        let mut actions = Vec::new();
        for (label, action) in &self.rules {
            if labels.contains(label) && !actions.contains(action) {
                actions.push(*action);
            }
        }
        actions
    }
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::new(vec![
            (IntentLabel::ProblemDefinition, TierAction::ReplaceCore),
            (IntentLabel::ConstraintAddition, TierAction::AppendEvolving),
            (IntentLabel::Refinement, TierAction::AppendEvolving),
        ])
    }
}
