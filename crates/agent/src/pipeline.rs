//! Message pipeline: classify → extract keywords → store → guide.
//!
//! This is the per-message orchestration the tool surface and the CLI sit
//! on. The classifier is an external seam; when it fails the message is
//! stored as `UNCLEAR` rather than dropped.

use std::sync::Arc;
use std::time::Instant;

use contextkeeper_core::classifier::{IntentClassifier, IntentResult};
use contextkeeper_core::message::{IntentLabels, Keyword, Role};
use contextkeeper_core::session::SessionId;
use contextkeeper_memory::KeywordExtractor;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::guidance::{TaskGuidance, build_guidance};
use crate::session::SessionManager;
use crate::synthesis::{PromptSynthesisEngine, SynthesisDebugInfo};

/// Keywords stored per processed user message.
pub const DEFAULT_MESSAGE_TOP_K: usize = 3;

const CALLER_LABELS_REASON: &str = "Labels supplied by caller";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
}

impl Confidence {
    /// A single label is a confident call; several are a hedge.
    fn for_labels(labels: &IntentLabels) -> Self {
        if labels.len() == 1 {
            Self::High
        } else {
            Self::Medium
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntentAnalysis {
    pub intent: IntentLabels,
    pub reason: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextState {
    pub core_problem: Option<String>,
    pub constraints: Vec<String>,
    pub recent_turns: usize,
}

/// Result of processing one user message.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub session_id: SessionId,
    /// Whether the message opened a new session.
    pub created_new_session: bool,
    pub intent_analysis: IntentAnalysis,
    pub keyword_analysis: Vec<Keyword>,
    pub task_guidance: TaskGuidance,
    pub context_state: ContextState,
    pub processing_time_ms: u64,
}

pub struct MessagePipeline {
    sessions: Arc<SessionManager>,
    keywords: Arc<KeywordExtractor>,
    classifier: Arc<dyn IntentClassifier>,
    message_top_k: usize,
}

impl MessagePipeline {
    pub fn new(
        sessions: Arc<SessionManager>,
        keywords: Arc<KeywordExtractor>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        Self {
            sessions,
            keywords,
            classifier,
            message_top_k: DEFAULT_MESSAGE_TOP_K,
        }
    }

    pub fn with_message_top_k(mut self, top_k: usize) -> Self {
        self.message_top_k = top_k.max(1);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn keywords(&self) -> &Arc<KeywordExtractor> {
        &self.keywords
    }

    pub fn classifier(&self) -> &Arc<dyn IntentClassifier> {
        &self.classifier
    }

    /// Resolve `requested` to a live session, starting a fresh one when it
    /// is absent or unknown. The flag reports whether a session was created.
    pub async fn resolve_session(&self, requested: Option<&SessionId>) -> (SessionId, bool) {
        if let Some(id) = requested {
            if self.sessions.session_exists(id).await {
                return (id.clone(), false);
            }
            warn!(session_id = %id, "Unknown session, starting a new one");
        }
        (self.sessions.start_session().await, true)
    }

    /// Classify, falling back to `UNCLEAR` if the classifier fails.
    pub async fn classify(&self, message: &str) -> IntentResult {
        match self.classifier.classify(message).await {
            Ok(result) => result,
            Err(e) => {
                warn!(classifier = self.classifier.name(), error = %e, "Intent classification failed, using UNCLEAR");
                IntentResult::fallback(&e)
            }
        }
    }

    pub async fn process_message(
        &self,
        message: &str,
        session_id: Option<&SessionId>,
    ) -> Result<ProcessOutcome, PipelineError> {
        self.process_labeled(message, session_id, None).await
    }

    /// Like [`MessagePipeline::process_message`], but `Some(labels)` skips
    /// the classifier and uses the caller's labels instead.
    pub async fn process_labeled(
        &self,
        message: &str,
        session_id: Option<&SessionId>,
        labels: Option<IntentLabels>,
    ) -> Result<ProcessOutcome, PipelineError> {
        let started = Instant::now();
        let (session_id, created_new_session) = self.resolve_session(session_id).await;

        let intent = match labels {
            Some(labels) => IntentResult {
                labels,
                reason: CALLER_LABELS_REASON.to_string(),
            },
            None => self.classify(message).await,
        };
        let keywords = self.keywords.extract_keywords(message, self.message_top_k);

        let labels = intent.labels.clone();
        let stored_keywords = keywords.clone();
        let (stats, context_state) = self
            .sessions
            .with_session_mut(&session_id, |store| {
                store.store_message(message, labels, Role::User, Some(stored_keywords));
                let state = ContextState {
                    core_problem: store.core().map(|item| item.content.clone()),
                    constraints: store.evolving().iter().map(|item| item.content.clone()).collect(),
                    recent_turns: store.turn().len(),
                };
                (store.get_stats(), state)
            })
            .await
            .ok_or_else(|| PipelineError::SessionNotFound(session_id.clone()))?;

        let task_guidance = build_guidance(&intent.labels, &stats, &keywords);
        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            session_id = %session_id,
            labels = intent.labels.len(),
            keywords = keywords.len(),
            processing_time_ms,
            "Message processed"
        );

        Ok(ProcessOutcome {
            session_id,
            created_new_session,
            intent_analysis: IntentAnalysis {
                confidence: Confidence::for_labels(&intent.labels),
                intent: intent.labels,
                reason: intent.reason,
            },
            keyword_analysis: keywords,
            task_guidance,
            context_state,
            processing_time_ms,
        })
    }

    /// Store the main model's reply. Replies carry no labels, so they only
    /// reach the Turn Context.
    pub async fn record_reply(&self, session_id: &SessionId, reply: &str) -> Result<(), PipelineError> {
        let stored = self
            .sessions
            .store_message(session_id, reply, IntentLabels::new(), Role::Assistant, None)
            .await;
        if !stored {
            return Err(PipelineError::SessionNotFound(session_id.clone()));
        }
        debug!(session_id = %session_id, "Reply recorded");
        Ok(())
    }

    pub async fn synthesize_prompt(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<String, PipelineError> {
        self.sessions
            .with_session(session_id, |store| {
                PromptSynthesisEngine::new(store).synthesize_prompt(message)
            })
            .await
            .ok_or_else(|| PipelineError::SessionNotFound(session_id.clone()))
    }

    pub async fn prompt_debug_info(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<SynthesisDebugInfo, PipelineError> {
        self.sessions
            .with_session(session_id, |store| {
                PromptSynthesisEngine::new(store).create_debug_info(message)
            })
            .await
            .ok_or_else(|| PipelineError::SessionNotFound(session_id.clone()))
    }
}
