//! Conversation-level services for contextkeeper.
//!
//! - [`session`]: session lifecycle, per-session locking, write-through snapshots
//! - [`synthesis`]: four-section prompt assembly from a context store
//! - [`pipeline`]: classify → extract → store → guide, per user message
//! - [`guidance`]: next-step templates keyed by intent
//! - [`tools`]: JSON envelopes for an orchestration layer
//! - [`classifier`]: built-in [`IntentClassifier`](contextkeeper_core::IntentClassifier) impls

pub mod classifier;
pub mod guidance;
pub mod pipeline;
pub mod session;
pub mod synthesis;
pub mod tools;

pub use classifier::StaticClassifier;
pub use guidance::{ContextAwareness, Priority, TaskGuidance, build_guidance};
pub use pipeline::{
    Confidence, ContextState, IntentAnalysis, MessagePipeline, PipelineError, ProcessOutcome,
};
pub use session::{SessionHandle, SessionManager, SessionStats};
pub use synthesis::{PromptSynthesisEngine, SynthesisDebugInfo};
pub use tools::ContextTools;
