//! # contextkeeper core
//!
//! Domain types, traits, and error definitions for contextkeeper, the
//! per-conversation memory that keeps long LLM dialogues consistent.
//! This crate has **no runtime dependencies** beyond serde and friends. It
//! defines the domain model that the other crates implement against.
//!
//! ## Layout
//!
//! - [`message`]: messages, context items, keywords, and intent labels
//! - [`session`]: opaque session identifiers
//! - [`snapshot`]: the persisted snapshot document and its backend trait
//! - [`classifier`]: the seam to the external intent classifier
//! - [`error`]: the error taxonomy shared by every crate

pub mod classifier;
pub mod error;
pub mod message;
pub mod session;
pub mod snapshot;

// Re-export key types at crate root for ergonomics
pub use classifier::{IntentClassifier, IntentResult};
pub use error::{Error, Result};
pub use message::{ContextItem, IntentLabel, IntentLabels, Keyword, Message, Role};
pub use session::SessionId;
pub use snapshot::{ContextSnapshot, SnapshotBackend, TurnSnapshot};
