//! Context memory implementations for contextkeeper: keyword extraction,
//! the tiered context store, and snapshot backends.

pub mod file_backend;
pub mod in_memory;
pub mod keywords;
pub mod noop;
pub mod routing;
pub mod store;

pub use file_backend::FileSnapshots;
pub use in_memory::InMemorySnapshots;
pub use keywords::{CorpusStats, KeywordExtractor};
pub use noop::NoopSnapshots;
pub use routing::{RoutingPolicy, TierAction};
pub use store::{
    ContextStats, ContextSummary, DEFAULT_MAX_TURNS, HierarchicalContextStore, RECENT_WINDOW,
};
