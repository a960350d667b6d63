//! Command implementations and the shared runtime they run on.
//!
//! Every invocation is a fresh process: sessions carry over between commands
//! only through the snapshot directory, and the keyword corpus starts empty.

pub mod init;
pub mod process;
pub mod prompt;
pub mod serve;
pub mod session;
pub mod snapshot;
pub mod status;

use std::sync::Arc;

use contextkeeper_agent::{ContextTools, MessagePipeline, SessionManager, StaticClassifier};
use contextkeeper_config::AppConfig;
use contextkeeper_core::classifier::IntentClassifier;
use contextkeeper_core::message::IntentLabels;
use contextkeeper_core::snapshot::SnapshotBackend;
use contextkeeper_memory::{FileSnapshots, KeywordExtractor, NoopSnapshots};
use serde_json::Value;
use tracing::debug;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The snapshot backend selected by `[sessions]`.
pub fn snapshot_backend(config: &AppConfig) -> Arc<dyn SnapshotBackend> {
    if config.sessions.persist {
        Arc::new(FileSnapshots::new(config.sessions_dir()))
    } else {
        Arc::new(NoopSnapshots)
    }
}

/// Restore persisted sessions and wire up the tool surface.
pub async fn build_tools(config: &AppConfig, classifier: Arc<dyn IntentClassifier>) -> ContextTools {
    let sessions =
        SessionManager::load(snapshot_backend(config), config.context.max_turns).await;
    let restored = sessions.session_count().await;
    debug!(
        backend = sessions.backend_name(),
        sessions = restored,
        classifier = classifier.name(),
        "Runtime ready"
    );
    let pipeline = MessagePipeline::new(
        Arc::new(sessions),
        Arc::new(KeywordExtractor::new()),
        classifier,
    )
    .with_message_top_k(config.keywords.message_top_k);
    ContextTools::new(pipeline).with_debug_top_k(config.keywords.top_k)
}

/// Tools for commands that never classify.
pub async fn tools() -> Result<ContextTools, Box<dyn std::error::Error>> {
    let config = load_config()?;
    Ok(build_tools(&config, Arc::new(StaticClassifier::unclear())).await)
}

/// A classifier that answers with the `--label` flags, or `UNCLEAR` when
/// none were given.
pub fn label_classifier(labels: &[String]) -> Arc<dyn IntentClassifier> {
    if labels.is_empty() {
        return Arc::new(StaticClassifier::unclear());
    }
    let labels: IntentLabels = labels.iter().map(|l| l.trim().to_uppercase()).collect();
    Arc::new(StaticClassifier::new(labels).with_reason("Labels supplied on the command line"))
}

/// Print an envelope as pretty JSON. A failed envelope becomes an error so
/// the process exits non-zero.
pub fn emit(envelope: &Value) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    if envelope["success"] == Value::Bool(false) {
        let code = envelope["error_code"].as_str().unwrap_or("ERROR");
        let error = envelope["error"].as_str().unwrap_or("unknown error");
        return Err(format!("{code}: {error}").into());
    }
    Ok(())
}
