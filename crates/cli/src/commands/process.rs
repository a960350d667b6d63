//! `contextkeeper process` / `contextkeeper reply`: Store one turn.

use super::{CommandResult, build_tools, emit, label_classifier, load_config, tools};

pub async fn run(message: &str, session: Option<&str>, labels: &[String]) -> CommandResult {
    let config = load_config()?;
    let tools = build_tools(&config, label_classifier(labels)).await;
    emit(&tools.process_message(message, session).await)
}

pub async fn reply(session: &str, message: &str) -> CommandResult {
    emit(&tools().await?.record_reply(session, message).await)
}
