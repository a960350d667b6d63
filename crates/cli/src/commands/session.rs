//! `contextkeeper session`: Session lifecycle commands.

use super::{CommandResult, emit, tools};

pub async fn start() -> CommandResult {
    emit(&tools().await?.start_session().await)
}

pub async fn end(id: &str) -> CommandResult {
    emit(&tools().await?.end_session(id).await)
}

pub async fn list() -> CommandResult {
    emit(&tools().await?.list_sessions().await)
}

pub async fn stats(id: &str) -> CommandResult {
    emit(&tools().await?.get_session_stats(id).await)
}

pub async fn clear(id: &str) -> CommandResult {
    emit(&tools().await?.clear_context(id).await)
}
