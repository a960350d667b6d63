//! `contextkeeper export` / `contextkeeper import`: Move context between
//! sessions as JSON snapshot files.

use std::path::Path;

use serde_json::json;

use super::{CommandResult, emit, tools};

pub async fn export(session: &str, output: Option<&Path>) -> CommandResult {
    let envelope = tools().await?.export_context(session).await;
    let Some(path) = output else {
        return emit(&envelope);
    };

    if envelope["success"] != true {
        return emit(&envelope);
    }
    std::fs::write(path, serde_json::to_string_pretty(&envelope["data"])?)?;
    emit(&json!({
        "success": true,
        "session_id": session,
        "output": path.display().to_string(),
        "items_count": envelope["metadata"]["items_count"],
    }))
}

pub async fn import(file: &Path, session: &str) -> CommandResult {
    let json_state = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    emit(&tools().await?.import_context(&json_state, session).await)
}
