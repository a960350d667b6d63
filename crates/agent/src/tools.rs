//! Tool surface: JSON envelopes over the pipeline and session manager.
//!
//! Every operation returns a `serde_json::Value`. Failures never escape as
//! errors; they come back as `{"success": false, "error", "error_code"}`
//! so an orchestration layer can hand them straight to its caller.
//!
//! [`ContextTools::serve`] exposes the same operations as a JSON-lines
//! request loop, one `{"tool": ..., "arguments": {...}}` object per line.
//! The runtime (sessions, keyword corpus, classifier) lives for the whole
//! loop, so corpus statistics accumulate across requests.

use contextkeeper_core::message::IntentLabels;
use contextkeeper_core::session::SessionId;
use contextkeeper_core::snapshot::ContextSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::guidance::build_guidance;
use crate::pipeline::MessagePipeline;
use crate::session::SessionStats;

pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
pub const INVALID_JSON: &str = "INVALID_JSON";
pub const IMPORT_FAILED: &str = "IMPORT_FAILED";
pub const UNKNOWN_TOOL: &str = "UNKNOWN_TOOL";
pub const INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";
pub const SERIALIZATION_FAILED: &str = "SERIALIZATION_FAILED";

/// One line of the request loop.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    /// Echoed back on the response when present.
    #[serde(default)]
    pub id: Option<Value>,
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Keywords reported by [`ContextTools::get_debug_info`].
const DEBUG_TOP_K: usize = 5;

pub struct ContextTools {
    pipeline: MessagePipeline,
    debug_top_k: usize,
}

impl ContextTools {
    pub fn new(pipeline: MessagePipeline) -> Self {
        Self {
            pipeline,
            debug_top_k: DEBUG_TOP_K,
        }
    }

    pub fn with_debug_top_k(mut self, top_k: usize) -> Self {
        self.debug_top_k = top_k.max(1);
        self
    }

    pub fn pipeline(&self) -> &MessagePipeline {
        &self.pipeline
    }

    // ── Messages ──────────────────────────────────────────────────────────

    pub async fn process_message(&self, message: &str, session_id: Option<&str>) -> Value {
        self.process_labeled(message, session_id, None).await
    }

    /// [`ContextTools::process_message`] with caller-supplied labels in
    /// place of the classifier.
    pub async fn process_labeled(
        &self,
        message: &str,
        session_id: Option<&str>,
        labels: Option<IntentLabels>,
    ) -> Value {
        let requested = session_id.map(SessionId::from);
        match self
            .pipeline
            .process_labeled(message, requested.as_ref(), labels)
            .await
        {
            Ok(outcome) => success(&outcome),
            Err(e) => failure(SESSION_NOT_FOUND, e, json!({ "session_id": session_id })),
        }
    }

    pub async fn record_reply(&self, session_id: &str, reply: &str) -> Value {
        let id = SessionId::from(session_id);
        match self.pipeline.record_reply(&id, reply).await {
            Ok(()) => json!({
                "success": true,
                "session_id": id,
                "message": "Reply recorded",
            }),
            Err(_) => not_found(&id),
        }
    }

    pub async fn synthesize_prompt(&self, session_id: &str, message: &str) -> Value {
        let id = SessionId::from(session_id);
        match self.pipeline.synthesize_prompt(&id, message).await {
            Ok(prompt) => json!({
                "success": true,
                "session_id": id,
                "prompt": prompt,
            }),
            Err(_) => not_found(&id),
        }
    }

    /// Classify and extract keywords for `message` without storing it.
    ///
    /// Keyword extraction still adds the message to the shared corpus.
    pub async fn get_debug_info(&self, message: &str, session_id: Option<&str>) -> Value {
        let requested = session_id.map(SessionId::from);
        let (id, _) = self.pipeline.resolve_session(requested.as_ref()).await;

        let intent = self.pipeline.classify(message).await;
        let keywords = self.pipeline.keywords().extract_keywords(message, self.debug_top_k);
        let sessions = self.pipeline.sessions();

        let Some(stats) = sessions.get_session_stats(&id).await else {
            return not_found(&id);
        };
        let task_guidance = build_guidance(&intent.labels, &stats.stats, &keywords);
        let summary = sessions.summary(&id).await;
        let prompt = self.pipeline.prompt_debug_info(&id, message).await.ok();

        json!({
            "success": true,
            "session_id": id,
            "message": message,
            "intent_classification": {
                "intent": intent.labels,
                "reason": intent.reason,
            },
            "keyword_extraction": {
                "keywords": keywords,
                "extraction_method": "TF-IDF",
                "corpus_stats": self.pipeline.keywords().get_corpus_stats(),
            },
            "task_guidance": task_guidance,
            "context_summary": summary,
            "prompt_synthesis": prompt,
            "system_stats": {
                "classifier": self.pipeline.classifier().name(),
                "persistence": sessions.backend_name(),
                "context_levels": ["core", "evolving", "turn"],
                "session_stats": stats,
            },
        })
    }

    // ── Context import / export ───────────────────────────────────────────

    pub async fn export_context(&self, session_id: &str) -> Value {
        let id = SessionId::from(session_id);
        let Some(snapshot) = self.pipeline.sessions().export_context(&id).await else {
            return failure(SESSION_NOT_FOUND, "Session not found", json!({ "data": null }));
        };

        let items_count = items_count(&snapshot);
        json!({
            "success": true,
            "data": snapshot,
            "metadata": {
                "session_id": id,
                "items_count": items_count,
            },
        })
    }

    /// Replace a session's state with `json_state`. An unknown id gets a
    /// fresh session; the snapshot is validated before any session is
    /// created or touched.
    pub async fn import_context(&self, json_state: &str, session_id: &str) -> Value {
        let raw: Value = match serde_json::from_str(json_state) {
            Ok(raw) => raw,
            Err(e) => {
                return failure(
                    INVALID_JSON,
                    format!("Invalid JSON format: {e}"),
                    json!({ "session_id": session_id }),
                );
            }
        };

        let snapshot = match serde_json::from_value::<ContextSnapshot>(raw)
            .map_err(|e| e.to_string())
            .and_then(|s| s.validate().map(|()| s).map_err(|e| e.to_string()))
        {
            Ok(snapshot) => snapshot,
            Err(reason) => {
                warn!(session_id, error = %reason, "Rejected context import");
                return failure(
                    IMPORT_FAILED,
                    format!("Failed to import context data: {reason}"),
                    json!({ "session_id": session_id }),
                );
            }
        };

        let requested = SessionId::from(session_id);
        let (id, created_new_session) = self.pipeline.resolve_session(Some(&requested)).await;
        let imported = items_count(&snapshot);

        match self.pipeline.sessions().import_context(&id, snapshot).await {
            Some(Ok(())) => json!({
                "success": true,
                "session_id": id,
                "created_new_session": created_new_session,
                "imported_data": imported,
                "message": "Context imported successfully",
            }),
            Some(Err(e)) => failure(
                IMPORT_FAILED,
                format!("Failed to import context data: {e}"),
                json!({ "session_id": id }),
            ),
            None => not_found(&id),
        }
    }

    // ── Sessions ──────────────────────────────────────────────────────────

    pub async fn start_session(&self) -> Value {
        let id = self.pipeline.sessions().start_session().await;
        json!({
            "success": true,
            "session_id": id,
            "message": "New session started successfully",
        })
    }

    pub async fn end_session(&self, session_id: &str) -> Value {
        self.end_with_report(session_id, "final_state", "Session ended successfully")
            .await
    }

    /// Same as [`ContextTools::end_session`], reported as a context clear.
    pub async fn clear_context(&self, session_id: &str) -> Value {
        self.end_with_report(session_id, "cleared_data", "Context cleared successfully")
            .await
    }

    pub async fn list_sessions(&self) -> Value {
        let sessions = self.pipeline.sessions();
        let ids = sessions.list_sessions().await;

        let mut details: Vec<SessionStats> = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(stats) = sessions.get_session_stats(id).await {
                details.push(stats);
            }
        }

        let with_problems = details.iter().filter(|s| s.stats.has_core_problem).count();
        let with_constraints = details
            .iter()
            .filter(|s| s.stats.evolving_items_count > 0)
            .count();
        let empty = details
            .iter()
            .filter(|s| !s.stats.has_core_problem && s.stats.evolving_items_count == 0)
            .count();

        json!({
            "success": true,
            "total_sessions": ids.len(),
            "active_sessions": ids,
            "session_details": details,
            "summary": {
                "sessions_with_problems": with_problems,
                "sessions_with_constraints": with_constraints,
                "empty_sessions": empty,
            },
        })
    }

    pub async fn get_session_stats(&self, session_id: &str) -> Value {
        let id = SessionId::from(session_id);
        match self.pipeline.sessions().get_session_stats(&id).await {
            Some(stats) => success(&stats),
            None => not_found(&id),
        }
    }

    // ── Request loop ──────────────────────────────────────────────────────

    /// Dispatch one request to the matching operation.
    pub async fn call(&self, request: &ToolRequest) -> Value {
        let args = &request.arguments;
        let result = match request.tool.as_str() {
            "process_message" => match (required(args, "message"), labels_arg(args)) {
                (Ok(message), Ok(labels)) => {
                    self.process_labeled(message, optional(args, "session_id"), labels)
                        .await
                }
                (Err(e), _) | (_, Err(e)) => e,
            },
            "record_reply" => match (required(args, "session_id"), required(args, "message")) {
                (Ok(id), Ok(message)) => self.record_reply(id, message).await,
                (Err(e), _) | (_, Err(e)) => e,
            },
            "synthesize_prompt" => {
                match (required(args, "session_id"), required(args, "message")) {
                    (Ok(id), Ok(message)) => self.synthesize_prompt(id, message).await,
                    (Err(e), _) | (_, Err(e)) => e,
                }
            }
            "get_debug_info" => match required(args, "message") {
                Ok(message) => {
                    self.get_debug_info(message, optional(args, "session_id"))
                        .await
                }
                Err(e) => e,
            },
            "export_context" => match required(args, "session_id") {
                Ok(id) => self.export_context(id).await,
                Err(e) => e,
            },
            "import_context" => {
                match (required(args, "json_state"), required(args, "session_id")) {
                    (Ok(state), Ok(id)) => self.import_context(state, id).await,
                    (Err(e), _) | (_, Err(e)) => e,
                }
            }
            "clear_context" => match required(args, "session_id") {
                Ok(id) => self.clear_context(id).await,
                Err(e) => e,
            },
            "start_session" => self.start_session().await,
            "end_session" => match required(args, "session_id") {
                Ok(id) => self.end_session(id).await,
                Err(e) => e,
            },
            "list_sessions" => self.list_sessions().await,
            "get_session_stats" => match required(args, "session_id") {
                Ok(id) => self.get_session_stats(id).await,
                Err(e) => e,
            },
            other => failure(
                UNKNOWN_TOOL,
                format!("Unknown tool: {other}"),
                json!({ "tool": other }),
            ),
        };
        with_request_id(result, request.id.as_ref())
    }

    /// Parse one request line and dispatch it.
    pub async fn handle_line(&self, line: &str) -> Value {
        match serde_json::from_str::<ToolRequest>(line) {
            Ok(request) => self.call(&request).await,
            Err(e) => failure(INVALID_JSON, format!("Invalid request: {e}"), json!({})),
        }
    }

    /// Answer JSON-lines requests from `reader` until EOF, one response
    /// line per non-blank request line. Returns the number of requests
    /// handled.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut handled = 0usize;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = self.handle_line(line).await;
            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;

            handled += 1;
            debug!(handled, "Tool request answered");
        }

        info!(handled, "Request loop finished");
        Ok(handled)
    }

    async fn end_with_report(&self, session_id: &str, report_key: &str, message: &str) -> Value {
        let id = SessionId::from(session_id);
        let sessions = self.pipeline.sessions();
        let before = sessions.get_session_stats(&id).await;

        if !sessions.end_session(&id).await {
            return failure(
                SESSION_NOT_FOUND,
                "Session not found or already ended",
                json!({ "session_id": id }),
            );
        }

        let report = before.map(|s| {
            json!({
                "had_core_problem": s.stats.has_core_problem,
                "evolving_items_count": s.stats.evolving_items_count,
                "turn_items_count": s.stats.recent_messages_count,
            })
        });
        let mut body = json!({
            "success": true,
            "session_id": id,
            "message": message,
        });
        body[report_key] = report.unwrap_or(Value::Null);
        body
    }
}

fn items_count(snapshot: &ContextSnapshot) -> Value {
    json!({
        "core_items": usize::from(snapshot.core.is_some()),
        "evolving_items": snapshot.evolving.len(),
        "turn_items": snapshot.turn.messages.len(),
    })
}

/// `{"success": true}` merged with the serialized fields of `body`. A body
/// that is not an object lands under `data`; one that cannot be serialized
/// becomes a failure envelope.
fn success<T: Serialize>(body: &T) -> Value {
    match serde_json::to_value(body) {
        Ok(Value::Object(mut map)) => {
            map.insert("success".to_string(), Value::Bool(true));
            Value::Object(map)
        }
        Ok(other) => json!({ "success": true, "data": other }),
        Err(e) => {
            warn!(error = %e, "Failed to serialize tool result");
            failure(
                SERIALIZATION_FAILED,
                format!("Failed to serialize result: {e}"),
                json!({}),
            )
        }
    }
}

/// A failure envelope; `extra` object fields are merged in.
fn failure(code: &str, error: impl ToString, extra: Value) -> Value {
    let mut body = json!({
        "success": false,
        "error": error.to_string(),
        "error_code": code,
    });
    if let (Value::Object(map), Value::Object(extra)) = (&mut body, extra) {
        map.extend(extra);
    }
    body
}

fn not_found(id: &SessionId) -> Value {
    failure(SESSION_NOT_FOUND, "Session not found", json!({ "session_id": id }))
}

fn with_request_id(mut response: Value, id: Option<&Value>) -> Value {
    if let (Value::Object(map), Some(id)) = (&mut response, id) {
        map.insert("id".to_string(), id.clone());
    }
    response
}

fn required<'a>(args: &'a Value, key: &str) -> Result<&'a str, Value> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| {
        failure(
            INVALID_ARGUMENTS,
            format!("Missing required string argument: {key}"),
            json!({}),
        )
    })
}

fn optional<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

/// `labels` is optional; when given it must be an array of strings. Labels
/// are trimmed and upper-cased.
fn labels_arg(args: &Value) -> Result<Option<IntentLabels>, Value> {
    let Some(raw) = args.get("labels").filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let invalid = || {
        failure(
            INVALID_ARGUMENTS,
            "labels must be an array of strings",
            json!({}),
        )
    };
    let items = raw.as_array().ok_or_else(invalid)?;
    let mut labels = Vec::with_capacity(items.len());
    for item in items {
        let label = item.as_str().ok_or_else(invalid)?;
        labels.push(label.trim().to_uppercase());
    }
    Ok(Some(labels.into_iter().collect()))
}
