//! End-to-end integration tests for contextkeeper.
//!
//! These tests drive the full stack the CLI wires together: config →
//! snapshot backend → session manager → pipeline → tool envelopes, with a
//! scripted classifier standing in for the remote model.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use contextkeeper_agent::{ContextTools, MessagePipeline, SessionManager};
use contextkeeper_config::AppConfig;
use contextkeeper_core::classifier::{IntentClassifier, IntentResult};
use contextkeeper_core::error::ClassifierError;
use contextkeeper_core::message::{IntentLabels, Role};
use contextkeeper_core::session::SessionId;
use contextkeeper_memory::{FileSnapshots, HierarchicalContextStore, KeywordExtractor};
use serde_json::{Value, json};
use tempfile::TempDir;

// ── Scripted Classifier ──────────────────────────────────────────────────

/// Returns scripted label sets in sequence; `None` entries simulate an
/// unreachable classifier.
struct ScriptedClassifier {
    replies: Mutex<Vec<Option<Vec<&'static str>>>>,
    calls: Mutex<usize>,
}

impl ScriptedClassifier {
    fn new(replies: Vec<Option<Vec<&'static str>>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl IntentClassifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn classify(&self, _text: &str) -> Result<IntentResult, ClassifierError> {
        let mut calls = self.calls.lock().unwrap();
        let replies = self.replies.lock().unwrap();
        let reply = replies.get(*calls).cloned().flatten();
        *calls += 1;
        match reply {
            Some(labels) => Ok(IntentResult {
                labels: labels.into_iter().collect(),
                reason: "scripted".into(),
            }),
            None => Err(ClassifierError::Unreachable("classifier offline".into())),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn config_in(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config
        .apply_overrides(|key| match key {
            "CONTEXTKEEPER_SESSIONS_DIR" => Some(dir.path().join("sessions").display().to_string()),
            _ => None,
        })
        .unwrap();
    config
}

async fn tools_for(config: &AppConfig, classifier: Arc<dyn IntentClassifier>) -> ContextTools {
    let sessions = SessionManager::load(
        Arc::new(FileSnapshots::new(config.sessions_dir())),
        config.context.max_turns,
    )
    .await;
    ContextTools::new(
        MessagePipeline::new(Arc::new(sessions), Arc::new(KeywordExtractor::new()), classifier)
            .with_message_top_k(config.keywords.message_top_k),
    )
    .with_debug_top_k(config.keywords.top_k)
}

fn session_of(value: &Value) -> SessionId {
    SessionId::from(value["session_id"].as_str().unwrap())
}

fn labels(names: &[&str]) -> IntentLabels {
    names.iter().copied().collect()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_meeting_notes_dialogue() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let classifier = Arc::new(ScriptedClassifier::new(vec![
        Some(vec!["PROBLEM_DEFINITION"]),
        Some(vec!["CONSTRAINT_ADDITION"]),
        Some(vec!["QUESTION"]),
    ]));
    let tools = tools_for(&config, classifier.clone()).await;
    let pipeline = tools.pipeline();

    let started = tools.start_session().await;
    let id = session_of(&started);

    tools
        .process_message("AIで議事録を自動要約したい", Some(id.as_str()))
        .await;
    pipeline.record_reply(&id, "承知しました。").await.unwrap();
    tools.process_message("オープンソース限定", Some(id.as_str())).await;
    let third = tools
        .process_message("どのライブラリがいい？", Some(id.as_str()))
        .await;

    assert_eq!(classifier.calls(), 3);
    assert_eq!(third["context_state"]["core_problem"], "AIで議事録を自動要約したい");
    assert_eq!(third["context_state"]["constraints"][0], "オープンソース限定");
    assert_eq!(third["context_state"]["recent_turns"], 4);

    let summary = pipeline.sessions().summary(&id).await.unwrap();
    assert_eq!(summary.core_problem.as_deref(), Some("AIで議事録を自動要約したい"));
    assert_eq!(summary.evolving_items, vec!["オープンソース限定"]);

    let prompt = pipeline.synthesize_prompt(&id, "どのライブラリがいい？").await.unwrap();
    assert!(prompt.contains("**Primary problem**: AIで議事録を自動要約したい"));
    assert!(prompt.contains("- オープンソース限定"));
    assert!(prompt.contains("assistant: 承知しました。"));
    assert!(prompt.ends_with("# User's Current Message\nどのライブラリがいい？"));
}

#[tokio::test]
async fn e2e_sessions_survive_restart() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);

    let id = {
        let classifier = Arc::new(ScriptedClassifier::new(vec![
            Some(vec!["PROBLEM_DEFINITION"]),
            Some(vec!["REFINEMENT"]),
        ]));
        let tools = tools_for(&config, classifier).await;
        let id = session_of(&tools.process_message("Plan a week in Lisbon", None).await);
        tools.process_message("Mostly museums", Some(id.as_str())).await;
        id
    };

    // A second process over the same directory.
    let tools = tools_for(&config, Arc::new(ScriptedClassifier::new(vec![]))).await;
    let stats = tools.get_session_stats(id.as_str()).await;
    assert_eq!(stats["success"], true);
    assert_eq!(stats["has_core_problem"], true);
    assert_eq!(stats["evolving_items_count"], 1);
    assert_eq!(stats["recent_messages_count"], 2);

    let ended = tools.end_session(id.as_str()).await;
    assert_eq!(ended["success"], true);
    assert!(!tmp.path().join("sessions").join(format!("{id}.json")).exists());

    let tools = tools_for(&config, Arc::new(ScriptedClassifier::new(vec![]))).await;
    assert_eq!(tools.list_sessions().await["total_sessions"], 0);
}

#[tokio::test]
async fn e2e_empty_session_persists_before_first_use() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);

    let id = {
        let tools = tools_for(&config, Arc::new(ScriptedClassifier::new(vec![]))).await;
        session_of(&tools.start_session().await)
    };

    let tools = tools_for(&config, Arc::new(ScriptedClassifier::new(vec![]))).await;
    let listed = tools.list_sessions().await;
    assert_eq!(listed["active_sessions"][0], id.as_str());
    assert_eq!(listed["summary"]["empty_sessions"], 1);
}

#[tokio::test]
async fn e2e_corrupt_snapshot_is_skipped_on_startup() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);

    let good = {
        let tools = tools_for(&config, Arc::new(ScriptedClassifier::new(vec![]))).await;
        session_of(&tools.start_session().await)
    };
    std::fs::write(config.sessions_dir().join("broken.json"), "{\"core\": ").unwrap();

    let tools = tools_for(&config, Arc::new(ScriptedClassifier::new(vec![]))).await;
    let listed = tools.list_sessions().await;
    assert_eq!(listed["total_sessions"], 1);
    assert_eq!(listed["active_sessions"][0], good.as_str());
}

#[tokio::test]
async fn e2e_classifier_outage_degrades_to_unclear() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let classifier = Arc::new(ScriptedClassifier::new(vec![
        Some(vec!["PROBLEM_DEFINITION"]),
        None,
    ]));
    let tools = tools_for(&config, classifier).await;

    let id = session_of(&tools.process_message("Write a parser", None).await);
    let second = tools.process_message("hmm, also json", Some(id.as_str())).await;

    assert_eq!(second["success"], true);
    assert_eq!(second["intent_analysis"]["intent"][0], "UNCLEAR");
    assert_eq!(second["task_guidance"]["priority_level"], "low");
    assert_eq!(second["context_state"]["core_problem"], "Write a parser");
    assert_eq!(second["context_state"]["constraints"].as_array().unwrap().len(), 0);
    assert_eq!(second["context_state"]["recent_turns"], 2);
}

#[tokio::test]
async fn e2e_export_import_round_trip_across_sessions() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let classifier = Arc::new(ScriptedClassifier::new(vec![
        Some(vec!["PROBLEM_DEFINITION"]),
        Some(vec!["CONSTRAINT_ADDITION", "REFINEMENT"]),
        Some(vec!["QUESTION"]),
    ]));
    let tools = tools_for(&config, classifier).await;
    let pipeline = tools.pipeline();

    let source = session_of(&tools.process_message("Build a CLI todo app", None).await);
    tools.process_message("Rust only, no async", Some(source.as_str())).await;
    pipeline.record_reply(&source, "Noted.").await.unwrap();
    tools.process_message("Which crates?", Some(source.as_str())).await;

    let exported = tools.export_context(source.as_str()).await;
    let imported = tools
        .import_context(&exported["data"].to_string(), "fresh-target")
        .await;
    assert_eq!(imported["success"], true);
    assert_eq!(imported["created_new_session"], true);
    assert_eq!(imported["imported_data"]["evolving_items"], 1);
    assert_eq!(imported["imported_data"]["turn_items"], 4);

    let target = session_of(&imported);
    let sessions = pipeline.sessions();
    assert_eq!(sessions.summary(&source).await, sessions.summary(&target).await);
    assert_eq!(
        sessions.get_session_stats(&source).await.unwrap().stats,
        sessions.get_session_stats(&target).await.unwrap().stats
    );
    assert_eq!(
        pipeline.synthesize_prompt(&source, "next").await.unwrap(),
        pipeline.synthesize_prompt(&target, "next").await.unwrap()
    );
}

#[tokio::test]
async fn e2e_turn_window_respects_configured_cap() {
    let tmp = TempDir::new().unwrap();
    let mut config = config_in(&tmp);
    config
        .apply_overrides(|key| (key == "CONTEXTKEEPER_MAX_TURNS").then(|| "3".to_string()))
        .unwrap();

    let sessions = SessionManager::load(
        Arc::new(FileSnapshots::new(config.sessions_dir())),
        config.context.max_turns,
    )
    .await;
    let id = sessions.start_session().await;
    for i in 0..5 {
        sessions
            .store_message(&id, &format!("m{i}"), labels(&["CONSTRAINT_ADDITION"]), Role::User, None)
            .await;
    }

    let handle = sessions.get_context(&id).await.unwrap();
    let store = handle.read().await;
    let kept: Vec<&str> = store.turn().map(|m| m.content.as_str()).collect();
    assert_eq!(kept, vec!["m2", "m3", "m4"]);
    assert_eq!(store.evolving().len(), 5);
    drop(store);

    // The cap travels with the snapshot.
    let saved = std::fs::read_to_string(config.sessions_dir().join(format!("{id}.json"))).unwrap();
    let mut reloaded = HierarchicalContextStore::new();
    reloaded.import_json(&saved).unwrap();
    assert_eq!(reloaded.max_turns(), 3);
    assert_eq!(reloaded.turn().len(), 3);
}

#[tokio::test]
async fn e2e_unknown_session_envelopes() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let tools = tools_for(&config, Arc::new(ScriptedClassifier::new(vec![]))).await;

    for envelope in [
        tools.export_context("ghost").await,
        tools.end_session("ghost").await,
        tools.clear_context("ghost").await,
        tools.get_session_stats("ghost").await,
    ] {
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error_code"], "SESSION_NOT_FOUND");
    }

    let ghost = SessionId::from("ghost");
    assert!(tools.pipeline().record_reply(&ghost, "x").await.is_err());
    assert!(tools.pipeline().synthesize_prompt(&ghost, "x").await.is_err());
}

#[tokio::test]
async fn e2e_request_loop_accumulates_keyword_corpus() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let tools = tools_for(&config, Arc::new(ScriptedClassifier::new(vec![]))).await;

    let mut output: Vec<u8> = Vec::new();
    tools
        .serve(r#"{"id": 1, "tool": "start_session"}"#.as_bytes(), &mut output)
        .await
        .unwrap();
    let started: Value = serde_json::from_slice(&output).unwrap();
    let id = session_of(&started);

    let requests = [
        json!({"id": 2, "tool": "process_message", "arguments": {
            "message": "warm up the corpus", "session_id": id, "labels": ["QUESTION"]}}),
        json!({"id": 3, "tool": "process_message", "arguments": {
            "message": "Summarize meeting notes automatically", "session_id": id,
            "labels": ["PROBLEM_DEFINITION"]}}),
        json!({"id": 4, "tool": "process_message", "arguments": {
            "message": "Open source only", "session_id": id,
            "labels": ["CONSTRAINT_ADDITION"]}}),
        json!({"id": 5, "tool": "synthesize_prompt", "arguments": {
            "session_id": id, "message": "Which library?"}}),
    ];
    let input: String = requests.iter().map(|r| format!("{r}\n")).collect();

    let mut output: Vec<u8> = Vec::new();
    let handled = tools.serve(input.as_bytes(), &mut output).await.unwrap();
    assert_eq!(handled, 4);

    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    // Only the first document of the corpus scores nothing.
    assert_eq!(responses[0]["keyword_analysis"].as_array().unwrap().len(), 0);
    let terms = |response: &Value| -> Vec<String> {
        response["keyword_analysis"]
            .as_array()
            .unwrap()
            .iter()
            .map(|k| k["keyword"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(terms(&responses[1]), vec!["summarize", "meeting", "notes"]);
    assert_eq!(terms(&responses[2]), vec!["open", "source", "only"]);
    assert!(responses.iter().all(|r| r["session_id"] == id.as_str()));

    let prompt = responses[3]["prompt"].as_str().unwrap();
    assert!(prompt.contains("Key terms: summarize, meeting, notes"));
    assert!(prompt.contains("Constraint terms: open, source, only"));
    assert_eq!(responses[3]["id"], 5);
}
