//! Tests for StateManager

use super::*;
use crate::engine::Message;
use serde_json::json;
use tempfile::tempdir;

fn history(uri: &str, ts: &str) -> serde_json::Value {
    let mut entries = serde_json::Map::new();
    entries.insert(uri.to_string(), json!(ts));
    json!({
        "history": entries,
        "_ab_source_file_last_modified": format!("{ts}_{uri}")
    })
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_state_manager_new() {
    let manager = StateManager::new("/tmp/test-state.json");
    assert!(!manager.is_in_memory());
    assert_eq!(
        manager.path(),
        Some(std::path::Path::new("/tmp/test-state.json"))
    );
}

#[test]
fn test_state_manager_without_auto_save() {
    let manager = StateManager::without_auto_save("/tmp/test-state.json");
    assert!(!manager.is_in_memory());
}

#[test]
fn test_state_manager_in_memory() {
    let manager = StateManager::in_memory();
    assert!(manager.is_in_memory());
    assert!(manager.path().is_none());
}

#[tokio::test]
async fn test_state_manager_from_json() {
    let manager = StateManager::from_json(
        r#"{"streams": {"orders": {"history": {"a.csv": "2023-08-01T00:00:00.000000Z"}}}}"#,
    )
    .unwrap();
    assert!(manager.is_in_memory());

    let orders = manager.get_stream_state("orders").await.unwrap();
    assert_eq!(orders["history"]["a.csv"], "2023-08-01T00:00:00.000000Z");

    assert!(matches!(
        StateManager::from_json("not json"),
        Err(crate::error::Error::State { .. })
    ));
}

#[test]
fn test_state_manager_from_missing_file() {
    let dir = tempdir().unwrap();
    let manager = StateManager::from_file(dir.path().join("missing.json")).unwrap();
    assert!(!manager.is_in_memory());
}

// ============================================================================
// Stream State Tests
// ============================================================================

#[tokio::test]
async fn test_get_set_stream_state() {
    let manager = StateManager::in_memory();
    assert!(manager.get_stream_state("orders").await.is_none());

    let value = history("a.csv", "2023-08-01T00:00:00.000000Z");
    manager.set_stream_state("orders", value.clone()).await.unwrap();
    assert_eq!(manager.get_stream_state("orders").await, Some(value));

    let newer = history("b.csv", "2023-08-02T00:00:00.000000Z");
    manager.set_stream_state("orders", newer.clone()).await.unwrap();
    assert_eq!(manager.get_stream_state("orders").await, Some(newer));
}

#[tokio::test]
async fn test_apply_message() {
    let manager = StateManager::in_memory();

    let applied = manager
        .apply_message(&Message::state("orders", json!({"history": {}})))
        .await
        .unwrap();
    assert!(applied);

    let applied = manager
        .apply_message(&Message::info("not state"))
        .await
        .unwrap();
    assert!(!applied);

    // full-refresh marker is a state message but is not persisted
    manager
        .apply_message(&Message::state(
            "users",
            json!({"__ab_no_cursor_state_message": true}),
        ))
        .await
        .unwrap();

    let state = manager.state().await;
    assert_eq!(state.streams.len(), 1);
    assert!(state.get_stream("orders").is_some());
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::without_auto_save(&path);
    let value = history("a.csv", "2023-08-01T00:00:00.000000Z");
    manager.set_stream_state("orders", value.clone()).await.unwrap();
    assert!(!path.exists());
    manager.save().await.unwrap();

    let manager2 = StateManager::new(&path);
    manager2.load().await.unwrap();
    assert_eq!(manager2.get_stream_state("orders").await, Some(value));
}

#[tokio::test]
async fn test_persisted_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::without_auto_save(&path);
    manager
        .set_stream_state("orders", history("a.csv", "2023-08-01T00:00:00.000000Z"))
        .await
        .unwrap();
    manager.save().await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        raw["streams"]["orders"]["history"]["a.csv"],
        "2023-08-01T00:00:00.000000Z"
    );
    assert!(!dir.path().join("state.tmp").exists());
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nonexistent.json");

    let manager = StateManager::new(&path);
    manager.load().await.unwrap();
    assert!(manager.state().await.is_empty());
}

#[tokio::test]
async fn test_auto_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("auto_state.json");

    let manager = StateManager::new(&path);
    manager
        .set_stream_state("orders", json!({"history": {}}))
        .await
        .unwrap();

    let manager2 = StateManager::from_file(&path).unwrap();
    assert_eq!(
        manager2.get_stream_state("orders").await,
        Some(json!({"history": {}}))
    );
}

#[tokio::test]
async fn test_save_in_memory_noop() {
    let manager = StateManager::in_memory();
    manager
        .set_stream_state("orders", json!({"history": {}}))
        .await
        .unwrap();
    manager.save().await.unwrap();
}

#[tokio::test]
async fn test_save_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("export.json");

    let manager = StateManager::in_memory();
    manager
        .set_stream_state("orders", json!({"history": {}}))
        .await
        .unwrap();
    manager.save_to_file(&path).await.unwrap();

    let reloaded = StateManager::from_file(&path).unwrap();
    assert!(reloaded.get_stream_state("orders").await.is_some());
}

// ============================================================================
// Clear Tests
// ============================================================================

#[tokio::test]
async fn test_clear_all() {
    let manager = StateManager::in_memory();
    manager.set_stream_state("users", json!({"a": 1})).await.unwrap();
    manager.set_stream_state("orders", json!({"b": 2})).await.unwrap();

    manager.clear().await.unwrap();

    assert!(manager.get_stream_state("users").await.is_none());
    assert!(manager.get_stream_state("orders").await.is_none());
}

#[tokio::test]
async fn test_clear_stream() {
    let manager = StateManager::in_memory();
    manager.set_stream_state("users", json!({"a": 1})).await.unwrap();
    manager.set_stream_state("orders", json!({"b": 2})).await.unwrap();

    manager.clear_stream("users").await.unwrap();

    assert!(manager.get_stream_state("users").await.is_none());
    assert_eq!(
        manager.get_stream_state("orders").await,
        Some(json!({"b": 2}))
    );
}

// ============================================================================
// State Access Tests
// ============================================================================

#[tokio::test]
async fn test_update_auto_saves() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("update_state.json");
    let manager = StateManager::new(&path);

    let replaced = manager
        .update(|state| state.set_stream("users", json!({"direct": true})))
        .await
        .unwrap();
    assert!(replaced);

    let reloaded = StateManager::from_file(&path).unwrap();
    assert_eq!(
        reloaded.get_stream_state("users").await,
        Some(json!({"direct": true}))
    );
}

#[tokio::test]
async fn test_clone_shares_state() {
    let manager = StateManager::in_memory();
    let cloned = manager.clone();

    manager
        .set_stream_state("users", json!({"shared": true}))
        .await
        .unwrap();

    assert_eq!(
        cloned.get_stream_state("users").await,
        Some(json!({"shared": true}))
    );
}

#[tokio::test]
async fn test_load_replaces_unsaved_changes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reload_state.json");

    let manager = StateManager::without_auto_save(&path);
    manager
        .set_stream_state("users", json!({"saved": 1}))
        .await
        .unwrap();
    manager.save().await.unwrap();

    manager
        .set_stream_state("users", json!({"unsaved": 2}))
        .await
        .unwrap();
    manager.load().await.unwrap();
    assert_eq!(
        manager.get_stream_state("users").await,
        Some(json!({"saved": 1}))
    );
}

#[tokio::test]
async fn test_to_json() {
    let manager = StateManager::in_memory();
    manager
        .set_stream_state("users", json!({"a": 1}))
        .await
        .unwrap();

    let rendered = manager.to_json().await.unwrap();
    assert_eq!(rendered, r#"{"streams":{"users":{"a":1}}}"#);
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
async fn test_load_invalid_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("invalid.json");

    tokio::fs::write(&path, "{ invalid json }").await.unwrap();

    let manager = StateManager::new(&path);
    assert!(manager.load().await.is_err());
    assert!(StateManager::from_file(&path).is_err());
}
