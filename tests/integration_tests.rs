//! Integration tests for the concurrent read engine
//!
//! Tests the full end-to-end flow: YAML source config → file listing →
//! concurrent partition reads → messages and persisted state

use futures::StreamExt;
use serde_json::json;
use solidafy_concurrent::{
    load_config, ConcurrencyConfig, ConcurrentSource, Error, InMemoryPartition, InMemoryStream,
    Message, Result, SourceStream, StateManager, StreamStatus,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn fast() -> ConcurrencyConfig {
    ConcurrencyConfig::default().with_sleep_time_ms(10)
}

async fn collect(
    config: ConcurrencyConfig,
    streams: Vec<Arc<dyn SourceStream>>,
) -> (Vec<Message>, Option<Error>) {
    let mut messages = ConcurrentSource::new(config).read(streams).unwrap();
    let mut out = Vec::new();
    while let Some(next) = messages.next().await {
        match next {
            Ok(msg) => out.push(msg),
            Err(e) => return (out, Some(e)),
        }
    }
    (out, None)
}

fn statuses(messages: &[Message], stream: &str) -> Vec<StreamStatus> {
    messages
        .iter()
        .filter_map(|m| match m {
            Message::StreamStatus {
                stream: s, status, ..
            } if s == stream => Some(*status),
            _ => None,
        })
        .collect()
}

fn record_count(messages: &[Message], stream: &str) -> usize {
    messages
        .iter()
        .filter(|m| m.is_record() && m.stream_name() == Some(stream))
        .count()
}

fn write_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn touch_later(path: &Path) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();
}

async fn run_config(config_path: &Path, state: &StateManager) -> Result<Vec<Message>> {
    let config = load_config(config_path)?;
    let streams = {
        let current = state.state().await;
        config.build_streams(&[], &current)?
    };
    let mut messages = ConcurrentSource::new(config.concurrency.clone()).read(streams)?;
    let mut out = Vec::new();
    while let Some(next) = messages.next().await {
        let msg = next?;
        state.apply_message(&msg).await?;
        out.push(msg);
    }
    Ok(out)
}

// ============================================================================
// In-Memory Streams
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_streams_interleave() {
    let streams: Vec<Arc<dyn SourceStream>> = (0..5)
        .map(|s| {
            let mut stream = InMemoryStream::new(format!("stream_{s}"));
            for p in 0..4 {
                let records = (0..10).map(|i| json!({"p": p, "i": i})).collect();
                stream = stream.with_partition(format!("p{p}"), records);
            }
            Arc::new(stream) as Arc<dyn SourceStream>
        })
        .collect();

    let config = fast()
        .with_max_concurrent_tasks(3)
        .with_initial_partition_generators(2);
    let (messages, error) = collect(config, streams).await;

    assert!(error.is_none());
    for s in 0..5 {
        let name = format!("stream_{s}");
        assert_eq!(record_count(&messages, &name), 40);
        assert_eq!(
            statuses(&messages, &name),
            vec![
                StreamStatus::Started,
                StreamStatus::Running,
                StreamStatus::Complete
            ]
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_records_within_partition_keep_order() {
    let slow = InMemoryPartition::new("users", "slow", (0..5).map(|i| json!({"i": i})).collect())
        .with_delay(Duration::from_millis(5));
    let stream = InMemoryStream::new("users")
        .with_custom_partition(slow)
        .with_partition("fast", vec![json!({"i": 100})]);

    let (messages, error) = collect(fast(), vec![Arc::new(stream)]).await;
    assert!(error.is_none());

    let slow_order: Vec<i64> = messages
        .iter()
        .filter_map(|m| match m {
            Message::Record { data, .. } if data["i"].as_i64().unwrap_or(0) < 100 => {
                data["i"].as_i64()
            }
            _ => None,
        })
        .collect();
    assert_eq!(slow_order, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_failed_stream_stops_read() {
    let bad = InMemoryStream::new("bad").with_custom_partition(
        InMemoryPartition::new("bad", "p0", vec![json!({"id": 1}), json!({"id": 2})])
            .fail_after(1, "disk on fire"),
    );

    let (messages, error) = collect(fast(), vec![Arc::new(bad)]).await;

    assert!(error.is_some());
    assert_eq!(
        statuses(&messages, "bad").last(),
        Some(&StreamStatus::Incomplete)
    );
    assert!(messages.iter().any(|m| matches!(
        m,
        Message::Log { message, .. } if message.contains("disk on fire")
    )));
}

// ============================================================================
// File-Based Sources
// ============================================================================

const SOURCE_YAML: &str = r#"
name: local
concurrency:
  max_concurrent_tasks: 2
  sleep_time_ms: 10
streams:
  - name: orders
    path: data/orders
    glob: "**/*.csv"
    sync_mode: incremental
  - name: events
    path: data/events
    glob: "*.jsonl"
"#;

fn seed_source(root: &Path) -> std::path::PathBuf {
    write_file(root, "data/orders/2024/a.csv", "id,amount\n1,10\n2,20\n");
    write_file(root, "data/orders/2024/b.csv", "id,amount\n3,30\n");
    write_file(root, "data/orders/notes.txt", "not data");
    write_file(root, "data/events/e.jsonl", "{\"kind\":\"click\"}\n{\"kind\":\"view\"}\n");

    let config = root.join("source.yaml");
    std::fs::write(&config, SOURCE_YAML).unwrap();
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_file_source_full_read() {
    let dir = tempdir().unwrap();
    let config = seed_source(dir.path());
    let state = StateManager::in_memory();

    let messages = run_config(&config, &state).await.unwrap();

    assert_eq!(record_count(&messages, "orders"), 3);
    assert_eq!(record_count(&messages, "events"), 2);
    assert_eq!(
        statuses(&messages, "orders").last(),
        Some(&StreamStatus::Complete)
    );

    let order = messages
        .iter()
        .find_map(|m| match m {
            Message::Record { stream, data, .. } if stream == "orders" && data["id"] == 3 => {
                Some(data.clone())
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(order["_ab_source_file_url"], "2024/b.csv");
    assert!(order["_ab_source_file_last_modified"].is_string());

    // full-refresh events stream keeps no state
    let stored = state.state().await;
    assert!(stored.get_stream("events").is_none());
    assert_eq!(
        stored.get_stream("orders").unwrap()["history"]
            .as_object()
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_incremental_second_run_skips_synced_files() {
    let dir = tempdir().unwrap();
    let config = seed_source(dir.path());
    let state_path = dir.path().join("state.json");

    let state = StateManager::new(&state_path);
    run_config(&config, &state).await.unwrap();
    assert!(state_path.exists());

    // nothing changed: incremental stream reads nothing, full refresh rereads
    let state = StateManager::from_file(&state_path).unwrap();
    let messages = run_config(&config, &state).await.unwrap();
    assert_eq!(record_count(&messages, "orders"), 0);
    assert_eq!(record_count(&messages, "events"), 2);
    assert_eq!(
        statuses(&messages, "orders"),
        vec![StreamStatus::Started, StreamStatus::Complete]
    );

    // a modified and a new file are picked up
    touch_later(&dir.path().join("data/orders/2024/a.csv"));
    write_file(dir.path(), "data/orders/2025/c.csv", "id,amount\n4,40\n");

    let state = StateManager::from_file(&state_path).unwrap();
    let messages = run_config(&config, &state).await.unwrap();
    assert_eq!(record_count(&messages, "orders"), 3);

    let history = state.get_stream_state("orders").await.unwrap();
    assert_eq!(history["history"].as_object().unwrap().len(), 3);
    assert!(history["_ab_source_file_last_modified"]
        .as_str()
        .unwrap()
        .ends_with("_2024/a.csv"));
}

#[tokio::test]
async fn test_missing_directory_fails_stream() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("source.yaml");
    std::fs::write(
        &config,
        r#"
concurrency:
  sleep_time_ms: 10
streams:
  - name: ghosts
    path: nowhere
"#,
    )
    .unwrap();

    let state = StateManager::in_memory();
    let result = run_config(&config, &state).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_bad_file_fails_read() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "data/events/bad.jsonl", "{\"ok\":1}\n{not json\n");
    let config = dir.path().join("source.yaml");
    std::fs::write(
        &config,
        r#"
concurrency:
  sleep_time_ms: 10
streams:
  - name: events
    path: data/events
"#,
    )
    .unwrap();

    let loaded = load_config(&config).unwrap();
    let streams = loaded
        .build_streams(&[], &solidafy_concurrent::State::new())
        .unwrap();
    let (messages, error) = collect(loaded.concurrency.clone(), streams).await;

    assert!(error.is_some());
    assert_eq!(
        statuses(&messages, "events").last(),
        Some(&StreamStatus::Incomplete)
    );
}
