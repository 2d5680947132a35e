//! Tests for file-based streams

use super::*;
use crate::cursor::{FileHistoryCursor, CURSOR_FIELD};
use crate::decode::{CsvDecoder, JsonlDecoder};
use crate::error::Error;
use crate::stream::{Partition, SourceStream};
use crate::types::SyncMode;
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn write(dir: &std::path::Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

// ============================================================================
// Glob Tests
// ============================================================================

#[test]
fn test_glob_to_regex() {
    let re = glob_to_regex("*.jsonl").unwrap();
    assert!(re.is_match("a.jsonl"));
    assert!(!re.is_match("dir/a.jsonl"));
    assert!(!re.is_match("a.jsonl.bak"));

    let re = glob_to_regex("**/*.csv").unwrap();
    assert!(re.is_match("a.csv"));
    assert!(re.is_match("x/y/a.csv"));
    assert!(!re.is_match("a.json"));

    let re = glob_to_regex("part-?.json").unwrap();
    assert!(re.is_match("part-1.json"));
    assert!(!re.is_match("part-12.json"));
}

// ============================================================================
// RemoteFile Tests
// ============================================================================

#[test]
fn test_remote_file_last_modified_string() {
    let file = RemoteFile::new("a.csv", Utc.with_ymd_and_hms(2023, 8, 1, 0, 0, 0).unwrap());
    assert_eq!(file.last_modified_string(), "2023-08-01T00:00:00.000000Z");
}

// ============================================================================
// LocalFileLister Tests
// ============================================================================

#[tokio::test]
async fn test_local_lister_lists_nested_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jsonl", "{}\n");
    write(dir.path(), "nested/b.jsonl", "{}\n");
    write(dir.path(), "nested/c.csv", "id\n1\n");

    let lister = LocalFileLister::new(dir.path());
    let mut uris: Vec<_> = lister
        .list_files()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.uri)
        .collect();
    uris.sort();

    assert_eq!(uris, vec!["a.jsonl", "nested/b.jsonl", "nested/c.csv"]);
}

#[tokio::test]
async fn test_local_lister_glob_filter() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jsonl", "{}\n");
    write(dir.path(), "nested/b.jsonl", "{}\n");
    write(dir.path(), "nested/c.csv", "id\n1\n");

    let lister = LocalFileLister::new(dir.path())
        .with_glob("**/*.jsonl")
        .unwrap();
    let files = lister.list_files().await.unwrap();

    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.uri.ends_with(".jsonl")));
}

#[tokio::test]
async fn test_local_lister_missing_root() {
    let lister = LocalFileLister::new("/definitely/not/here");
    let err = lister.list_files().await.unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
}

#[tokio::test]
async fn test_local_lister_read_file() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jsonl", "{\"id\": 1}\n");

    let lister = LocalFileLister::new(dir.path());
    let files = lister.list_files().await.unwrap();
    let content = lister.read_file(&files[0]).await.unwrap();
    assert_eq!(content, "{\"id\": 1}\n");

    let missing = RemoteFile::new("gone.jsonl", Utc::now());
    assert!(matches!(
        lister.read_file(&missing).await,
        Err(Error::FileNotFound { .. })
    ));
}

// ============================================================================
// FilePartition Tests
// ============================================================================

#[tokio::test]
async fn test_file_partition_reads_and_enriches_records() {
    let dir = tempdir().unwrap();
    write(dir.path(), "orders.csv", "id,total\n1,9.5\n2,3\n");

    let lister: Arc<dyn FileLister> = Arc::new(LocalFileLister::new(dir.path()));
    let file = lister.list_files().await.unwrap().remove(0);
    let partition = FilePartition::new("orders", file.clone(), lister, Arc::new(CsvDecoder::new()));

    assert_eq!(partition.id(), "orders.csv");
    assert_eq!(partition.remote_file(), Some(&file));
    assert_eq!(
        partition.to_slice().unwrap()["files"][0]["uri"],
        "orders.csv"
    );

    let records: Vec<_> = partition.read().collect().await;
    assert_eq!(records.len(), 2);

    let first = records[0].as_ref().unwrap();
    assert_eq!(first.stream, "orders");
    assert_eq!(first.data["id"], 1);
    assert_eq!(first.data[FILE_URL_FIELD], "orders.csv");
    assert_eq!(
        first.data[CURSOR_FIELD],
        file.last_modified_string().as_str()
    );
}

#[tokio::test]
async fn test_file_partition_decode_error() {
    let dir = tempdir().unwrap();
    write(dir.path(), "bad.jsonl", "{broken\n");

    let lister: Arc<dyn FileLister> = Arc::new(LocalFileLister::new(dir.path()));
    let file = lister.list_files().await.unwrap().remove(0);
    let partition = FilePartition::new("bad", file, lister, Arc::new(JsonlDecoder::new()));

    let records: Vec<_> = partition.read().collect().await;
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], Err(Error::Decode { .. })));
}

// ============================================================================
// FileBasedStream Tests
// ============================================================================

#[tokio::test]
async fn test_full_refresh_stream_yields_every_file() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jsonl", "{\"id\": 1}\n");
    write(dir.path(), "b.jsonl", "{\"id\": 2}\n");

    let stream = FileBasedStream::new(
        "events",
        Arc::new(LocalFileLister::new(dir.path())),
        Arc::new(JsonlDecoder::new()),
    );
    assert_eq!(stream.sync_mode(), SyncMode::FullRefresh);

    let partitions: Vec<_> = stream.generate_partitions().collect().await;
    assert_eq!(partitions.len(), 2);
    assert!(partitions.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_incremental_stream_skips_synced_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jsonl", "{\"id\": 1}\n");
    write(dir.path(), "b.jsonl", "{\"id\": 2}\n");

    let lister = Arc::new(LocalFileLister::new(dir.path()));
    let files = lister.list_files().await.unwrap();

    let mut history = FileHistoryCursor::default();
    history.add_file(&files[0]);

    let stream = FileBasedStream::new("events", lister, Arc::new(JsonlDecoder::new()))
        .with_history(history);
    assert_eq!(stream.sync_mode(), SyncMode::Incremental);

    let partitions: Vec<_> = stream.generate_partitions().collect().await;
    assert_eq!(partitions.len(), 1);
    assert_eq!(partitions[0].as_ref().unwrap().id(), files[1].uri);
}

#[tokio::test]
async fn test_stream_listing_error_is_surfaced() {
    let stream = FileBasedStream::new(
        "events",
        Arc::new(LocalFileLister::new("/definitely/not/here")),
        Arc::new(JsonlDecoder::new()),
    );

    let partitions: Vec<_> = stream.generate_partitions().collect().await;
    assert_eq!(partitions.len(), 1);
    assert!(partitions[0].is_err());
}

#[test]
fn test_stream_cursor_follows_sync_mode() {
    let lister = Arc::new(LocalFileLister::new("."));

    let full = FileBasedStream::new("events", lister.clone(), Arc::new(JsonlDecoder::new()));
    assert_eq!(
        full.cursor().final_state(),
        serde_json::json!({"__ab_no_cursor_state_message": true})
    );

    let incremental = FileBasedStream::new("events", lister, Arc::new(JsonlDecoder::new()))
        .with_history(FileHistoryCursor::default());
    assert!(incremental.cursor().final_state().get("history").is_some());
    assert!(incremental.history().is_empty());
}
