//! File-based stream and partition
//!
//! One partition per file. In incremental mode the stream consults a snapshot
//! of the file history taken when the sync started to skip unchanged files;
//! the consumer owns the live copy and records every file it finishes.

use super::lister::FileLister;
use super::types::{RemoteFile, FILE_URL_FIELD};
use crate::cursor::{Cursor, FileHistoryCursor, FinalStateCursor, CURSOR_FIELD};
use crate::decode::RecordDecoder;
use crate::error::Result;
use crate::stream::{Partition, PartitionStream, Record, RecordStream, SourceStream};
use crate::types::{JsonValue, SyncMode};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// File Partition
// ============================================================================

/// A partition reading exactly one file
pub struct FilePartition {
    stream: String,
    file: RemoteFile,
    lister: Arc<dyn FileLister>,
    decoder: Arc<dyn RecordDecoder>,
}

impl FilePartition {
    /// Create a new file partition
    pub fn new(
        stream: impl Into<String>,
        file: RemoteFile,
        lister: Arc<dyn FileLister>,
        decoder: Arc<dyn RecordDecoder>,
    ) -> Self {
        Self {
            stream: stream.into(),
            file,
            lister,
            decoder,
        }
    }

    fn enrich(&self, data: JsonValue) -> JsonValue {
        match data {
            JsonValue::Object(mut obj) => {
                obj.insert(
                    CURSOR_FIELD.to_string(),
                    JsonValue::String(self.file.last_modified_string()),
                );
                obj.insert(
                    FILE_URL_FIELD.to_string(),
                    JsonValue::String(self.file.uri.clone()),
                );
                JsonValue::Object(obj)
            }
            other => other,
        }
    }
}

impl fmt::Debug for FilePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePartition")
            .field("stream", &self.stream)
            .field("file", &self.file)
            .field("format", &self.decoder.format())
            .finish_non_exhaustive()
    }
}

impl Partition for FilePartition {
    fn stream_name(&self) -> &str {
        &self.stream
    }

    fn id(&self) -> &str {
        &self.file.uri
    }

    fn read(&self) -> RecordStream<'_> {
        let load = async move {
            let content = self.lister.read_file(&self.file).await?;
            self.decoder.decode(&content)
        };

        stream::once(load)
            .flat_map(move |result| {
                let items: Vec<Result<Record>> = match result {
                    Ok(rows) => rows
                        .into_iter()
                        .map(|row| Ok(Record::new(&self.stream, self.enrich(row))))
                        .collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            })
            .boxed()
    }

    fn to_slice(&self) -> Option<JsonValue> {
        Some(json!({
            "files": [{
                "uri": self.file.uri,
                "last_modified": self.file.last_modified_string(),
            }]
        }))
    }

    fn remote_file(&self) -> Option<&RemoteFile> {
        Some(&self.file)
    }
}

// ============================================================================
// File-Based Stream
// ============================================================================

/// A stream whose partitions are the files of a `FileLister`
pub struct FileBasedStream {
    name: String,
    lister: Arc<dyn FileLister>,
    decoder: Arc<dyn RecordDecoder>,
    sync_mode: SyncMode,
    history: FileHistoryCursor,
}

impl FileBasedStream {
    /// Create a full-refresh stream
    pub fn new(
        name: impl Into<String>,
        lister: Arc<dyn FileLister>,
        decoder: Arc<dyn RecordDecoder>,
    ) -> Self {
        Self {
            name: name.into(),
            lister,
            decoder,
            sync_mode: SyncMode::FullRefresh,
            history: FileHistoryCursor::default(),
        }
    }

    /// Sync incrementally using the given history
    #[must_use]
    pub fn with_history(mut self, history: FileHistoryCursor) -> Self {
        self.sync_mode = SyncMode::Incremental;
        self.history = history;
        self
    }

    /// Sync mode in effect
    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    /// History snapshot used for file selection
    pub fn history(&self) -> &FileHistoryCursor {
        &self.history
    }

    async fn list_partitions(&self) -> Result<Vec<Result<Arc<dyn Partition>>>> {
        let all_files = self.lister.list_files().await?;
        let total = all_files.len();

        let files = match self.sync_mode {
            SyncMode::Incremental => self.history.files_to_sync(&all_files, Utc::now()),
            SyncMode::FullRefresh => all_files,
        };
        info!(stream = %self.name, total, selected = files.len(), "Selected files to sync");

        Ok(files
            .into_iter()
            .map(|file| {
                let partition = FilePartition::new(
                    self.name.clone(),
                    file,
                    Arc::clone(&self.lister),
                    Arc::clone(&self.decoder),
                );
                Ok(Arc::new(partition) as Arc<dyn Partition>)
            })
            .collect())
    }
}

impl SourceStream for FileBasedStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_partitions(&self) -> PartitionStream<'_> {
        stream::once(self.list_partitions())
            .flat_map(|result| {
                let items = match result {
                    Ok(items) => items,
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            })
            .boxed()
    }

    fn cursor(&self) -> Box<dyn Cursor> {
        match self.sync_mode {
            SyncMode::Incremental => Box::new(self.history.clone()),
            SyncMode::FullRefresh => Box::new(FinalStateCursor::new()),
        }
    }
}
