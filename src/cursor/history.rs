//! Bounded file history cursor
//!
//! Remembers which files were synced and when they were last modified, so
//! unchanged files are skipped on the next sync. History is capped at
//! `max_history_size` entries; once it has been truncated, a time window
//! fallback decides for files whose history entry may have been evicted.

use super::types::Cursor;
use crate::error::{Error, Result};
use crate::file_based::RemoteFile;
use crate::stream::Partition;
use crate::types::JsonValue;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Default number of files kept in history
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 10_000;

/// Default look-back once history is full, in days
pub const DEFAULT_DAYS_TO_SYNC_IF_HISTORY_IS_FULL: i64 = 3;

/// Timestamp format used in persisted state
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// State key holding the `<timestamp>_<uri>` of the most recent file
pub const CURSOR_FIELD: &str = "_ab_source_file_last_modified";

/// Persisted form of the file history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHistoryState {
    /// uri -> last modified timestamp
    #[serde(default)]
    pub history: BTreeMap<String, String>,

    /// Most recent `<timestamp>_<uri>`
    #[serde(rename = "_ab_source_file_last_modified", default)]
    pub cursor: Option<String>,
}

/// Format a timestamp the way it is persisted
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(DATE_TIME_FORMAT).to_string()
}

/// Parse a persisted timestamp
///
/// Accepts any number of fractional digits, and falls back to RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.fZ") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::state(format!("Invalid history timestamp '{value}': {e}")))
}

/// History of synced files, bounded in size
#[derive(Debug, Clone)]
pub struct FileHistoryCursor {
    /// uri -> last modified
    history: HashMap<String, DateTime<Utc>>,
    /// Same entries ordered by (last modified, uri), smallest first
    ordered: BTreeSet<(DateTime<Utc>, String)>,
    max_history_size: usize,
    time_window_if_history_is_full: Duration,
    /// Set the first time an entry is evicted; never reset during a sync
    truncated: bool,
}

impl Default for FileHistoryCursor {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_HISTORY_SIZE,
            Duration::days(DEFAULT_DAYS_TO_SYNC_IF_HISTORY_IS_FULL),
        )
    }
}

impl FileHistoryCursor {
    /// Create an empty history
    pub fn new(max_history_size: usize, time_window_if_history_is_full: Duration) -> Self {
        Self {
            history: HashMap::new(),
            ordered: BTreeSet::new(),
            max_history_size: max_history_size.max(1),
            time_window_if_history_is_full,
            truncated: false,
        }
    }

    /// Load previously persisted state, replacing the current history
    ///
    /// State that already holds more entries than the cap is trimmed and the
    /// history is flagged partial.
    pub fn set_initial_state(&mut self, value: &JsonValue) -> Result<()> {
        let state: FileHistoryState = serde_json::from_value(value.clone())
            .map_err(|e| Error::state(format!("Invalid file history state: {e}")))?;

        self.history.clear();
        self.ordered.clear();
        self.truncated = false;

        for (uri, ts) in state.history {
            let last_modified = parse_timestamp(&ts)?;
            self.add_entry(uri, last_modified);
        }

        debug!(
            entries = self.history.len(),
            partial = self.is_history_partial(),
            "Loaded file history"
        );
        Ok(())
    }

    /// Record that `identity` was synced at `last_modified`
    pub fn add_entry(&mut self, identity: impl Into<String>, last_modified: DateTime<Utc>) {
        let identity = identity.into();

        if let Some(previous) = self.history.insert(identity.clone(), last_modified) {
            self.ordered.remove(&(previous, identity.clone()));
        }
        self.ordered.insert((last_modified, identity));

        while self.history.len() > self.max_history_size {
            let Some((ts, uri)) = self.ordered.pop_first() else {
                break;
            };
            self.history.remove(&uri);
            self.truncated = true;
            debug!(uri = %uri, last_modified = %format_timestamp(&ts), "Evicted file from history");
        }
    }

    /// Record a synced file
    pub fn add_file(&mut self, file: &RemoteFile) {
        self.add_entry(file.uri.clone(), file.last_modified);
    }

    /// Whether the file must be (re-)read, evaluated at the current time
    pub fn should_sync(&self, file: &RemoteFile) -> bool {
        self.should_sync_at(file, Utc::now())
    }

    /// Whether the file must be (re-)read, evaluated at `now`
    pub fn should_sync_at(&self, file: &RemoteFile, now: DateTime<Utc>) -> bool {
        if let Some(recorded) = self.history.get(&file.uri) {
            if file.last_modified < *recorded {
                warn!(
                    uri = %file.uri,
                    "File last modified date is older than the last time it was synced, skipping"
                );
                return false;
            }
            return file.last_modified > *recorded;
        }

        if self.is_history_partial() {
            let start_time = self.start_time(now);
            if file.last_modified > start_time {
                return true;
            }
            if file.last_modified == start_time {
                return self
                    .earliest_entry()
                    .map_or(true, |(_, uri)| file.uri.as_str() > uri);
            }
            return false;
        }

        true
    }

    /// Filter `files` down to the ones that must be read
    pub fn files_to_sync<'a>(
        &self,
        files: impl IntoIterator<Item = &'a RemoteFile>,
        now: DateTime<Utc>,
    ) -> Vec<RemoteFile> {
        if self.is_history_partial() {
            warn!(
                max_history_size = self.max_history_size,
                "File history is full, falling back to the time window to pick files to sync"
            );
        }
        files
            .into_iter()
            .filter(|f| self.should_sync_at(f, now))
            .cloned()
            .collect()
    }

    /// Lower bound below which unseen files are not synced
    pub fn start_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let Some((earliest, _)) = self.earliest_entry() else {
            return DateTime::<Utc>::MIN_UTC;
        };

        if self.is_history_partial() {
            let window_start = now
                .checked_sub_signed(self.time_window_if_history_is_full)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            earliest.min(window_start)
        } else {
            earliest
        }
    }

    /// History is at capacity or was truncated during this sync
    pub fn is_history_partial(&self) -> bool {
        self.truncated || self.history.len() >= self.max_history_size
    }

    /// Entry with the smallest (last modified, uri)
    pub fn earliest_entry(&self) -> Option<(DateTime<Utc>, &str)> {
        self.ordered.first().map(|(ts, uri)| (*ts, uri.as_str()))
    }

    /// Entry with the largest (last modified, uri)
    pub fn latest_entry(&self) -> Option<(DateTime<Utc>, &str)> {
        self.ordered.last().map(|(ts, uri)| (*ts, uri.as_str()))
    }

    /// Recorded last modified date of a file
    pub fn last_modified_of(&self, uri: &str) -> Option<DateTime<Utc>> {
        self.history.get(uri).copied()
    }

    /// Whether `uri` is in history
    pub fn contains(&self, uri: &str) -> bool {
        self.history.contains_key(uri)
    }

    /// Number of entries in history
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether history is empty
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Maximum number of entries
    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// Snapshot of the persisted form
    pub fn state(&self) -> FileHistoryState {
        FileHistoryState {
            history: self
                .history
                .iter()
                .map(|(uri, ts)| (uri.clone(), format_timestamp(ts)))
                .collect(),
            cursor: self
                .latest_entry()
                .map(|(ts, uri)| format!("{}_{uri}", format_timestamp(&ts))),
        }
    }

    /// Persisted form as JSON
    pub fn get_state(&self) -> JsonValue {
        serde_json::to_value(self.state()).unwrap_or_default()
    }
}

impl Cursor for FileHistoryCursor {
    fn close_partition(&mut self, partition: &dyn Partition) -> Option<JsonValue> {
        let file = partition.remote_file()?;
        self.add_file(file);
        Some(self.get_state())
    }

    fn final_state(&self) -> JsonValue {
        self.get_state()
    }
}
