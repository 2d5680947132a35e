//! Engine types
//!
//! Output messages, stream statuses and configuration for the read engine.

use crate::error::{Error, Result};
use crate::pool::{RunnerConfig, DEFAULT_MAX_CONCURRENT_TASKS};
use crate::stream::Record;
use crate::types::{JsonValue, LogLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::time::Duration;

/// Lifecycle status of a stream during a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamStatus {
    /// Partition generation has started
    Started,
    /// The first record has been emitted
    Running,
    /// Every partition has been read
    Complete,
    /// The read stopped because of an error
    Incomplete,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Started => "STARTED",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Incomplete => "INCOMPLETE",
        };
        f.write_str(s)
    }
}

/// A message emitted during a read
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A data record
    Record {
        /// Stream name
        stream: String,
        /// Record payload
        data: JsonValue,
        /// Emission timestamp
        emitted_at: DateTime<Utc>,
    },
    /// State checkpoint
    State {
        /// Stream name
        stream: String,
        /// Cursor state
        data: JsonValue,
    },
    /// Stream status trace
    StreamStatus {
        /// Stream name
        stream: String,
        /// New status
        status: StreamStatus,
        /// Emission timestamp
        emitted_at: DateTime<Utc>,
    },
    /// Log message
    Log {
        /// Log level
        level: LogLevel,
        /// Log message
        message: String,
    },
}

impl From<Record> for Message {
    fn from(record: Record) -> Self {
        Self::Record {
            stream: record.stream,
            data: record.data,
            emitted_at: record.emitted_at,
        }
    }
}

impl Message {
    /// Create a state message
    pub fn state(stream: impl Into<String>, data: JsonValue) -> Self {
        Self::State {
            stream: stream.into(),
            data,
        }
    }

    /// Create a stream status message stamped with the current time
    pub fn status(stream: impl Into<String>, status: StreamStatus) -> Self {
        Self::StreamStatus {
            stream: stream.into(),
            status,
            emitted_at: Utc::now(),
        }
    }

    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info log
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create a debug log
    pub fn debug(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Debug, message)
    }

    /// Create a warning log
    pub fn warn(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Warn, message)
    }

    /// Create an error log
    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Check if this is a stream status message
    pub fn is_status(&self) -> bool {
        matches!(self, Self::StreamStatus { .. })
    }

    /// Check if this is a log message
    pub fn is_log(&self) -> bool {
        matches!(self, Self::Log { .. })
    }

    /// Stream this message belongs to, if any
    pub fn stream_name(&self) -> Option<&str> {
        match self {
            Self::Record { stream, .. }
            | Self::State { stream, .. }
            | Self::StreamStatus { stream, .. } => Some(stream),
            Self::Log { .. } => None,
        }
    }

    /// Render as one line of protocol JSON
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Record {
                stream,
                data,
                emitted_at,
            } => json!({
                "type": "RECORD",
                "record": {
                    "stream": stream,
                    "data": data,
                    "emitted_at": emitted_at.timestamp_millis()
                }
            }),
            Self::State { stream, data } => json!({
                "type": "STATE",
                "state": {
                    "type": "STREAM",
                    "stream": {
                        "stream_descriptor": { "name": stream },
                        "stream_state": data
                    }
                }
            }),
            Self::StreamStatus {
                stream,
                status,
                emitted_at,
            } => json!({
                "type": "TRACE",
                "trace": {
                    "type": "STREAM_STATUS",
                    "emitted_at": emitted_at.timestamp_millis(),
                    "stream_status": {
                        "stream_descriptor": { "name": stream },
                        "status": status
                    }
                }
            }),
            Self::Log { level, message } => json!({
                "type": "LOG",
                "log": {
                    "level": level,
                    "message": message
                }
            }),
        }
    }
}

// ============================================================================
// Concurrency Config
// ============================================================================

/// Default number of runtime worker threads
pub const DEFAULT_NUM_WORKERS: usize = 10;

/// Default capacity wait bound in milliseconds
pub const DEFAULT_SLEEP_TIME_MS: u64 = 100;

/// Concurrency settings for a read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Maximum number of partition reads in flight
    pub max_concurrent_tasks: usize,
    /// Upper bound of one capacity or queue wait, in milliseconds
    pub sleep_time_ms: u64,
    /// Worker threads of the runtime running the read
    pub num_workers: usize,
    /// Streams generating partitions at the same time (default: half the workers)
    pub initial_partition_generators: Option<usize>,
    /// Emit a log message describing every partition
    pub log_slices: bool,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            sleep_time_ms: DEFAULT_SLEEP_TIME_MS,
            num_workers: DEFAULT_NUM_WORKERS,
            initial_partition_generators: None,
            log_slices: false,
        }
    }
}

impl ConcurrencyConfig {
    /// Create a config with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit
    #[must_use]
    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// Set the wait bound
    #[must_use]
    pub fn with_sleep_time_ms(mut self, ms: u64) -> Self {
        self.sleep_time_ms = ms;
        self
    }

    /// Set the number of worker threads
    #[must_use]
    pub fn with_num_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers;
        self
    }

    /// Set the number of streams generating partitions at once
    #[must_use]
    pub fn with_initial_partition_generators(mut self, generators: usize) -> Self {
        self.initial_partition_generators = Some(generators);
        self
    }

    /// Emit slice log messages
    #[must_use]
    pub fn with_log_slices(mut self, log_slices: bool) -> Self {
        self.log_slices = log_slices;
        self
    }

    /// Wait bound as a duration
    pub fn sleep_time(&self) -> Duration {
        Duration::from_millis(self.sleep_time_ms)
    }

    /// Number of partition generators started up front
    pub fn partition_generators(&self) -> usize {
        self.initial_partition_generators
            .unwrap_or(self.num_workers / 2)
            .max(1)
    }

    /// Task runner settings
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig::default()
            .with_max_concurrent_tasks(self.max_concurrent_tasks)
            .with_sleep_time(self.sleep_time())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_tasks == 0 {
            return Err(Error::invalid_value(
                "max_concurrent_tasks",
                "must be at least 1",
            ));
        }
        if self.num_workers == 0 {
            return Err(Error::invalid_value("num_workers", "must be at least 1"));
        }
        if self.sleep_time_ms == 0 {
            return Err(Error::invalid_value("sleep_time_ms", "must be at least 1"));
        }
        if self.initial_partition_generators == Some(0) {
            return Err(Error::invalid_value(
                "initial_partition_generators",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Sync Stats
// ============================================================================

/// Statistics from a read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Total records read
    pub records_synced: usize,
    /// Streams that completed
    pub streams_synced: usize,
    /// Partitions that completed
    pub partitions_synced: usize,
    /// State messages emitted
    pub state_messages: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record
    pub fn add_record(&mut self) {
        self.records_synced += 1;
    }

    /// Add a completed stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Add a completed partition
    pub fn add_partition(&mut self) {
        self.partitions_synced += 1;
    }

    /// Add a state message
    pub fn add_state(&mut self) {
        self.state_messages += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
