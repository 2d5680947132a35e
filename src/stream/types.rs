//! Stream and partition abstractions
//!
//! A stream enumerates partitions; a partition reads records. Both are
//! supplied by connectors and consumed read-only by the engine.

use crate::cursor::{Cursor, FinalStateCursor};
use crate::error::Result;
use crate::file_based::RemoteFile;
use crate::types::JsonValue;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;

/// Lazy sequence of records produced by a partition
pub type RecordStream<'a> = BoxStream<'a, Result<Record>>;

/// Lazy sequence of partitions produced by a stream
pub type PartitionStream<'a> = BoxStream<'a, Result<Arc<dyn Partition>>>;

/// One output row plus its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Stream the record belongs to
    pub stream: String,
    /// Record payload
    pub data: JsonValue,
    /// When the record was produced
    pub emitted_at: DateTime<Utc>,
}

impl Record {
    /// Create a record stamped with the current time
    pub fn new(stream: impl Into<String>, data: JsonValue) -> Self {
        Self {
            stream: stream.into(),
            data,
            emitted_at: Utc::now(),
        }
    }

    /// Override the emission timestamp
    #[must_use]
    pub fn with_emitted_at(mut self, emitted_at: DateTime<Utc>) -> Self {
        self.emitted_at = emitted_at;
        self
    }
}

/// An independently readable unit of work within a stream
///
/// A partition is owned by exactly one reader task from the moment it is
/// submitted until its completion sentinel has been pushed.
pub trait Partition: Send + Sync + fmt::Debug {
    /// Name of the stream this partition belongs to
    fn stream_name(&self) -> &str;

    /// Identifier, unique within the stream
    fn id(&self) -> &str;

    /// Read the partition's records, in order
    fn read(&self) -> RecordStream<'_>;

    /// Slice description used for slice log messages
    fn to_slice(&self) -> Option<JsonValue> {
        None
    }

    /// The file backing this partition, for file-based streams
    fn remote_file(&self) -> Option<&RemoteFile> {
        None
    }
}

/// A logical data source made of partitions
pub trait SourceStream: Send + Sync {
    /// Stream name, unique within a sync
    fn name(&self) -> &str;

    /// Enumerate partitions lazily; each step may perform I/O
    fn generate_partitions(&self) -> PartitionStream<'_>;

    /// Cursor that tracks this stream's progress on the consumer side
    fn cursor(&self) -> Box<dyn Cursor> {
        Box::new(FinalStateCursor::new())
    }
}
