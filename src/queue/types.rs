//! Queue item types

use crate::error::Error;
use crate::stream::{Partition, Record};
use std::sync::Arc;

/// An error raised by a producer or reader, tagged with its stream
#[derive(Debug)]
pub struct StreamError {
    /// Stream the failing task worked on
    pub stream: String,
    /// The failure
    pub error: Error,
}

impl StreamError {
    /// Create a new stream error
    pub fn new(stream: impl Into<String>, error: Error) -> Self {
        Self {
            stream: stream.into(),
            error,
        }
    }
}

/// Everything that travels from workers to the consumer
#[derive(Debug)]
pub enum QueueItem {
    /// A partition enumerated by a producer, to be scheduled for reading
    Partition(Arc<dyn Partition>),
    /// A record read from a partition
    Record(Record),
    /// Every record of the partition has been queued
    PartitionComplete(Arc<dyn Partition>),
    /// The named stream has enumerated all its partitions
    PartitionGenerationCompleted(String),
    /// A worker failed
    Error(StreamError),
}

impl QueueItem {
    /// Stream this item belongs to
    pub fn stream_name(&self) -> &str {
        match self {
            Self::Partition(p) | Self::PartitionComplete(p) => p.stream_name(),
            Self::Record(r) => &r.stream,
            Self::PartitionGenerationCompleted(stream) => stream,
            Self::Error(e) => &e.stream,
        }
    }

    /// Short name of the variant, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Partition(_) => "partition",
            Self::Record(_) => "record",
            Self::PartitionComplete(_) => "partition_complete",
            Self::PartitionGenerationCompleted(_) => "partition_generation_completed",
            Self::Error(_) => "error",
        }
    }

    /// Whether this is a lifecycle marker rather than data
    pub fn is_sentinel(&self) -> bool {
        matches!(
            self,
            Self::PartitionComplete(_) | Self::PartitionGenerationCompleted(_)
        )
    }
}
