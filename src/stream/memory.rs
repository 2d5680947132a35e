//! In-memory streams and partitions
//!
//! Handy for tests, demos and for connectors that already hold their
//! data in memory.

use super::types::{Partition, PartitionStream, Record, RecordStream, SourceStream};
use crate::error::{Error, Result};
use crate::types::JsonValue;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// In-Memory Partition
// ============================================================================

/// A partition backed by a list of JSON values
#[derive(Debug, Clone)]
pub struct InMemoryPartition {
    stream: String,
    id: String,
    records: Vec<JsonValue>,
    delay: Option<Duration>,
    fail_after: Option<(usize, String)>,
}

impl InMemoryPartition {
    /// Create a new partition
    pub fn new(stream: impl Into<String>, id: impl Into<String>, records: Vec<JsonValue>) -> Self {
        Self {
            stream: stream.into(),
            id: id.into(),
            records,
            delay: None,
            fail_after: None,
        }
    }

    /// Sleep before yielding each record
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail with `message` after `count` records were read
    #[must_use]
    pub fn fail_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.fail_after = Some((count, message.into()));
        self
    }

    /// Number of records this partition holds
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the partition has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Partition for InMemoryPartition {
    fn stream_name(&self) -> &str {
        &self.stream
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn read(&self) -> RecordStream<'_> {
        let fail_at = self.fail_after.as_ref().map(|(count, _)| *count);

        stream::iter(self.records.iter().enumerate())
            .then(move |(index, data)| async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if fail_at.is_some_and(|count| index >= count) {
                    let message = self
                        .fail_after
                        .as_ref()
                        .map(|(_, m)| m.clone())
                        .unwrap_or_default();
                    return Err(Error::partition(&self.stream, &self.id, message));
                }
                Ok(Record::new(&self.stream, data.clone()))
            })
            .boxed()
    }

    fn to_slice(&self) -> Option<JsonValue> {
        Some(json!({ "partition": self.id }))
    }
}

// ============================================================================
// In-Memory Stream
// ============================================================================

/// A stream with a fixed list of partitions
#[derive(Debug, Clone)]
pub struct InMemoryStream {
    name: String,
    partitions: Vec<Arc<InMemoryPartition>>,
    fail_generation_after: Option<(usize, String)>,
}

impl InMemoryStream {
    /// Create a new stream with no partitions
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: Vec::new(),
            fail_generation_after: None,
        }
    }

    /// Add a partition holding the given records
    #[must_use]
    pub fn with_partition(mut self, id: impl Into<String>, records: Vec<JsonValue>) -> Self {
        let partition = InMemoryPartition::new(self.name.clone(), id, records);
        self.partitions.push(Arc::new(partition));
        self
    }

    /// Add a pre-built partition
    #[must_use]
    pub fn with_custom_partition(mut self, partition: InMemoryPartition) -> Self {
        self.partitions.push(Arc::new(partition));
        self
    }

    /// Fail enumeration with `message` after `count` partitions
    #[must_use]
    pub fn fail_generation_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.fail_generation_after = Some((count, message.into()));
        self
    }

    /// Number of partitions
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

impl SourceStream for InMemoryStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_partitions(&self) -> PartitionStream<'_> {
        let mut items: Vec<Result<Arc<dyn Partition>>> = Vec::new();

        for (index, partition) in self.partitions.iter().enumerate() {
            if let Some((count, message)) = &self.fail_generation_after {
                if index >= *count {
                    items.push(Err(Error::partition_generation(&self.name, message.clone())));
                    break;
                }
            }
            items.push(Ok(Arc::clone(partition) as Arc<dyn Partition>));
        }

        if let Some((count, message)) = &self.fail_generation_after {
            if *count >= self.partitions.len() {
                items.push(Err(Error::partition_generation(&self.name, message.clone())));
            }
        }

        stream::iter(items).boxed()
    }
}
