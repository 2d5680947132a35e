//! Partition reading

use super::failure_message;
use crate::error::{Error, Result};
use crate::queue::{QueueItem, QueueSender, StreamError};
use crate::stream::Partition;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error};

/// Reads partitions into the queue
#[derive(Debug, Clone)]
pub struct PartitionReader {
    queue: QueueSender,
}

impl PartitionReader {
    /// Create a reader pushing to `queue`
    pub fn new(queue: QueueSender) -> Self {
        Self { queue }
    }

    /// Push every record of `partition` in order, then its completion sentinel
    pub async fn process_partition(&self, partition: Arc<dyn Partition>) -> Result<()> {
        let stream = partition.stream_name().to_string();
        let mut count = 0usize;

        {
            let mut records = partition.read();
            while let Some(next) = records.next().await {
                match next {
                    Ok(record) => {
                        self.queue.put(QueueItem::Record(record))?;
                        count += 1;
                    }
                    Err(e) => {
                        let message = failure_message(&e);
                        error!(
                            stream = %stream,
                            partition = %partition.id(),
                            error = %message,
                            "Partition read failed"
                        );
                        let _ = self.queue.put(QueueItem::Error(StreamError::new(
                            &stream,
                            Error::partition(&stream, partition.id(), &message),
                        )));
                        return Err(Error::partition(&stream, partition.id(), message));
                    }
                }
            }
        }

        debug!(stream = %stream, partition = %partition.id(), records = count, "Partition read");
        self.queue.put(QueueItem::PartitionComplete(partition))
    }
}
