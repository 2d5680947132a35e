//! Partition enumeration

use super::failure_message;
use crate::error::{Error, Result};
use crate::pool::CapacityGauge;
use crate::queue::{QueueItem, QueueSender, StreamError};
use crate::stream::SourceStream;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error};

/// Enumerates the partitions of a stream onto the queue
#[derive(Debug, Clone)]
pub struct PartitionProducer {
    queue: QueueSender,
    gauge: CapacityGauge,
}

impl PartitionProducer {
    /// Create a producer pushing to `queue`, throttled by `gauge`
    pub fn new(queue: QueueSender, gauge: CapacityGauge) -> Self {
        Self { queue, gauge }
    }

    /// Push every partition of `stream`, then the completion sentinel
    ///
    /// Waits while the read limit is reached so enumeration does not run
    /// arbitrarily far ahead of reading. On an enumeration error the error is
    /// queued and returned, and no completion sentinel is sent.
    pub async fn generate_partitions(&self, stream: Arc<dyn SourceStream>) -> Result<()> {
        let name = stream.name().to_string();
        let mut partitions = stream.generate_partitions();
        let mut count = 0usize;

        while let Some(next) = partitions.next().await {
            let partition = match next {
                Ok(partition) => partition,
                Err(e) => {
                    let message = failure_message(&e);
                    error!(stream = %name, error = %message, "Partition generation failed");
                    let _ = self.queue.put(QueueItem::Error(StreamError::new(
                        &name,
                        Error::partition_generation(&name, &message),
                    )));
                    return Err(Error::partition_generation(&name, message));
                }
            };

            if self.gauge.has_reached_limit() {
                debug!(stream = %name, "Waiting for read capacity before queueing more partitions");
                self.gauge.wait_for_capacity().await;
            }

            debug!(stream = %name, partition = %partition.id(), "Generated partition");
            self.queue.put(QueueItem::Partition(partition))?;
            count += 1;
        }

        debug!(stream = %name, partitions = count, "Partition generation completed");
        self.queue
            .put(QueueItem::PartitionGenerationCompleted(name))
    }
}
