//! Execution engine module
//!
//! Main read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ConcurrentSource` - reads many streams concurrently into one message stream
//! - `ConcurrentReadProcessor` - consumer bookkeeping behind the read loop
//! - `ConcurrencyConfig` - limits for a read
//! - Message types for output (Record, State, StreamStatus, Log)

mod processor;
mod types;

pub use processor::ConcurrentReadProcessor;
pub use types::{
    ConcurrencyConfig, Message, StreamStatus, SyncStats, DEFAULT_NUM_WORKERS,
    DEFAULT_SLEEP_TIME_MS,
};

use crate::error::{Error, Result};
use crate::pool::BoundedTaskRunner;
use crate::queue::{record_queue, QueueItem, QueueReceiver, Received};
use crate::stream::SourceStream;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Messages of a read, ending with the first error
pub type MessageStream = BoxStream<'static, Result<Message>>;

/// Reads a set of streams concurrently
#[derive(Debug, Clone, Default)]
pub struct ConcurrentSource {
    config: ConcurrencyConfig,
}

impl ConcurrentSource {
    /// Create a source with the given concurrency settings
    pub fn new(config: ConcurrencyConfig) -> Self {
        Self { config }
    }

    /// Concurrency settings
    pub fn config(&self) -> &ConcurrencyConfig {
        &self.config
    }

    /// Read every stream, yielding messages as they are produced
    ///
    /// Must be called from within a tokio runtime. Records of one partition
    /// keep their order; records of different partitions interleave. The
    /// stream fails as soon as any worker fails, after marking unfinished
    /// streams incomplete. Dropping it cancels every running task.
    pub fn read(&self, streams: Vec<Arc<dyn SourceStream>>) -> Result<MessageStream> {
        self.config.validate()?;

        let runner = BoundedTaskRunner::new(self.config.runner_config())?;
        let (queue, receiver) = record_queue();
        let processor =
            ConcurrentReadProcessor::new(streams, runner, queue, self.config.log_slices)?;

        let read_loop = ReadLoop {
            processor,
            receiver,
            buffered: VecDeque::new(),
            failure: None,
            generators: self.config.partition_generators(),
            sleep_time: self.config.sleep_time(),
            started_at: None,
            finished: false,
        };

        Ok(stream::try_unfold(read_loop, |mut read_loop| async move {
            let next = read_loop.next_message().await?;
            Ok(next.map(|message| (message, read_loop)))
        })
        .boxed())
    }
}

/// Longest wait for tasks to return once every stream is drained
const TASK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

struct ReadLoop {
    processor: ConcurrentReadProcessor,
    receiver: QueueReceiver,
    buffered: VecDeque<Message>,
    failure: Option<Error>,
    generators: usize,
    sleep_time: Duration,
    started_at: Option<Instant>,
    finished: bool,
}

impl ReadLoop {
    async fn next_message(&mut self) -> Result<Option<Message>> {
        loop {
            if let Some(message) = self.buffered.pop_front() {
                return Ok(Some(message));
            }
            if let Some(error) = self.failure.take() {
                self.finished = true;
                return Err(error);
            }
            if self.finished {
                return Ok(None);
            }

            if self.started_at.is_none() {
                self.started_at = Some(Instant::now());
                let messages = self.processor.start(self.generators);
                self.absorb(messages);
                continue;
            }

            if self.processor.is_done() {
                self.finish().await?;
                continue;
            }

            match self.receiver.get_timeout(self.sleep_time).await {
                Received::Item(item) => {
                    let messages = self.handle(item).await;
                    self.absorb(messages);
                }
                Received::TimedOut => {
                    // Catches tasks that died without reporting (panics)
                    if let Err(error) = self.processor.runner_mut().prune_futures() {
                        self.fail(error);
                    }
                }
                Received::Closed => self.fail(Error::QueueClosed),
            }
        }
    }

    async fn handle(&mut self, item: QueueItem) -> Result<Vec<Message>> {
        if item.is_sentinel() {
            debug!(stream = %item.stream_name(), kind = item.kind(), "Lifecycle item");
        }
        match item {
            QueueItem::Partition(partition) => self.processor.on_partition(partition).await,
            QueueItem::Record(record) => self.processor.on_record(record),
            QueueItem::PartitionComplete(partition) => {
                self.processor.on_partition_complete(partition)
            }
            QueueItem::PartitionGenerationCompleted(stream) => {
                self.processor.on_partition_generation_completed(&stream)
            }
            QueueItem::Error(failure) => {
                let (messages, error) = self.processor.on_exception(failure);
                self.buffered.extend(messages);
                Err(error)
            }
        }
    }

    fn absorb(&mut self, messages: Result<Vec<Message>>) {
        match messages {
            Ok(messages) => self.buffered.extend(messages),
            Err(error) => self.fail(error),
        }
    }

    fn fail(&mut self, error: Error) {
        if self.failure.is_some() {
            return;
        }
        // No-op for streams already marked by `on_exception`
        let messages = self.processor.abort();
        self.buffered.extend(messages);
        self.failure = Some(error);
    }

    async fn finish(&mut self) -> Result<()> {
        let runner = self.processor.runner_mut();
        // Tasks push their last item right before returning
        if !runner.wait_until_done(TASK_DRAIN_TIMEOUT).await {
            warn!(
                pending = runner.tracked(),
                "Tasks still running after every stream finished"
            );
        }
        if let Err(error) = runner.check_for_errors_and_shutdown() {
            runner.shutdown();
            return Err(error);
        }

        let mut stats = self.processor.stats().clone();
        if let Some(started_at) = self.started_at {
            stats.set_duration(started_at.elapsed().as_millis() as u64);
        }
        info!(
            records = stats.records_synced,
            streams = stats.streams_synced,
            partitions = stats.partitions_synced,
            duration_ms = stats.duration_ms,
            "Concurrent read finished"
        );
        self.finished = true;
        Ok(())
    }
}
