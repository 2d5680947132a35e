//! Consumer-side bookkeeping of a concurrent read
//!
//! Reacts to every queue item, tracks per-stream progress and decides when a
//! stream and the whole read are done. Owns the task runner and every cursor;
//! nothing here is touched by worker tasks.

use super::types::{Message, StreamStatus, SyncStats};
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::pool::BoundedTaskRunner;
use crate::producer::{PartitionProducer, PartitionReader};
use crate::queue::{QueueSender, StreamError};
use crate::stream::{Partition, Record, SourceStream};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info};

struct StreamProgress {
    stream: Arc<dyn SourceStream>,
    cursor: Box<dyn Cursor>,
    open_partitions: usize,
    generation_finished: bool,
    records: usize,
    started: bool,
    running: bool,
    done: bool,
}

impl StreamProgress {
    fn new(stream: Arc<dyn SourceStream>) -> Self {
        let cursor = stream.cursor();
        Self {
            stream,
            cursor,
            open_partitions: 0,
            generation_finished: false,
            records: 0,
            started: false,
            running: false,
            done: false,
        }
    }

    fn is_drained(&self) -> bool {
        self.generation_finished && self.open_partitions == 0
    }
}

/// Turns queue items into output messages
pub struct ConcurrentReadProcessor {
    streams: HashMap<String, StreamProgress>,
    order: Vec<String>,
    to_start: VecDeque<String>,
    generating: HashSet<String>,
    runner: BoundedTaskRunner,
    producer: PartitionProducer,
    reader: PartitionReader,
    log_slices: bool,
    stats: SyncStats,
}

impl ConcurrentReadProcessor {
    /// Create a processor for `streams`, submitting work to `runner`
    pub fn new(
        streams: Vec<Arc<dyn SourceStream>>,
        runner: BoundedTaskRunner,
        queue: QueueSender,
        log_slices: bool,
    ) -> Result<Self> {
        let mut progress = HashMap::new();
        let mut order = Vec::new();

        for stream in streams {
            let name = stream.name().to_string();
            if progress.contains_key(&name) {
                return Err(Error::config(format!("Duplicate stream name '{name}'")));
            }
            order.push(name.clone());
            progress.insert(name, StreamProgress::new(stream));
        }

        let producer = PartitionProducer::new(queue.clone(), runner.gauge());
        Ok(Self {
            streams: progress,
            to_start: order.iter().cloned().collect(),
            order,
            generating: HashSet::new(),
            runner,
            producer,
            reader: PartitionReader::new(queue),
            log_slices,
            stats: SyncStats::new(),
        })
    }

    /// Start up to `generators` partition generators
    pub fn start(&mut self, generators: usize) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for _ in 0..generators {
            match self.start_next_partition_generator()? {
                Some(message) => messages.push(message),
                None => break,
            }
        }
        Ok(messages)
    }

    /// Start generating partitions for the next stream, if any is left
    pub fn start_next_partition_generator(&mut self) -> Result<Option<Message>> {
        let Some(name) = self.to_start.pop_front() else {
            return Ok(None);
        };
        let progress = self.progress_mut(&name)?;
        progress.started = true;
        let stream = Arc::clone(&progress.stream);

        let producer = self.producer.clone();
        self.runner.submit_unbounded(
            format!("{name}:generate_partitions"),
            async move { producer.generate_partitions(stream).await },
        )?;
        self.generating.insert(name.clone());

        info!(stream = %name, "Started partition generation");
        Ok(Some(Message::status(name, StreamStatus::Started)))
    }

    /// Schedule a freshly enumerated partition for reading
    ///
    /// Waits when the runner is at capacity.
    pub async fn on_partition(&mut self, partition: Arc<dyn Partition>) -> Result<Vec<Message>> {
        let name = partition.stream_name().to_string();
        self.progress_mut(&name)?.open_partitions += 1;

        let mut messages = Vec::new();
        if self.log_slices {
            if let Some(slice) = partition.to_slice() {
                messages.push(Message::info(format!("slice:{slice}")));
            }
        }

        let label = format!("{name}:{}", partition.id());
        let reader = self.reader.clone();
        self.runner
            .submit(label, async move { reader.process_partition(partition).await })
            .await?;
        Ok(messages)
    }

    /// Pass a record through, updating the stream's cursor
    pub fn on_record(&mut self, record: Record) -> Result<Vec<Message>> {
        let progress = self.progress_mut(&record.stream)?;
        let mut messages = Vec::new();

        if !progress.running {
            progress.running = true;
            messages.push(Message::status(&record.stream, StreamStatus::Running));
        }
        progress.records += 1;
        progress.cursor.observe(&record);
        self.stats.add_record();

        messages.push(Message::from(record));
        Ok(messages)
    }

    /// Close a fully read partition
    pub fn on_partition_complete(&mut self, partition: Arc<dyn Partition>) -> Result<Vec<Message>> {
        let name = partition.stream_name().to_string();
        let progress = self.progress_mut(&name)?;
        if progress.open_partitions == 0 {
            return Err(Error::Other(format!(
                "Partition '{}' of stream '{name}' completed without being scheduled",
                partition.id()
            )));
        }
        progress.open_partitions -= 1;

        let mut messages = Vec::new();
        if let Some(state) = progress.cursor.close_partition(partition.as_ref()) {
            messages.push(Message::state(&name, state));
            self.stats.add_state();
        }
        self.stats.add_partition();
        debug!(
            stream = %name,
            partition = %partition.id(),
            records_so_far = self.records_read(&name).unwrap_or_default(),
            "Partition complete"
        );

        if self.streams.get(&name).is_some_and(StreamProgress::is_drained) {
            messages.extend(self.on_stream_done(&name)?);
        }
        Ok(messages)
    }

    /// Record that a stream has enumerated every partition
    pub fn on_partition_generation_completed(&mut self, stream: &str) -> Result<Vec<Message>> {
        self.generating.remove(stream);
        let progress = self.progress_mut(stream)?;
        progress.generation_finished = true;

        let mut messages = Vec::new();
        if progress.is_drained() {
            messages.extend(self.on_stream_done(stream)?);
        }
        if let Some(message) = self.start_next_partition_generator()? {
            messages.push(message);
        }
        Ok(messages)
    }

    fn on_stream_done(&mut self, stream: &str) -> Result<Vec<Message>> {
        let progress = self.progress_mut(stream)?;
        progress.done = true;
        let records = progress.records;
        let state = progress.cursor.final_state();

        self.stats.add_state();
        self.stats.add_stream();
        info!(stream = %stream, records, "Finished reading stream");

        Ok(vec![
            Message::state(stream, state),
            Message::info(format!("Read {records} records from {stream} stream")),
            Message::status(stream, StreamStatus::Complete),
        ])
    }

    /// Stop everything after a worker failure
    ///
    /// Returns the messages to emit before surfacing the error.
    pub fn on_exception(&mut self, failure: StreamError) -> (Vec<Message>, Error) {
        let StreamError { stream, error } = failure;
        error!(stream = %stream, error = %error, "Stream read failed");
        let mut messages = vec![Message::error(format!(
            "Error while reading stream {stream}: {error}"
        ))];
        messages.extend(self.abort());
        (messages, error)
    }

    /// Shut the runner down and mark every unfinished stream incomplete
    pub fn abort(&mut self) -> Vec<Message> {
        self.runner.shutdown();
        let mut messages = Vec::new();
        for name in &self.order {
            if let Some(progress) = self.streams.get_mut(name) {
                if progress.started && !progress.done {
                    progress.done = true;
                    messages.push(Message::status(name, StreamStatus::Incomplete));
                }
            }
        }
        messages
    }

    /// No stream left to start, none generating, every stream drained
    pub fn is_done(&self) -> bool {
        self.to_start.is_empty()
            && self.generating.is_empty()
            && self.streams.values().all(|p| p.done)
    }

    /// Records read so far for `stream`
    pub fn records_read(&self, stream: &str) -> Option<usize> {
        self.streams.get(stream).map(|p| p.records)
    }

    /// Statistics of the read so far
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Mutable access to the task runner
    pub fn runner_mut(&mut self) -> &mut BoundedTaskRunner {
        &mut self.runner
    }

    fn progress_mut(&mut self, stream: &str) -> Result<&mut StreamProgress> {
        self.streams
            .get_mut(stream)
            .ok_or_else(|| Error::StreamNotFound {
                stream: stream.to_string(),
            })
    }
}
