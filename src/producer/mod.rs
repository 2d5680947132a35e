//! Producer module
//!
//! Worker-side tasks feeding the record queue.
//!
//! # Overview
//!
//! - `PartitionProducer` - enumerates a stream's partitions, then pushes the completion sentinel
//! - `PartitionReader` - reads one partition, then pushes its completion sentinel

mod partition_producer;
mod partition_reader;

pub use partition_producer::PartitionProducer;
pub use partition_reader::PartitionReader;

use crate::error::Error;

/// Message of an error, without re-wrapping errors that already carry a stream
fn failure_message(error: &Error) -> String {
    match error {
        Error::PartitionGeneration { message, .. } | Error::Partition { message, .. } => {
            message.clone()
        }
        other => other.to_string(),
    }
}
