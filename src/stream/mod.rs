//! Stream module
//!
//! Collaborator contracts consumed by the engine.
//!
//! # Overview
//!
//! - `SourceStream` - a named source that lazily enumerates partitions
//! - `Partition` - an independently readable unit of work (one file, one page range, one shard)
//! - `Record` - one output row plus stream name and emission timestamp
//! - `InMemoryStream` / `InMemoryPartition` - in-memory implementations

mod memory;
mod types;

pub use memory::{InMemoryPartition, InMemoryStream};
pub use types::{Partition, PartitionStream, Record, RecordStream, SourceStream};
