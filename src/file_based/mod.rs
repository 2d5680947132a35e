//! File-based streams
//!
//! Streams backed by a set of files, one partition per file, with
//! incremental syncs driven by the bounded file history cursor.
//!
//! # Overview
//!
//! - `RemoteFile` - uri + last modified timestamp
//! - `FileLister` - lists and reads files; `LocalFileLister` for local directories
//! - `FileBasedStream` / `FilePartition` - `SourceStream` / `Partition` implementations

mod lister;
mod stream;
mod types;

pub use lister::{glob_to_regex, FileLister, LocalFileLister};
pub use stream::{FileBasedStream, FilePartition};
pub use types::{RemoteFile, FILE_URL_FIELD};

#[cfg(test)]
mod tests;
