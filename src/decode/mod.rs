//! File content decoder module
//!
//! Supports: JSONL, JSON, CSV
//!
//! # Overview
//!
//! The decode module turns the content of a file into records. JSON
//! documents can point at the record array with a dot path.

mod decoders;
mod types;

pub use decoders::{CsvDecoder, JsonDecoder, JsonlDecoder};
pub use types::{DecoderConfig, DecoderFormat, RecordDecoder};
