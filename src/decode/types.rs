//! Decoder types and traits
//!
//! Defines the core decoder abstractions.

use super::decoders::{CsvDecoder, JsonDecoder, JsonlDecoder};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Format of a file's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderFormat {
    /// JSON Lines format (one JSON object per line, default)
    #[default]
    Jsonl,
    /// JSON document
    Json,
    /// CSV format
    Csv,
}

impl DecoderFormat {
    /// Guess the format from a file name
    pub fn from_extension(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Configuration for decoding file content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Content format
    #[serde(default)]
    pub format: DecoderFormat,
    /// Dot path to the records inside a JSON document
    #[serde(default)]
    pub record_path: Option<String>,
    /// CSV delimiter (default: comma)
    #[serde(default)]
    pub csv_delimiter: Option<char>,
    /// Whether CSV has a header row
    #[serde(default = "default_true")]
    pub csv_has_header: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            format: DecoderFormat::default(),
            record_path: None,
            csv_delimiter: None,
            csv_has_header: true,
        }
    }
}

impl DecoderConfig {
    /// Decoder config for `format` with default options
    pub fn for_format(format: DecoderFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// JSON documents, records at `path`
    pub fn json_with_path(path: impl Into<String>) -> Self {
        Self::for_format(DecoderFormat::Json).with_record_path(path)
    }

    /// CSV with a custom delimiter
    pub fn csv_with_delimiter(delimiter: char, has_header: bool) -> Self {
        Self {
            csv_delimiter: Some(delimiter),
            csv_has_header: has_header,
            ..Self::for_format(DecoderFormat::Csv)
        }
    }

    /// Set the record path
    #[must_use]
    pub fn with_record_path(mut self, path: impl Into<String>) -> Self {
        self.record_path = Some(path.into());
        self
    }

    /// Build the decoder described by this config
    pub fn build(&self) -> Arc<dyn RecordDecoder> {
        match (self.format, &self.record_path) {
            (DecoderFormat::Jsonl, _) => Arc::new(JsonlDecoder::new()),
            (DecoderFormat::Json, Some(path)) => Arc::new(JsonDecoder::with_path(path.clone())),
            (DecoderFormat::Json, None) => Arc::new(JsonDecoder::new()),
            (DecoderFormat::Csv, _) => Arc::new(CsvDecoder::with_options(
                self.csv_delimiter.unwrap_or(','),
                self.csv_has_header,
            )),
        }
    }
}

/// Turns the content of one file into records
pub trait RecordDecoder: Send + Sync {
    /// Format this decoder reads
    fn format(&self) -> DecoderFormat;

    /// Decode the whole content of a file
    fn decode(&self, content: &str) -> Result<Vec<Value>>;
}
