//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::cursor::NO_CURSOR_STATE_KEY;
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete state of a source: one cursor state blob per stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream cursor state, exactly as emitted by the stream's cursor
    #[serde(default)]
    pub streams: BTreeMap<String, JsonValue>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&JsonValue> {
        self.streams.get(stream)
    }

    /// Replace the state of a stream
    ///
    /// Returns false for the marker emitted by streams without a cursor,
    /// which is not persisted.
    pub fn set_stream(&mut self, stream: &str, value: JsonValue) -> bool {
        if is_no_cursor_marker(&value) {
            return false;
        }
        self.streams.insert(stream.to_string(), value);
        true
    }

    /// Drop the state of a stream
    pub fn remove_stream(&mut self, stream: &str) -> Option<JsonValue> {
        self.streams.remove(stream)
    }

    /// Whether no stream has state
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

fn is_no_cursor_marker(value: &JsonValue) -> bool {
    value
        .get(NO_CURSOR_STATE_KEY)
        .and_then(JsonValue::as_bool)
        .unwrap_or(false)
}
