//! Cursor trait and the full-refresh cursor

use crate::stream::{Partition, Record};
use crate::types::JsonValue;
use serde_json::json;

/// State key emitted by streams that do not track a cursor
pub const NO_CURSOR_STATE_KEY: &str = "__ab_no_cursor_state_message";

/// Per-stream progress tracking, owned and mutated by the consumer only
pub trait Cursor: Send {
    /// Observe a record as it is handed to the caller
    fn observe(&mut self, _record: &Record) {}

    /// Close a fully read partition, returning a checkpoint to emit if any
    fn close_partition(&mut self, partition: &dyn Partition) -> Option<JsonValue>;

    /// Terminal state emitted once the stream is complete
    fn final_state(&self) -> JsonValue;
}

/// Cursor for full-refresh streams
///
/// Never checkpoints mid-stream; emits a marker state once the stream is done
/// so the caller always receives at least one state message per stream.
#[derive(Debug, Clone, Default)]
pub struct FinalStateCursor {
    records_observed: u64,
}

impl FinalStateCursor {
    /// Create a new final-state cursor
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records observed so far
    pub fn records_observed(&self) -> u64 {
        self.records_observed
    }
}

impl Cursor for FinalStateCursor {
    fn observe(&mut self, _record: &Record) {
        self.records_observed += 1;
    }

    fn close_partition(&mut self, _partition: &dyn Partition) -> Option<JsonValue> {
        None
    }

    fn final_state(&self) -> JsonValue {
        json!({ "__ab_no_cursor_state_message": true })
    }
}
