//! Cursor module
//!
//! Per-stream incremental bookkeeping, mutated only by the consumer.
//!
//! # Overview
//!
//! - `Cursor` - observe records, close partitions, emit checkpoints
//! - `FinalStateCursor` - full-refresh streams; one terminal state message
//! - `FileHistoryCursor` - bounded history of synced files with a time window fallback

mod history;
mod types;

pub use history::{
    format_timestamp, parse_timestamp, FileHistoryCursor, FileHistoryState, CURSOR_FIELD,
    DATE_TIME_FORMAT, DEFAULT_DAYS_TO_SYNC_IF_HISTORY_IS_FULL, DEFAULT_MAX_HISTORY_SIZE,
};
pub use types::{Cursor, FinalStateCursor, NO_CURSOR_STATE_KEY};
