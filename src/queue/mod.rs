//! Record queue module
//!
//! The channel between workers and the single consumer.
//!
//! # Overview
//!
//! - `QueueItem` - closed set of things workers report (partitions, records, sentinels, errors)
//! - `record_queue` - creates a `QueueSender` / `QueueReceiver` pair

mod channel;
mod types;

pub use channel::{record_queue, QueueReceiver, QueueSender, Received};
pub use types::{QueueItem, StreamError};
