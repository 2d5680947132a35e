//! Multi-producer / single-consumer record queue

use super::types::QueueItem;
use crate::error::{Error, Result};
use std::time::Duration;
use tokio::sync::mpsc;

/// Create a queue; clone the sender for every producer
pub fn record_queue() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Producer side of the queue
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<QueueItem>,
}

impl QueueSender {
    /// Push an item; never blocks
    pub fn put(&self, item: QueueItem) -> Result<()> {
        self.tx.send(item).map_err(|_| Error::QueueClosed)
    }
}

/// Outcome of a bounded wait on the queue
#[derive(Debug)]
pub enum Received {
    /// An item arrived
    Item(QueueItem),
    /// Nothing arrived in time
    TimedOut,
    /// Every sender is gone and the queue is drained
    Closed,
}

/// Consumer side of the queue
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<QueueItem>,
}

impl QueueReceiver {
    /// Wait for the next item for at most `timeout`
    pub async fn get_timeout(&mut self, timeout: Duration) -> Received {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(item)) => Received::Item(item),
            Ok(None) => Received::Closed,
            Err(_) => Received::TimedOut,
        }
    }
}
