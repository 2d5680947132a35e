//! Worker pool module
//!
//! Bounded execution of partition reads on the tokio runtime's worker threads.
//!
//! # Overview
//!
//! - `BoundedTaskRunner` - spawns and tracks tasks, enforces the concurrency cap, detects failures
//! - `CapacityGauge` - read-only view of the in-flight count for producers
//! - `RunnerConfig` - limit and capacity wait bound

mod runner;

pub use runner::{
    BoundedTaskRunner, CapacityGauge, RunnerConfig, DEFAULT_MAX_CONCURRENT_TASKS,
    DEFAULT_SLEEP_TIME,
};
