//! State management module
//!
//! Persists cursor state between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - one cursor state blob per stream
//! - `StateManager` - file-based state persistence with atomic writes

mod manager;
mod types;

pub use manager::StateManager;
pub use types::State;

#[cfg(test)]
mod manager_tests;
