//! CLI module
//!
//! Command-line interface for reading file-based sources.
//!
//! # Commands
//!
//! - `read` - Read streams concurrently and emit messages
//! - `streams` - List stream names
//! - `validate` - Validate a source configuration
//! - `spec` - Show the configuration specification

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
