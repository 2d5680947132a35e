//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Concurrent file source reader
#[derive(Parser, Debug)]
#[command(name = "solidafy-concurrent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (JSON)
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Worker threads (overrides `concurrency.num_workers`)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read data from streams
    Read {
        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,

        /// Maximum concurrent partition reads (overrides config)
        #[arg(long)]
        max_concurrent_tasks: Option<usize>,

        /// Log each partition as it is scheduled
        #[arg(long)]
        log_slices: bool,
    },

    /// List available stream names
    Streams,

    /// Validate the source configuration
    Validate,

    /// Show configuration specification
    Spec,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

impl Commands {
    /// Selected stream names of a `read` command
    pub fn selected_streams(&self) -> Vec<String> {
        match self {
            Commands::Read {
                streams: Some(list),
                ..
            } => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }
}
