//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_config, SourceConfig};
use crate::engine::{ConcurrentSource, Message, StreamStatus, DEFAULT_NUM_WORKERS};
use crate::error::{Error, Result};
use crate::state::StateManager;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

/// Per-stream outcome reported in the sync summary
#[derive(Debug, Default)]
struct StreamResult {
    records: u64,
    status: Option<StreamStatus>,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Worker threads the runtime should be built with
    ///
    /// The `--workers` flag wins, then `concurrency.num_workers` from the
    /// config file. A config that cannot be loaded falls back to the default
    /// and is reported again when the command runs.
    pub fn worker_threads(&self) -> usize {
        if let Some(workers) = self.cli.workers {
            return workers.max(1);
        }
        self.load_config()
            .map(|c| c.concurrency.num_workers)
            .unwrap_or(DEFAULT_NUM_WORKERS)
            .max(1)
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Read {
                max_concurrent_tasks,
                log_slices,
                ..
            } => {
                let selected = self.cli.command.selected_streams();
                self.read(&selected, *max_concurrent_tasks, *log_slices)
                    .await
            }
            Commands::Streams => self.streams(),
            Commands::Validate => self.validate(),
            Commands::Spec => self.spec(),
        }
    }

    /// Load the source configuration
    fn load_config(&self) -> Result<SourceConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("--config is required"))?;
        load_config(path)
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    /// Read streams and emit messages
    async fn read(
        &self,
        selected: &[String],
        max_concurrent_tasks: Option<usize>,
        log_slices: bool,
    ) -> Result<()> {
        let sync_start = Instant::now();
        let mut config = self.load_config()?;
        if let Some(workers) = self.cli.workers {
            config.concurrency.num_workers = workers;
        }
        if let Some(max) = max_concurrent_tasks {
            config.concurrency.max_concurrent_tasks = max;
        }
        if log_slices {
            config.concurrency.log_slices = true;
        }

        let state = self.load_state()?;
        let streams = {
            let current = state.state().await;
            config.build_streams(selected, &current)?
        };
        info!(source = %config.name, streams = streams.len(), "Starting read");

        let source = ConcurrentSource::new(config.concurrency.clone());
        let mut messages = source.read(streams)?;

        let mut results: BTreeMap<String, StreamResult> = BTreeMap::new();
        let mut total_records: u64 = 0;
        let mut failure = None;

        while let Some(next) = messages.next().await {
            let msg = match next {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(error = %e, "Read failed");
                    failure = Some(e);
                    break;
                }
            };

            match &msg {
                Message::Record { stream, .. } => {
                    total_records += 1;
                    results.entry(stream.clone()).or_default().records += 1;
                }
                Message::StreamStatus { stream, status, .. } => {
                    results.entry(stream.clone()).or_default().status = Some(*status);
                }
                Message::State { .. } => {
                    state.apply_message(&msg).await?;
                }
                Message::Log { .. } => {}
            }

            self.output_message(&msg.to_json());
        }

        // Persist whatever was checkpointed, even after a failure
        let state_file = match &self.cli.state {
            Some(path) => {
                state.save_to_file(path).await?;
                Some(path.to_string_lossy().to_string())
            }
            None => None,
        };

        let stream_results: Vec<Value> = results
            .iter()
            .map(|(name, result)| {
                json!({
                    "stream": name,
                    "status": result.status.map(|s| s.to_string()),
                    "records_synced": result.records,
                })
            })
            .collect();
        let failed_streams = results
            .values()
            .filter(|r| r.status != Some(StreamStatus::Complete))
            .count();

        self.output_message(&json!({
            "type": "SYNC_SUMMARY",
            "summary": {
                "status": if failure.is_none() && failed_streams == 0 { "SUCCEEDED" } else { "FAILED" },
                "source": config.name,
                "total_records": total_records,
                "total_streams": results.len(),
                "failed_streams": failed_streams,
                "duration_ms": sync_start.elapsed().as_millis() as u64,
                "state_file": state_file,
                "streams": stream_results
            }
        }));

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// List available streams
    fn streams(&self) -> Result<()> {
        let config = self.load_config()?;
        let streams: Vec<Value> = config
            .streams
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "sync_mode": s.sync_mode,
                    "path": s.path.display().to_string(),
                    "glob": s.glob,
                    "format": s.decoder_config().format,
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "STREAMS",
            "streams": streams,
            "source": config.name
        }));

        Ok(())
    }

    /// Validate source configuration
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&Message::info(format!(
            "Source '{}' is valid with {} streams",
            config.name,
            config.streams.len()
        ))
        .to_json());

        Ok(())
    }

    /// Show spec
    fn spec(&self) -> Result<()> {
        self.output_message(&json!({
            "type": "SPEC",
            "spec": {
                "connectionSpecification": {
                    "type": "object",
                    "required": ["streams"],
                    "properties": {
                        "name": {"type": "string", "default": "files"},
                        "concurrency": {
                            "type": "object",
                            "properties": {
                                "max_concurrent_tasks": {"type": "integer", "minimum": 1, "default": 10_000},
                                "sleep_time_ms": {"type": "integer", "minimum": 1, "default": 100},
                                "num_workers": {"type": "integer", "minimum": 1, "default": DEFAULT_NUM_WORKERS},
                                "initial_partition_generators": {"type": "integer", "minimum": 1},
                                "log_slices": {"type": "boolean", "default": false}
                            }
                        },
                        "history": {
                            "type": "object",
                            "properties": {
                                "max_history_size": {"type": "integer", "minimum": 1, "default": 10_000},
                                "days_to_sync_if_history_is_full": {"type": "integer", "minimum": 0, "maximum": 36_500, "default": 3}
                            }
                        },
                        "streams": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["name", "path"],
                                "properties": {
                                    "name": {"type": "string"},
                                    "path": {"type": "string"},
                                    "glob": {"type": "string"},
                                    "sync_mode": {"enum": ["full_refresh", "incremental"]},
                                    "decoder": {
                                        "type": "object",
                                        "properties": {
                                            "format": {"enum": ["jsonl", "json", "csv"]},
                                            "record_path": {"type": "string"},
                                            "csv_delimiter": {"type": "string"},
                                            "csv_has_header": {"type": "boolean"}
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }));

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
