//! Source configuration
//!
//! Describes a file-based source in YAML (or JSON): concurrency limits,
//! history bounds and the streams to read.
//!
//! ```yaml
//! name: local-files
//! concurrency:
//!   max_concurrent_tasks: 100
//!   num_workers: 8
//! history:
//!   max_history_size: 10000
//!   days_to_sync_if_history_is_full: 3
//! streams:
//!   - name: orders
//!     path: ./data/orders
//!     glob: "**/*.csv"
//!     sync_mode: incremental
//! ```

use crate::cursor::{
    FileHistoryCursor, DEFAULT_DAYS_TO_SYNC_IF_HISTORY_IS_FULL, DEFAULT_MAX_HISTORY_SIZE,
};
use crate::decode::{DecoderConfig, DecoderFormat};
use crate::engine::ConcurrencyConfig;
use crate::error::{Error, Result};
use crate::file_based::{FileBasedStream, LocalFileLister};
use crate::state::State;
use crate::stream::SourceStream;
use crate::types::SyncMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Top-Level Source Config
// ============================================================================

/// Complete source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source name, used in logs
    #[serde(default = "default_name")]
    pub name: String,

    /// Concurrency limits
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// File history bounds for incremental streams
    #[serde(default)]
    pub history: HistoryConfig,

    /// Streams to read
    #[serde(default)]
    pub streams: Vec<StreamDefinition>,
}

fn default_name() -> String {
    "files".to_string()
}

impl SourceConfig {
    /// Resolve relative stream paths against `base`
    #[must_use]
    pub fn with_base_dir(mut self, base: impl AsRef<Path>) -> Self {
        for stream in &mut self.streams {
            if stream.path.is_relative() {
                stream.path = base.as_ref().join(&stream.path);
            }
        }
        self
    }

    /// Find a stream definition by name
    pub fn stream(&self, name: &str) -> Option<&StreamDefinition> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        self.concurrency.validate()?;
        self.history.validate()?;

        if self.streams.is_empty() {
            return Err(Error::config("Source must have at least one stream"));
        }

        let mut names = HashSet::new();
        for stream in &self.streams {
            stream.validate()?;
            if !names.insert(stream.name.as_str()) {
                return Err(Error::config(format!(
                    "Duplicate stream name '{}'",
                    stream.name
                )));
            }
        }
        Ok(())
    }

    /// Build the selected streams, seeding incremental cursors from `state`
    ///
    /// An empty selection builds every stream.
    pub fn build_streams(
        &self,
        selected: &[String],
        state: &State,
    ) -> Result<Vec<Arc<dyn SourceStream>>> {
        for name in selected {
            if self.stream(name).is_none() {
                return Err(Error::StreamNotFound {
                    stream: name.clone(),
                });
            }
        }

        self.streams
            .iter()
            .filter(|s| selected.is_empty() || selected.contains(&s.name))
            .map(|s| s.build(&self.history, state))
            .collect()
    }
}

// ============================================================================
// History Config
// ============================================================================

/// Longest accepted look-back window, in days
pub const MAX_DAYS_TO_SYNC_IF_HISTORY_IS_FULL: i64 = 36_500;

/// Bounds of the file history kept by incremental streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of files remembered
    pub max_history_size: usize,
    /// Look-back window used once the history has been truncated
    pub days_to_sync_if_history_is_full: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            days_to_sync_if_history_is_full: DEFAULT_DAYS_TO_SYNC_IF_HISTORY_IS_FULL,
        }
    }
}

impl HistoryConfig {
    /// An empty cursor with these bounds
    pub fn cursor(&self) -> FileHistoryCursor {
        FileHistoryCursor::new(
            self.max_history_size,
            chrono::TimeDelta::try_days(self.days_to_sync_if_history_is_full)
                .unwrap_or(chrono::TimeDelta::MAX),
        )
    }

    fn validate(&self) -> Result<()> {
        if self.max_history_size == 0 {
            return Err(Error::invalid_value(
                "max_history_size",
                "must be at least 1",
            ));
        }
        if self.days_to_sync_if_history_is_full < 0 {
            return Err(Error::invalid_value(
                "days_to_sync_if_history_is_full",
                "must not be negative",
            ));
        }
        if self.days_to_sync_if_history_is_full > MAX_DAYS_TO_SYNC_IF_HISTORY_IS_FULL {
            return Err(Error::invalid_value(
                "days_to_sync_if_history_is_full",
                format!("must be at most {MAX_DAYS_TO_SYNC_IF_HISTORY_IS_FULL}"),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Stream Definition
// ============================================================================

/// One file-based stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDefinition {
    /// Stream name
    pub name: String,

    /// Directory holding the stream's files
    pub path: PathBuf,

    /// Only read files whose relative path matches this glob
    #[serde(default)]
    pub glob: Option<String>,

    /// How to decode file content (default: guessed from the glob, else JSONL)
    #[serde(default)]
    pub decoder: Option<DecoderConfig>,

    /// Full refresh or incremental
    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl StreamDefinition {
    /// Create a full-refresh stream definition
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            glob: None,
            decoder: None,
            sync_mode: SyncMode::FullRefresh,
        }
    }

    /// Set the glob
    #[must_use]
    pub fn with_glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = Some(glob.into());
        self
    }

    /// Set the decoder
    #[must_use]
    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Set the sync mode
    #[must_use]
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// Effective decoder configuration
    pub fn decoder_config(&self) -> DecoderConfig {
        if let Some(decoder) = &self.decoder {
            return decoder.clone();
        }
        let format = self
            .glob
            .as_deref()
            .and_then(DecoderFormat::from_extension)
            .unwrap_or_default();
        DecoderConfig {
            format,
            ..DecoderConfig::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config("Stream name cannot be empty"));
        }
        if self.path.as_os_str().is_empty() {
            return Err(Error::config(format!(
                "Stream '{}' path cannot be empty",
                self.name
            )));
        }
        if let Some(glob) = &self.glob {
            crate::file_based::glob_to_regex(glob)?;
        }
        Ok(())
    }

    /// Build the stream; incremental streams start from the stored history
    pub fn build(&self, history: &HistoryConfig, state: &State) -> Result<Arc<dyn SourceStream>> {
        let mut lister = LocalFileLister::new(&self.path);
        if let Some(glob) = &self.glob {
            lister = lister.with_glob(glob)?;
        }

        let stream = FileBasedStream::new(
            self.name.clone(),
            Arc::new(lister),
            self.decoder_config().build(),
        );

        let stream = match self.sync_mode {
            SyncMode::FullRefresh => stream,
            SyncMode::Incremental => {
                let mut cursor = history.cursor();
                if let Some(previous) = state.get_stream(&self.name) {
                    cursor.set_initial_state(previous)?;
                }
                debug!(stream = %self.name, files = cursor.len(), "Seeded file history");
                stream.with_history(cursor)
            }
        };

        Ok(Arc::new(stream))
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a source configuration file
///
/// `.json` files are parsed as JSON, everything else as YAML. Relative
/// stream paths are resolved against the file's directory.
pub fn load_config(path: impl AsRef<Path>) -> Result<SourceConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        }
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config: SourceConfig = if is_json {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let config = config.with_base_dir(base);
    config.validate()?;
    Ok(config)
}

/// Load and validate a source configuration from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<SourceConfig> {
    let config: SourceConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}
