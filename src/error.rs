//! Error types for Solidafy Concurrent
//!
//! This module defines the error hierarchy for the whole engine.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// A single failed task, as reported by the task runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Label the task was submitted with
    pub task: String,
    /// Rendered error of the task
    pub message: String,
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.task, self.message)
    }
}

/// The main error type for Solidafy Concurrent
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    // ============================================================================
    // Task Runner Errors
    // ============================================================================
    #[error("Failed reading from task '{task}': {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed processing {} task(s): {}", .failures.len(), render_failures(.failures))]
    TasksFailed { failures: Vec<TaskFailure> },

    #[error("Expected all tasks to be done, but {pending} are still running")]
    TasksPending { pending: usize },

    #[error("Task runner has been shut down")]
    RunnerShutDown,

    #[error("Record queue closed before every stream completed")]
    QueueClosed,

    // ============================================================================
    // Stream Errors
    // ============================================================================
    #[error("Partition generation failed for stream '{stream}': {message}")]
    PartitionGeneration { stream: String, message: String },

    #[error("Partition '{partition}' of stream '{stream}' failed: {message}")]
    Partition {
        stream: String,
        partition: String,
        message: String,
    },

    #[error("Stream '{stream}' not found")]
    StreamNotFound { stream: String },

    #[error("Failed to decode file content: {message}")]
    Decode { message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

fn render_failures(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wrap the error of a failed task
    pub fn task_failed(task: impl Into<String>, source: Error) -> Self {
        Self::TaskFailed {
            task: task.into(),
            source: Box::new(source),
        }
    }

    /// Create a partition generation error
    pub fn partition_generation(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PartitionGeneration {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a partition error
    pub fn partition(
        stream: impl Into<String>,
        partition: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Partition {
            stream: stream.into(),
            partition: partition.into(),
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }
}

/// Result type alias for Solidafy Concurrent
pub type Result<T> = std::result::Result<T, Error>;
