//! State manager implementation
//!
//! Keeps the per-stream state of a source and checkpoints it to a JSON file.

use super::types::State;
use crate::engine::Message;
use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::debug;

#[derive(Debug, Clone)]
enum Backing {
    Memory,
    File { path: PathBuf, auto_save: bool },
}

/// Shared handle to the state of a source
///
/// Clones share the same state. File-backed managers with auto-save write
/// the file every time a stream's state changes, so the last checkpoint
/// survives a failed read.
#[derive(Debug, Clone)]
pub struct StateManager {
    backing: Backing,
    state: Arc<RwLock<State>>,
}

impl StateManager {
    fn with_backing(backing: Backing, state: State) -> Self {
        Self {
            backing,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// State that is never written anywhere
    pub fn in_memory() -> Self {
        Self::with_backing(Backing::Memory, State::new())
    }

    /// In-memory state seeded from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::with_backing(Backing::Memory, parse_state(json)?))
    }

    /// Empty state saved to `path` on every change
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::file_backed(path, true, State::new())
    }

    /// Empty state saved to `path` only on `save`
    pub fn without_auto_save(path: impl AsRef<Path>) -> Self {
        Self::file_backed(path, false, State::new())
    }

    /// State loaded from `path` if it exists, saved there on every change
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let state = match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => parse_state(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => State::new(),
            Err(e) => return Err(Error::state(format!("Failed to read state file: {e}"))),
        };
        Ok(Self::file_backed(path, true, state))
    }

    fn file_backed(path: impl AsRef<Path>, auto_save: bool, state: State) -> Self {
        let backing = Backing::File {
            path: path.as_ref().to_path_buf(),
            auto_save,
        };
        Self::with_backing(backing, state)
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File { path, .. } => Some(path),
            Backing::Memory => None,
        }
    }

    /// Whether the state lives only in memory
    pub fn is_in_memory(&self) -> bool {
        matches!(self.backing, Backing::Memory)
    }

    fn auto_save(&self) -> bool {
        matches!(self.backing, Backing::File { auto_save: true, .. })
    }

    /// Replace the current state with the backing file's content
    ///
    /// A missing file leaves the state untouched.
    pub async fn load(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::state(format!("Failed to read state file: {e}"))),
        };

        let loaded = parse_state(&contents)?;
        *self.state.write().await = loaded;
        Ok(())
    }

    /// Write the state to the backing file (no-op in memory)
    pub async fn save(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        self.save_to_file(path).await?;
        debug!(path = %path.display(), "Saved state");
        Ok(())
    }

    /// Write the state to `path`, whatever the backing
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = {
            let state = self.state.read().await;
            serde_json::to_string_pretty(&*state)
                .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?
        };
        write_atomic(path.as_ref(), &contents).await
    }

    /// Read access to the current state
    pub async fn state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().await
    }

    /// Mutate the state in place, then auto-save
    pub async fn update<R>(&self, f: impl FnOnce(&mut State) -> R) -> Result<R> {
        let result = {
            let mut state = self.state.write().await;
            f(&mut state)
        };
        if self.auto_save() {
            self.save().await?;
        }
        Ok(result)
    }

    /// Compact JSON rendering of the state
    pub async fn to_json(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string(&*state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Stored state of a stream
    pub async fn get_stream_state(&self, stream: &str) -> Option<JsonValue> {
        self.state.read().await.get_stream(stream).cloned()
    }

    /// Replace the stored state of a stream
    pub async fn set_stream_state(&self, stream: &str, value: JsonValue) -> Result<()> {
        let changed = self.state.write().await.set_stream(stream, value);
        if changed && self.auto_save() {
            self.save().await?;
        }
        Ok(())
    }

    /// Record the state carried by a message; returns whether it was a state message
    pub async fn apply_message(&self, message: &Message) -> Result<bool> {
        let Message::State { stream, data } = message else {
            return Ok(false);
        };
        self.set_stream_state(stream, data.clone()).await?;
        Ok(true)
    }

    /// Forget every stream's state
    pub async fn clear(&self) -> Result<()> {
        self.update(|state| *state = State::new()).await
    }

    /// Forget one stream's state
    pub async fn clear_stream(&self, stream: &str) -> Result<()> {
        self.update(|state| {
            state.remove_stream(stream);
        })
        .await
    }
}

fn parse_state(contents: &str) -> Result<State> {
    serde_json::from_str(contents).map_err(|e| Error::state(format!("Failed to parse state: {e}")))
}

/// Write to a sibling temp file, then rename over the target
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, contents)
        .await
        .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))
}
