//! File-based execution state, the single source of truth for idempotency.
//! Stored as `state.json` next to the report data, human-readable.
//! Reads fail soft; writes go through a temp file and an atomic rename.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use devmemory_core::{DevMemoryError, ExecutionState, Result, write_atomic};

/// Reads and writes the persisted [`ExecutionState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default store path (~/.devmemory/data/state.json).
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".devmemory").join("data").join("state.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state. A missing or corrupt file yields the empty state so a
    /// fresh install always proceeds.
    pub fn read(&self) -> ExecutionState {
        match self.try_read() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("⚠️ {e}, treating as no prior execution");
                ExecutionState::default()
            }
        }
    }

    /// Strict variant of [`read`](Self::read): corruption surfaces as
    /// [`DevMemoryError::StateCorruption`].
    pub fn try_read(&self) -> Result<ExecutionState> {
        if !self.path.exists() {
            return Ok(ExecutionState::default());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            DevMemoryError::StateCorruption(format!("{}: {e}", self.path.display()))
        })?;
        if raw.trim().is_empty() {
            return Ok(ExecutionState::default());
        }
        serde_json::from_str(&raw)
            .map_err(|e| DevMemoryError::StateCorruption(format!("{}: {e}", self.path.display())))
    }

    /// Replace the state on disk (temp file → fsync → rename).
    pub fn write(&self, state: &ExecutionState) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(state)?;
        json.push(b'\n');
        write_atomic(&self.path, &json)?;
        tracing::debug!("💾 Saved execution state to {}", self.path.display());
        Ok(())
    }

    pub fn has_executed_for(&self, report_date: NaiveDate) -> bool {
        self.read().has_executed_for(report_date)
    }
}
