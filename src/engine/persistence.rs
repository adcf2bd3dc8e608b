// ── Limbic: Persistence ────────────────────────────────────────────────────
// `StateStore` is the seam between the mood engine and its durable backing.
// The shipped implementation is a JSON file; an embedded DB or cloud blob
// backend can be substituted without touching the model or retraining logic.
//
// Writes are temp-then-rename so a crash mid-write never corrupts the
// durable store — the retrain rollback protocol depends on this.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::atoms::error::{CoreError, CoreResult};
use crate::atoms::types::MoodState;

// ═════════════════════════════════════════════════════════════════════════════
// StateStore trait
// ═════════════════════════════════════════════════════════════════════════════

/// Durable backing for the mood store.
///
/// `load` returns an error on any failure — the caller decides whether to
/// fall back to a default state. `save` must be atomic: after a crash the
/// store contains either the old or the new state, never a mix.
pub trait StateStore: Send + Sync {
    fn load(&self) -> CoreResult<MoodState>;
    fn save(&self, state: &MoodState) -> CoreResult<()>;
    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

// ═════════════════════════════════════════════════════════════════════════════
// JSON file backend
// ═════════════════════════════════════════════════════════════════════════════

/// JSON-file `StateStore`. One file, pretty-printed, atomically replaced.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> CoreResult<MoodState> {
        if !self.path.exists() {
            return Err(CoreError::Persistence(format!(
                "state file not found: {}",
                self.path.display()
            )));
        }
        read_json(&self.path)
    }

    fn save(&self, state: &MoodState) -> CoreResult<()> {
        write_json_atomic(&self.path, state)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Shared JSON helpers
// ═════════════════════════════════════════════════════════════════════════════
// Also used by the retraining controller for model artifacts and snapshot
// backups, so every durable JSON write in the crate goes through one path.

pub fn read_json<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write `value` as pretty JSON via a sibling temp file + rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let parent = path.parent().ok_or_else(|| {
        CoreError::Persistence(format!("path has no parent: {}", path.display()))
    })?;
    fs::create_dir_all(parent)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════════
// Tests
// ═════════════════════════════════════════════════════════════════════════════
