//! Crash-recovery journal for the enforcement watchdog.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Persisted watchdog state.
///
/// While a process is suspended by the watchdog its name is in
/// `paused_process_names` on disk. The file exists only while the watchdog is
/// away from its clean baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementState {
    pub enabled: bool,
    #[serde(default)]
    pub paused_process_names: BTreeSet<String>,
}

impl EnforcementState {
    /// True when the record describes nothing that needs undoing.
    pub fn is_clean(&self) -> bool {
        !self.enabled && self.paused_process_names.is_empty()
    }
}

/// File-backed storage for [`EnforcementState`].
#[derive(Debug, Clone)]
pub struct JournalStore {
    path: PathBuf,
}

impl JournalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<EnforcementState> {
        super::read_json(&self.path)
    }

    pub fn save(&self, state: &EnforcementState) -> Result<(), AppError> {
        super::write_json_atomic(&self.path, state)
    }

    pub fn clear(&self) -> Result<(), AppError> {
        super::remove(&self.path)
    }
}
