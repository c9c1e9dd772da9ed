//! Plain-JSON persistence for rules, the enforcement journal, and the throttle backup.
//!
//! Every record is written with write-then-rename so a reader never observes a
//! half-written file. Reads treat missing or undecodable files as absent.

pub mod backup;
pub mod journal;
pub mod rules;

pub use backup::{BackupStore, PriorValue, ThrottleBackup};
pub use journal::{EnforcementState, JournalStore};
pub use rules::RuleStore;

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;

/// Read and decode a JSON record. Missing files and decode failures both yield `None`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(target: "store", "Failed to read {}: {e}", path.display());
            return None;
        }
    };

    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(target: "store", "Ignoring undecodable {}: {e}", path.display());
            None
        }
    }
}

/// Serialize `value` and atomically replace `path` with it.
///
/// The temp file lives next to the target so the final rename stays on one
/// filesystem.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    let parent = path
        .parent()
        .ok_or_else(|| AppError::Io(format!("invalid path: {}", path.display())))?;
    fs::create_dir_all(parent)?;

    let json = serde_json::to_vec_pretty(value)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{file_name}.{}.tmp", std::process::id()));

    let write_res: Result<(), AppError> = (|| {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)?;
        f.write_all(&json)?;
        f.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if write_res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    write_res
}

/// Delete a record. A file that is already gone counts as success.
pub fn remove(path: &Path) -> Result<(), AppError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
