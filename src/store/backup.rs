//! Snapshot of OS configuration values captured before update suppression.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// On-disk marker for a key that did not exist before suppression.
pub const MISSING_SENTINEL: &str = "__MISSING__";

/// The value a setting held before it was overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PriorValue {
    /// The key was absent; restoring means deleting it.
    Missing,
    Value(String),
}

impl PriorValue {
    /// Interpret a raw configuration read. Empty output means the key is absent.
    pub fn from_read(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            PriorValue::Missing
        } else {
            PriorValue::Value(trimmed.to_string())
        }
    }
}

impl From<String> for PriorValue {
    fn from(raw: String) -> Self {
        if raw == MISSING_SENTINEL {
            PriorValue::Missing
        } else {
            PriorValue::Value(raw)
        }
    }
}

impl From<PriorValue> for String {
    fn from(value: PriorValue) -> Self {
        match value {
            PriorValue::Missing => MISSING_SENTINEL.to_string(),
            PriorValue::Value(v) => v,
        }
    }
}

/// Identity of one throttled setting, persisted as `domain::key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingKey {
    pub domain: String,
    pub key: String,
}

impl SettingKey {
    pub fn new(domain: &str, key: &str) -> Self {
        Self {
            domain: domain.to_string(),
            key: key.to_string(),
        }
    }

    /// Split a composite key. Anything other than exactly two parts is rejected.
    pub fn parse(composite: &str) -> Option<Self> {
        let mut parts = composite.split("::");
        match (parts.next(), parts.next(), parts.next()) {
            (Some(domain), Some(key), None) if !domain.is_empty() && !key.is_empty() => {
                Some(Self::new(domain, key))
            }
            _ => None,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.domain, self.key)
    }
}

/// Composite key to prior value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThrottleBackup {
    pub entries: BTreeMap<String, PriorValue>,
}

impl ThrottleBackup {
    pub fn insert(&mut self, key: &SettingKey, value: PriorValue) {
        self.entries.insert(key.to_string(), value);
    }
}

/// File-backed storage for [`ThrottleBackup`].
#[derive(Debug, Clone)]
pub struct BackupStore {
    path: PathBuf,
}

impl BackupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<ThrottleBackup> {
        super::read_json(&self.path)
    }

    pub fn save(&self, backup: &ThrottleBackup) -> Result<(), AppError> {
        super::write_json_atomic(&self.path, backup)
    }

    pub fn clear(&self) -> Result<(), AppError> {
        super::remove(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_round_trip_keeps_missing_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("defaults-backup.json"));
        let mut backup = ThrottleBackup::default();
        backup.insert(
            &SettingKey::new("com.apple.commerce", "AutoUpdate"),
            PriorValue::Value("1".into()),
        );
        backup.insert(
            &SettingKey::new("com.apple.SoftwareUpdate", "AutomaticDownload"),
            PriorValue::Missing,
        );

        store.save(&backup).unwrap();
        assert_eq!(store.load(), Some(backup));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"com.apple.SoftwareUpdate::AutomaticDownload\": \"__MISSING__\""));
    }

    #[test]
    fn test_prior_value_from_read() {
        assert_eq!(PriorValue::from_read("  \n"), PriorValue::Missing);
        assert_eq!(PriorValue::from_read("1\n"), PriorValue::Value("1".into()));
    }

    #[test]
    fn test_setting_key_parse() {
        assert_eq!(
            SettingKey::parse("com.apple.commerce::AutoUpdate"),
            Some(SettingKey::new("com.apple.commerce", "AutoUpdate"))
        );
        assert_eq!(SettingKey::parse("no-separator"), None);
        assert_eq!(SettingKey::parse("a::b::c"), None);
        assert_eq!(SettingKey::parse("::key"), None);
    }
}
