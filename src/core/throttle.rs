//! Suppression of automatic OS updates while gaming mode is on.
//!
//! `enable` snapshots every key in [`THROTTLED_SETTINGS`] to a durable backup
//! before overwriting it; `disable` restores from that backup and deletes it.

use std::sync::Arc;

use crate::config::THROTTLED_SETTINGS;
use crate::core::command::CommandRunner;
use crate::store::backup::{BackupStore, PriorValue, SettingKey, ThrottleBackup};

/// Typed value for a `defaults write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
}

impl SettingValue {
    /// Boolean-like strings restore as booleans, anything else as raw text.
    pub fn from_backup(raw: &str) -> Self {
        match raw {
            "1" | "true" => SettingValue::Bool(true),
            "0" | "false" => SettingValue::Bool(false),
            other => SettingValue::Text(other.to_string()),
        }
    }
}

/// Reads, writes, and deletes keys in the OS `defaults` store.
#[derive(Clone)]
pub struct DefaultsStore {
    runner: Arc<dyn CommandRunner>,
}

impl DefaultsStore {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn read(&self, key: &SettingKey) -> PriorValue {
        let raw = self.runner.run_ignoring_failure(
            "defaults",
            &["read", key.domain.as_str(), key.key.as_str()],
        );
        PriorValue::from_read(&raw)
    }

    pub fn write(&self, key: &SettingKey, value: &SettingValue) {
        match value {
            SettingValue::Bool(b) => {
                let b = if *b { "true" } else { "false" };
                self.runner.run_ignoring_failure(
                    "defaults",
                    &["write", key.domain.as_str(), key.key.as_str(), "-bool", b],
                );
            }
            SettingValue::Text(text) => {
                self.runner.run_ignoring_failure(
                    "defaults",
                    &["write", key.domain.as_str(), key.key.as_str(), text.as_str()],
                );
            }
        }
    }

    pub fn delete(&self, key: &SettingKey) {
        self.runner.run_ignoring_failure(
            "defaults",
            &["delete", key.domain.as_str(), key.key.as_str()],
        );
    }
}

/// Settings throttle manager. Holds no state beyond the backup file location.
pub struct SettingsThrottle {
    defaults: DefaultsStore,
    backup: BackupStore,
}

impl SettingsThrottle {
    pub fn new(runner: Arc<dyn CommandRunner>, backup: BackupStore) -> Self {
        Self {
            defaults: DefaultsStore::new(runner),
            backup,
        }
    }

    /// Back up the current values, then disable automatic update checks and downloads.
    ///
    /// An existing backup means a previous suppression was never restored; it
    /// is kept so the original values are not replaced by suppressed ones.
    pub fn enable(&self) {
        tracing::info!(target: "throttle", "Applying system update restrictions");

        if self.backup.load().is_some() {
            tracing::warn!(
                target: "throttle",
                "Unrestored backup found, keeping it: {}",
                self.backup.path().display()
            );
        } else {
            let mut backup = ThrottleBackup::default();
            for (domain, key) in THROTTLED_SETTINGS {
                let key = SettingKey::new(domain, key);
                let prior = self.defaults.read(&key);
                backup.insert(&key, prior);
            }
            match self.backup.save(&backup) {
                Ok(()) => tracing::info!(
                    target: "throttle",
                    "Saved settings backup: {}",
                    self.backup.path().display()
                ),
                Err(e) => tracing::error!(target: "throttle", "Failed to save settings backup: {e}"),
            }
        }

        for (domain, key) in THROTTLED_SETTINGS {
            self.defaults
                .write(&SettingKey::new(domain, key), &SettingValue::Bool(false));
        }
    }

    /// Restore every backed-up key and delete the backup.
    ///
    /// Idempotent: without a backup nothing is touched.
    pub fn disable(&self) {
        tracing::info!(target: "throttle", "Restoring system update settings");

        let Some(backup) = self.backup.load() else {
            tracing::warn!(
                target: "throttle",
                "No settings backup found: {}",
                self.backup.path().display()
            );
            return;
        };

        for (composite, prior) in &backup.entries {
            let Some(key) = SettingKey::parse(composite) else {
                tracing::warn!(target: "throttle", "Skipping malformed backup key: {composite}");
                continue;
            };
            match prior {
                PriorValue::Missing => self.defaults.delete(&key),
                PriorValue::Value(raw) => self.defaults.write(&key, &SettingValue::from_backup(raw)),
            }
        }

        match self.backup.clear() {
            Ok(()) => tracing::info!(
                target: "throttle",
                "Removed settings backup: {}",
                self.backup.path().display()
            ),
            Err(e) => tracing::error!(target: "throttle", "Failed to remove settings backup: {e}"),
        }
    }
}
