//! Centralized runtime constants, filesystem layout, and user settings.
//!
//! All tunable intervals, thresholds, and counts are collected here so they can
//! be found and adjusted in a single place rather than scattered across modules.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::store;

/// Interval at which the usage sampler polls the network-accounting command (seconds).
pub const SAMPLE_INTERVAL_SECS: u64 = 2;

/// Interval at which the watchdog evaluates rules while gaming mode is on (seconds).
pub const ENFORCE_INTERVAL_SECS: u64 = 1;

/// Samples whose combined rate is at or below this are dropped (bytes/sec).
pub const NOISE_FLOOR_BPS: f64 = 64.0;

/// Lower bound for the elapsed time used in rate derivation (seconds).
pub const MIN_SAMPLE_ELAPSED_SECS: f64 = 1.0;

/// Minimum interval between repeated signals for the same process/action pair (seconds).
pub const COOLDOWN_SECS: u64 = 3;

/// Every Nth sampler tick logs a summary of the top consumers.
pub const TELEMETRY_EVERY_TICKS: u64 = 5;

/// Number of consumers included in the periodic telemetry line.
pub const TELEMETRY_TOP_COUNT: usize = 3;

/// Maximum number of action log entries kept for display.
pub const ACTION_LOG_CAPACITY: usize = 100;

/// Number of top consumers that receive a recommendation.
pub const RECOMMENDATION_COUNT: usize = 8;

/// Above this combined rate a consumer is flagged as worth a rule (bytes/sec).
pub const HIGH_TRAFFIC_BPS: f64 = 300_000.0;

/// OS configuration keys overwritten while gaming mode is on.
pub const THROTTLED_SETTINGS: &[(&str, &str)] = &[
    ("com.apple.commerce", "AutoUpdate"),
    ("com.apple.commerce", "AutoUpdateRestartRequired"),
    ("com.apple.SoftwareUpdate", "AutomaticCheckEnabled"),
    ("com.apple.SoftwareUpdate", "AutomaticDownload"),
    ("com.apple.SoftwareUpdate", "ConfigDataInstall"),
    ("com.apple.SoftwareUpdate", "CriticalUpdateInstall"),
];

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Environment variable that relocates every directory under a single root.
pub const HOME_ENV: &str = "NETWARDEN_HOME";

/// Directories the application reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Crash-recovery journal and throttle backup.
    pub state_dir: PathBuf,
    /// Rules and user settings.
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    /// Resolve directories from an explicit root, `NETWARDEN_HOME`, or the
    /// platform defaults, in that order.
    pub fn resolve(root_override: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(root) = root_override {
            return Ok(Self::under_root(root));
        }
        if let Some(root) = std::env::var_os(HOME_ENV) {
            return Ok(Self::under_root(Path::new(&root)));
        }

        let home = dirs::home_dir().context("could not determine the home directory")?;
        let data = dirs::data_dir()
            .unwrap_or_else(|| home.join(".local").join("share"))
            .join("NetWarden");
        Ok(Self {
            state_dir: home.join(".local").join("state").join("netwarden"),
            log_dir: data.join("logs"),
            data_dir: data,
        })
    }

    /// Place every directory below `root`.
    pub fn under_root(root: &Path) -> Self {
        Self {
            state_dir: root.join("state"),
            data_dir: root.join("data"),
            log_dir: root.join("logs"),
        }
    }

    /// Create all directories if they do not exist yet.
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [&self.state_dir, &self.data_dir, &self.log_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn rules_file(&self) -> PathBuf {
        self.data_dir.join("rules.json")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn journal_file(&self) -> PathBuf {
        self.state_dir.join("enforcement-state.json")
    }

    pub fn throttle_backup_file(&self) -> PathBuf {
        self.state_dir.join("defaults-backup.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("netwarden.log")
    }
}

/// User preferences persisted across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Turn gaming mode on and off automatically when a game shows up in the
    /// network snapshot.
    #[serde(default)]
    pub auto_gaming_mode: bool,
}

impl Settings {
    /// Load settings, falling back to defaults when the file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        store::read_json(path).unwrap_or_default()
    }

    pub fn save(&self, path: &Path) {
        if let Err(e) = store::write_json_atomic(path, self) {
            tracing::warn!(target: "config", "Failed to save settings to {}: {e}", path.display());
        }
    }
}
