//! Process-wide `tracing` setup: stderr plus an append-only log file.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppPaths, DEFAULT_LOG_FILTER};

pub struct Logging;

impl Logging {
    /// Install the global subscriber and return the log file path.
    ///
    /// `RUST_LOG` overrides the default filter. The file is opened in append
    /// mode and written without buffering.
    pub fn init(paths: &AppPaths) -> anyhow::Result<PathBuf> {
        let path = paths.log_file();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init()
            .context("failed to install the tracing subscriber")?;

        Ok(path)
    }
}
