pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod services;
pub mod store;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;

use crate::commands::AppState;
use crate::config::AppPaths;
use crate::core::clock::SystemClock;
use crate::core::command::SystemRunner;
use crate::logging::Logging;
use crate::services::BackgroundServices;

/// Host options, usually parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Root directory overriding the platform defaults.
    pub home: Option<PathBuf>,
    /// Enter gaming mode right after startup.
    pub gaming: bool,
    /// Persist a new auto gaming mode setting before serving.
    pub auto_gaming: Option<bool>,
}

/// Run the headless host until Ctrl-C.
pub fn run(options: RunOptions) -> anyhow::Result<()> {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC in NetWarden: {info}");
        default_hook(info);
    }));

    let paths = AppPaths::resolve(options.home.as_deref())?;
    paths
        .ensure()
        .context("failed to create application directories")?;
    let log_file = Logging::init(&paths)?;
    tracing::info!(target: "app", "NetWarden starting, log file {}", log_file.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build the tokio runtime")?;
    runtime.block_on(serve(paths, options))
}

async fn serve(paths: AppPaths, options: RunOptions) -> anyhow::Result<()> {
    let (events, receiver) = mpsc::unbounded_channel();
    let state = Arc::new(AppState::new(
        paths,
        Arc::new(SystemRunner),
        Arc::new(SystemClock),
        events,
    ));
    let pump = tokio::spawn(services::log_events(receiver));

    // Everything below shells out and may block; keep it off the async workers.
    blocking(&state, move |state| {
        BackgroundServices::start(state);
        if let Some(auto) = options.auto_gaming {
            commands::system::set_auto_gaming_mode(state, auto);
        }
        if options.gaming {
            commands::system::set_gaming_mode(state, true);
        }
    })
    .await?;

    tracing::info!(target: "app", "Running, press Ctrl-C to stop");
    let signal = tokio::signal::ctrl_c().await;
    if let Err(e) = &signal {
        tracing::error!(target: "app", "Failed to listen for Ctrl-C: {e}");
    }

    blocking(&state, |state| BackgroundServices::stop(state)).await?;
    tracing::info!(target: "app", "NetWarden stopped");

    // The sender lives in the state; dropping it closes the event pump.
    drop(state);
    let _ = pump.await;
    signal.context("failed to wait for Ctrl-C")
}

async fn blocking<F>(state: &Arc<AppState>, work: F) -> anyhow::Result<()>
where
    F: FnOnce(&Arc<AppState>) + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .context("background task panicked")
}
