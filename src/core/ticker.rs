//! Cancellable fixed-interval background task.
//!
//! Each service owns its own [`Ticker`], so a slow tick only delays that
//! service's next tick. The first tick runs immediately.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct Ticker {
    name: String,
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a dedicated thread that calls `tick` every `period`.
    pub fn spawn<F>(name: &str, period: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || loop {
            tick();
            match cancelled.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => continue,
                // Explicit cancel or the owner dropped the sender.
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        })?;

        tracing::debug!("Ticker '{name}' started ({period:?})");
        Ok(Self {
            name: name.to_string(),
            cancel: Some(cancel),
            handle: Some(handle),
        })
    }

    /// Stop scheduling ticks and wait for an in-flight tick to finish.
    ///
    /// Waiting is skipped when called from the ticker's own thread.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
            tracing::debug!("Ticker '{}' stopped", self.name);
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
