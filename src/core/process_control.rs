//! Process existence checks and signal delivery by exact process name.

use std::fmt;
use std::sync::Arc;

use crate::core::command::CommandRunner;

/// Signals the watchdog delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Stop,
    Continue,
    Terminate,
}

impl Signal {
    /// Flag understood by `pkill`.
    pub fn pkill_flag(&self) -> &'static str {
        match self {
            Signal::Stop => "-STOP",
            Signal::Continue => "-CONT",
            Signal::Terminate => "-TERM",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pkill_flag()[1..])
    }
}

/// `pgrep`/`pkill` wrapper. Every failure is swallowed.
#[derive(Clone)]
pub struct ProcessControl {
    runner: Arc<dyn CommandRunner>,
}

impl ProcessControl {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// True when at least one process is named exactly `name`.
    pub fn is_running(&self, name: &str) -> bool {
        !self
            .runner
            .run_ignoring_failure("pgrep", &["-x", name])
            .trim()
            .is_empty()
    }

    /// Deliver `signal` to every process named exactly `name`.
    /// Returns the trimmed command output, empty on failure.
    pub fn signal(&self, name: &str, signal: Signal) -> String {
        self.runner
            .run_ignoring_failure("pkill", &[signal.pkill_flag(), "-x", name])
            .trim()
            .to_string()
    }
}
