//! Shared fakes for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::core::clock::Clock;
use crate::core::command::{render_command, CommandRunner};
use crate::error::AppError;

/// Records every command line and answers from a script.
///
/// Unscripted commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, Result<String, i32>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, command_line: &str, stdout: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command_line.to_string(), Ok(stdout.to_string()));
    }

    pub fn fail(&self, command_line: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command_line.to_string(), Err(1));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command_line: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == command_line)
            .count()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, AppError> {
        let line = render_command(program, args);
        self.calls.lock().unwrap().push(line.clone());
        match self.responses.lock().unwrap().get(&line) {
            Some(Ok(out)) => Ok(out.clone()),
            Some(Err(status)) => Err(AppError::CommandFailed {
                command: line,
                status: *status,
                stderr: "scripted failure".into(),
            }),
            None => Ok(String::new()),
        }
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
