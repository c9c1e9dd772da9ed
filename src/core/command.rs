//! Synchronous execution of external OS commands.
//!
//! Two invocation paths exist: [`CommandRunner::run`] reports launch failures
//! and non-zero exits as distinct [`AppError`] kinds, while
//! [`CommandRunner::run_ignoring_failure`] turns any failure into empty
//! output. The sampler and the watchdog only use the latter.

use std::process::Command;
use std::time::Instant;

use crate::error::AppError;

/// Executes a program with arguments and captures its standard output.
pub trait CommandRunner: Send + Sync {
    /// Run `program` and return stdout. Fails on launch errors and non-zero exit.
    fn run(&self, program: &str, args: &[&str]) -> Result<String, AppError>;

    /// Run `program`, returning empty output on any failure.
    fn run_ignoring_failure(&self, program: &str, args: &[&str]) -> String {
        self.run(program, args).unwrap_or_default()
    }
}

/// Runs commands through `std::process::Command`, without a shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, AppError> {
        let command_line = render_command(program, args);
        let started = Instant::now();
        tracing::debug!(target: "shell", "run: {command_line}");

        let output = Command::new(program).args(args).output().map_err(|e| {
            tracing::error!(target: "shell", "launch failed: {command_line}: {e}");
            AppError::CommandLaunch(command_line.clone())
        })?;

        let elapsed = started.elapsed().as_secs_f64();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let status = output.status.code().unwrap_or(-1);
            tracing::error!(
                target: "shell",
                "failed ({status}, {elapsed:.2}s): {command_line} :: {stderr}"
            );
            return Err(AppError::CommandFailed {
                command: command_line,
                status,
                stderr,
            });
        }

        tracing::debug!(target: "shell", "ok ({elapsed:.2}s): {command_line}");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Human-readable command line for logs and errors.
pub fn render_command(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push('\'');
            line.push_str(arg);
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}
