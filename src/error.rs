//! Unified error type for the watchdog core and its presentation-facing commands.
//!
//! `AppError` is returned by every strict path (command runner, persistence,
//! rule editing). It serializes as `{ "kind": "...", "message": "..." }` so a
//! presentation layer can distinguish error categories programmatically.

use serde::ser::SerializeStruct;

/// Application-level error.
///
/// The periodic services never surface these to the presentation layer; they
/// log and degrade instead. Only rule editing and host startup return them.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The OS could not start the subprocess at all.
    #[error("failed to launch `{0}`")]
    CommandLaunch(String),

    /// The subprocess ran but exited with a non-zero status.
    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// Encoding or decoding of a persisted record failed.
    #[error("{0}")]
    Persistence(String),

    /// Filesystem errors.
    #[error("{0}")]
    Io(String),

    /// Invalid or rejected user input (rule edits).
    #[error("{0}")]
    InvalidInput(String),
}

impl AppError {
    /// Returns the error kind as a string matching the variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::CommandLaunch(_) => "CommandLaunch",
            AppError::CommandFailed { .. } => "CommandFailed",
            AppError::Persistence(_) => "Persistence",
            AppError::Io(_) => "Io",
            AppError::InvalidInput(_) => "InvalidInput",
        }
    }
}

/// Custom Serialize: produces `{ "kind": "Variant", "message": "..." }`.
impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}
