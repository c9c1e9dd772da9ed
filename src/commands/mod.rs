//! Presentation-facing command handlers, organized by functional domain.
//!
//! - `traffic`: snapshots, recommendations, auto gaming mode, action log
//! - `rules`: rule list editing
//! - `system`: gaming mode, auto gaming mode, crash recovery, status
//! - `logic`: Pure business logic functions (unit-testable)
//! - `state`: Shared `AppState` definition

pub mod logic;
pub mod rules;
mod state;
pub mod system;
pub mod traffic;

pub use logic::{ActionLog, Recommendation, RecommendationReason};
pub use state::{AppEvent, AppState, ViewState};

#[cfg(test)]
pub(crate) use state::fixtures;
