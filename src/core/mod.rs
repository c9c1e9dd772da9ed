//! Core logic: usage sampling, rule enforcement, and OS update suppression.
//!
//! - [`UsageSampler`] — per-process byte counters with rate derivation
//! - [`EnforcementWatchdog`] — applies rules while gaming mode is on, with crash recovery
//! - [`SettingsThrottle`] — backs up and overrides automatic-update settings
//! - [`ProcessControl`] / [`CommandRunner`] — subprocess seam for `pgrep`, `pkill`, `defaults`, `nettop`
//! - [`catalog`] — protected names, game detection, default rules

pub mod catalog;
pub mod clock;
pub mod command;
pub mod process_control;
pub mod rule;
pub mod throttle;
pub mod ticker;
pub mod traffic;
pub mod watchdog;

pub use clock::{Clock, SystemClock};
pub use command::{CommandRunner, SystemRunner};
pub use process_control::{ProcessControl, Signal};
pub use rule::{Rule, RuleAction, RuleId};
pub use throttle::SettingsThrottle;
pub use traffic::{UsageSample, UsageSampler};
pub use watchdog::{ActionLogEntry, EnforcementWatchdog};
