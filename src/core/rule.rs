//! Enforcement rules as stored and evaluated by the watchdog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the watchdog does to a matching process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Suspend with SIGSTOP; resumed when gaming mode ends.
    Pause,
    /// Send SIGTERM.
    Terminate,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Pause => "pause",
            RuleAction::Terminate => "terminate",
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque rule identifier, unique within a rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub u64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user or default rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    /// Exact process name to signal; duplicates are detected case-insensitively.
    pub process_name: String,
    pub action: RuleAction,
    pub enabled: bool,
    /// Seeded rules can be toggled but never removed.
    #[serde(default)]
    pub is_default: bool,
}

impl Rule {
    pub fn new(id: RuleId, process_name: impl Into<String>, action: RuleAction) -> Self {
        Self {
            id,
            process_name: process_name.into(),
            action,
            enabled: true,
            is_default: false,
        }
    }

    /// Case-insensitive name comparison used for duplicate detection.
    pub fn targets(&self, process_name: &str) -> bool {
        self.process_name.eq_ignore_ascii_case(process_name)
    }
}

/// Next free identifier after the highest one in `rules`.
pub fn next_rule_id(rules: &[Rule]) -> RuleId {
    RuleId(rules.iter().map(|r| r.id.0).max().unwrap_or(0) + 1)
}
