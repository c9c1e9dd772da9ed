//! Pure business logic extracted from the command handlers.
//!
//! These functions take plain parameters (no shared state) and can be
//! unit-tested without starting any background service.

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::{ACTION_LOG_CAPACITY, HIGH_TRAFFIC_BPS, RECOMMENDATION_COUNT};
use crate::core::catalog;
use crate::core::rule::{Rule, RuleAction};
use crate::core::traffic::UsageSample;
use crate::core::watchdog::ActionLogEntry;
use crate::error::AppError;

/// Validate a rule name typed by the user and return it trimmed.
pub fn validate_new_rule(rules: &[Rule], name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Process name is empty".into()));
    }
    if catalog::is_protected(name) {
        return Err(AppError::InvalidInput(format!(
            "{name} is a protected game or anti-cheat process"
        )));
    }
    if rules.iter().any(|r| r.targets(name)) {
        return Err(AppError::InvalidInput(format!("A rule for {name} already exists")));
    }
    Ok(name.to_string())
}

/// Seeded rules can only be disabled, never removed.
pub fn validate_removal(rule: &Rule) -> Result<(), AppError> {
    if rule.is_default {
        return Err(AppError::InvalidInput(format!(
            "{} is a default rule and can only be disabled",
            rule.process_name
        )));
    }
    Ok(())
}

pub fn validate_action_change(rule: &Rule, action: RuleAction) -> Result<(), AppError> {
    if action == RuleAction::Terminate && catalog::is_protected(&rule.process_name) {
        return Err(AppError::InvalidInput(format!(
            "{} is protected and cannot be terminated",
            rule.process_name
        )));
    }
    Ok(())
}

/// Why a process shows up in the recommendation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationReason {
    Protected,
    AlreadyControlled,
    HighTraffic,
    Moderate,
}

impl RecommendationReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Protected => "Protected game or security process; never stop it automatically.",
            Self::AlreadyControlled => "Already controlled by your rules.",
            Self::HighTraffic => "High network traffic right now; consider adding a rule.",
            Self::Moderate => "Moderate activity; keep an eye on it during a match.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub process_name: String,
    pub pid: u32,
    pub total_per_sec: f64,
    pub reason: RecommendationReason,
    pub message: &'static str,
}

/// Classify the top consumers of an already sorted snapshot.
pub fn build_recommendations(samples: &[UsageSample], rules: &[Rule]) -> Vec<Recommendation> {
    samples
        .iter()
        .take(RECOMMENDATION_COUNT)
        .map(|sample| {
            let name = sample.process_name.as_str();
            let reason = if catalog::is_protected(name) {
                RecommendationReason::Protected
            } else if rules.iter().any(|r| r.targets(name)) {
                RecommendationReason::AlreadyControlled
            } else if sample.total_per_sec() > HIGH_TRAFFIC_BPS {
                RecommendationReason::HighTraffic
            } else {
                RecommendationReason::Moderate
            };
            Recommendation {
                process_name: name.to_string(),
                pid: sample.pid,
                total_per_sec: sample.total_per_sec(),
                reason,
                message: reason.message(),
            }
        })
        .collect()
}

/// What automatic gaming mode wants done after a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoModeDecision {
    Enable,
    Disable,
    Keep,
}

/// Auto mode turns gaming mode on when a game appears and off again only if
/// it was the one that turned it on.
pub fn decide_auto_mode(
    auto_enabled: bool,
    gaming_mode: bool,
    auto_managed: bool,
    samples: &[UsageSample],
) -> AutoModeDecision {
    if !auto_enabled {
        return AutoModeDecision::Keep;
    }
    let game_running = samples
        .iter()
        .any(|s| catalog::is_game_process(&s.process_name));

    if game_running && !gaming_mode {
        AutoModeDecision::Enable
    } else if !game_running && auto_managed {
        AutoModeDecision::Disable
    } else {
        AutoModeDecision::Keep
    }
}

/// Most-recent-first list of applied actions, bounded in size.
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    capacity: usize,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::with_capacity(ACTION_LOG_CAPACITY)
    }
}

impl ActionLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: ActionLogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> Vec<ActionLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rule::RuleId;
    use chrono::Utc;

    fn sample(pid: u32, name: &str, total: f64) -> UsageSample {
        UsageSample {
            pid,
            process_name: name.to_string(),
            bytes_in_per_sec: total,
            bytes_out_per_sec: 0.0,
            observed_at: Utc::now(),
        }
    }

    fn entry(name: &str) -> ActionLogEntry {
        ActionLogEntry {
            timestamp: Utc::now(),
            process_name: name.to_string(),
            action: RuleAction::Pause,
            result: "applied".into(),
        }
    }

    #[test]
    fn test_validate_new_rule_trims() {
        assert_eq!(validate_new_rule(&[], "  Dropbox \n").unwrap(), "Dropbox");
    }

    #[test]
    fn test_validate_new_rule_rejects_empty() {
        assert_eq!(validate_new_rule(&[], "   ").unwrap_err().kind(), "InvalidInput");
    }

    #[test]
    fn test_validate_new_rule_rejects_protected() {
        let err = validate_new_rule(&[], "RiotClientServices").unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
        assert!(validate_new_rule(&[], "my-valorant-overlay").is_err());
    }

    #[test]
    fn test_validate_new_rule_rejects_case_insensitive_duplicate() {
        let rules = vec![Rule::new(RuleId(1), "Dropbox", RuleAction::Pause)];
        assert!(validate_new_rule(&rules, "dropbox").is_err());
        assert!(validate_new_rule(&rules, "Dropbox Helper").is_ok());
    }

    #[test]
    fn test_default_rule_cannot_be_removed() {
        let defaults = catalog::default_rules();
        assert!(validate_removal(&defaults[0]).is_err());
        assert!(validate_removal(&Rule::new(RuleId(9), "zoom.us", RuleAction::Pause)).is_ok());
    }

    #[test]
    fn test_terminate_rejected_for_protected_name() {
        let rule = Rule::new(RuleId(1), "vgc", RuleAction::Pause);
        assert!(validate_action_change(&rule, RuleAction::Terminate).is_err());
        assert!(validate_action_change(&rule, RuleAction::Pause).is_ok());

        let plain = Rule::new(RuleId(2), "Dropbox", RuleAction::Pause);
        assert!(validate_action_change(&plain, RuleAction::Terminate).is_ok());
    }

    #[test]
    fn test_recommendations_classify_in_priority_order() {
        let rules = vec![Rule::new(RuleId(1), "Dropbox", RuleAction::Pause)];
        let samples = vec![
            sample(1, "LeagueClient", 900_000.0),
            sample(2, "dropbox", 800_000.0),
            sample(3, "Steam", 300_001.0),
            sample(4, "Music", 300_000.0),
        ];

        let reasons: Vec<_> = build_recommendations(&samples, &rules)
            .into_iter()
            .map(|r| r.reason)
            .collect();
        assert_eq!(
            reasons,
            vec![
                RecommendationReason::Protected,
                RecommendationReason::AlreadyControlled,
                RecommendationReason::HighTraffic,
                RecommendationReason::Moderate,
            ]
        );
    }

    #[test]
    fn test_recommendations_cover_top_eight_only() {
        let samples: Vec<_> = (0..12)
            .map(|i| sample(i, &format!("proc{i}"), 1000.0 - i as f64))
            .collect();
        let recs = build_recommendations(&samples, &[]);
        assert_eq!(recs.len(), RECOMMENDATION_COUNT);
        assert_eq!(recs[0].process_name, "proc0");
        assert_eq!(recs[7].process_name, "proc7");
    }

    #[test]
    fn test_auto_mode_enables_when_game_appears() {
        let snapshot = vec![sample(1, "League of Legends", 100.0)];
        assert_eq!(
            decide_auto_mode(true, false, false, &snapshot),
            AutoModeDecision::Enable
        );
        assert_eq!(
            decide_auto_mode(false, false, false, &snapshot),
            AutoModeDecision::Keep
        );
    }

    #[test]
    fn test_auto_mode_disables_only_what_it_enabled() {
        let snapshot = vec![sample(1, "Safari", 100.0)];
        assert_eq!(
            decide_auto_mode(true, true, true, &snapshot),
            AutoModeDecision::Disable
        );
        // Turned on by the user: left alone.
        assert_eq!(
            decide_auto_mode(true, true, false, &snapshot),
            AutoModeDecision::Keep
        );
    }

    #[test]
    fn test_auto_mode_keeps_running_game_on() {
        let snapshot = vec![sample(1, "VALORANT-Win64-Shipping", 100.0)];
        assert_eq!(
            decide_auto_mode(true, true, true, &snapshot),
            AutoModeDecision::Keep
        );
    }

    #[test]
    fn test_action_log_is_most_recent_first_and_bounded() {
        let mut log = ActionLog::with_capacity(3);
        for name in ["a", "b", "c", "d"] {
            log.push(entry(name));
        }
        let names: Vec<_> = log.entries().into_iter().map(|e| e.process_name).collect();
        assert_eq!(names, vec!["d", "c", "b"]);
    }

    #[test]
    fn test_action_log_default_capacity() {
        let mut log = ActionLog::default();
        assert!(log.is_empty());
        for i in 0..(ACTION_LOG_CAPACITY + 5) {
            log.push(entry(&format!("p{i}")));
        }
        assert_eq!(log.len(), ACTION_LOG_CAPACITY);
    }
}
