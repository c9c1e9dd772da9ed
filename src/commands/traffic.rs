//! Snapshot handling: published usages, recommendations, auto gaming mode,
//! and the action log.

use crate::core::traffic::UsageSample;
use crate::core::watchdog::ActionLogEntry;

use super::logic::{build_recommendations, AutoModeDecision, Recommendation};
use super::state::{AppEvent, AppState};
use super::system::apply_auto_mode;

/// Consume one sampler snapshot.
pub fn apply_snapshot(state: &AppState, samples: Vec<UsageSample>) {
    let rules = state.rules.lock().unwrap().clone();
    let recommendations = build_recommendations(&samples, &rules);

    {
        let mut view = state.view.lock().unwrap();
        view.usages = samples.clone();
        view.recommendations = recommendations.clone();
    }

    state.emit(AppEvent::Snapshot(samples.clone()));
    state.emit(AppEvent::Recommendations(recommendations));

    match apply_auto_mode(state, &samples) {
        AutoModeDecision::Enable => {
            tracing::info!(target: "app", "Auto mode: game detected, gaming mode enabled");
            state.notify("Game detected: gaming mode enabled automatically.");
        }
        AutoModeDecision::Disable => {
            tracing::info!(target: "app", "Auto mode: game closed, gaming mode disabled");
            state.notify("Game closed: gaming mode disabled automatically.");
        }
        AutoModeDecision::Keep => {}
    }
}

/// Consume one watchdog action.
pub fn record_action(state: &AppState, entry: ActionLogEntry) {
    state.view.lock().unwrap().action_log.push(entry.clone());
    state.emit(AppEvent::Action(entry));
}

pub fn get_usages(state: &AppState) -> Vec<UsageSample> {
    state.view.lock().unwrap().usages.clone()
}

pub fn get_recommendations(state: &AppState) -> Vec<Recommendation> {
    state.view.lock().unwrap().recommendations.clone()
}

pub fn get_action_log(state: &AppState) -> Vec<ActionLogEntry> {
    state.view.lock().unwrap().action_log.entries()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::logic::RecommendationReason;
    use crate::commands::state::fixtures::Harness;
    use crate::commands::system::{set_auto_gaming_mode, set_gaming_mode, status};
    use crate::core::rule::RuleAction;
    use chrono::Utc;

    fn sample(pid: u32, name: &str, total: f64) -> UsageSample {
        UsageSample {
            pid,
            process_name: name.to_string(),
            bytes_in_per_sec: total / 2.0,
            bytes_out_per_sec: total / 2.0,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_publishes_usages_and_recommendations() {
        let mut h = Harness::new();
        apply_snapshot(
            &h.state,
            vec![sample(1, "Steam", 500_000.0), sample(2, "cloudd", 1000.0)],
        );

        assert_eq!(get_usages(&h.state).len(), 2);
        let recs = get_recommendations(&h.state);
        assert_eq!(recs[0].reason, RecommendationReason::HighTraffic);
        assert_eq!(recs[1].reason, RecommendationReason::AlreadyControlled);

        let events = h.drain();
        assert!(matches!(events[0], AppEvent::Snapshot(ref s) if s.len() == 2));
        assert!(matches!(events[1], AppEvent::Recommendations(ref r) if r.len() == 2));
    }

    #[test]
    fn test_auto_mode_follows_the_game() {
        let h = Harness::new();
        set_auto_gaming_mode(&h.state, true);

        apply_snapshot(&h.state, vec![sample(1, "League of Legends", 2000.0)]);
        let report = status(&h.state);
        assert!(report.gaming_mode);
        assert!(report.auto_managed);
        assert!(h.state.watchdog.is_enabled());

        // Still running: nothing changes.
        apply_snapshot(&h.state, vec![sample(1, "League of Legends", 2000.0)]);
        assert!(h.state.watchdog.is_enabled());

        apply_snapshot(&h.state, vec![sample(3, "Safari", 2000.0)]);
        let report = status(&h.state);
        assert!(!report.gaming_mode);
        assert!(!report.auto_managed);
        assert!(!h.state.watchdog.is_enabled());
    }

    #[test]
    fn test_auto_mode_off_ignores_games() {
        let h = Harness::new();
        apply_snapshot(&h.state, vec![sample(1, "VALORANT", 2000.0)]);
        assert!(!h.state.watchdog.is_enabled());
    }

    #[test]
    fn test_auto_mode_leaves_user_gaming_mode_alone() {
        let h = Harness::new();
        set_auto_gaming_mode(&h.state, true);
        set_gaming_mode(&h.state, true);

        apply_snapshot(&h.state, vec![sample(1, "Safari", 2000.0)]);
        assert!(status(&h.state).gaming_mode);
        assert!(h.state.watchdog.is_enabled());
    }

    #[test]
    fn test_record_action_prepends_and_publishes() {
        let mut h = Harness::new();
        for name in ["first", "second"] {
            record_action(
                &h.state,
                ActionLogEntry {
                    timestamp: Utc::now(),
                    process_name: name.to_string(),
                    action: RuleAction::Terminate,
                    result: "applied".into(),
                },
            );
        }

        let log = get_action_log(&h.state);
        assert_eq!(log[0].process_name, "second");
        assert_eq!(log[1].process_name, "first");
        assert_eq!(h.drain().len(), 2);
    }
}
