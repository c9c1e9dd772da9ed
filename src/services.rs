//! Background service lifecycle management.
//!
//! `BackgroundServices` wires the sampler and the watchdog into the shared
//! [`AppState`], starting them in the correct dependency order and providing
//! clean shutdown.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::commands::{self, AppEvent, AppState};

/// Starts and stops the periodic services.
///
/// Start order:
/// 1. Crash recovery (resume leftovers, restore update settings)
/// 2. Rule list (stored or seeded)
/// 3. Sampler and watchdog callbacks
/// 4. Usage sampler (2s ticks)
/// 5. Rule push to the watchdog
pub struct BackgroundServices;

impl BackgroundServices {
    pub fn start(state: &Arc<AppState>) {
        // 1. Recovery must run before anything can pause a process again.
        commands::system::recover(state);

        // 2. Rules.
        let rules = state.rule_store.load_or_seed();
        *state.rules.lock().unwrap() = rules.clone();

        // 3. Callbacks hold weak references; the state owns both services.
        let weak: Weak<AppState> = Arc::downgrade(state);
        state.sampler.on_snapshot(Box::new(move |samples| {
            if let Some(state) = weak.upgrade() {
                commands::traffic::apply_snapshot(&state, samples);
            }
        }));
        let weak: Weak<AppState> = Arc::downgrade(state);
        state.watchdog.on_action(Box::new(move |entry| {
            if let Some(state) = weak.upgrade() {
                commands::traffic::record_action(&state, entry);
            }
        }));

        // 4. Sampler.
        state.sampler.start();

        // 5. Watchdog rules; the watchdog itself only runs in gaming mode.
        state.watchdog.update_rules(rules);
        tracing::info!(target: "app", "Background services started");
    }

    /// Stop sampling and leave gaming mode, resuming everything paused.
    pub fn stop(state: &AppState) {
        tracing::info!(target: "app", "Stopping background services");
        state.sampler.stop();
        commands::system::switch_gaming_mode(state, false, false);
    }
}

/// Headless presentation: log every published event until the channel closes.
pub async fn log_events(mut events: UnboundedReceiver<AppEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            AppEvent::Snapshot(samples) => {
                let total: f64 = samples.iter().map(|s| s.total_per_sec()).sum();
                match samples.first() {
                    Some(top) => tracing::debug!(
                        target: "app",
                        "Snapshot: {} processes, {} total, top {} ({})",
                        samples.len(),
                        format_speed_compact(total),
                        top.process_name,
                        format_speed_compact(top.total_per_sec())
                    ),
                    None => tracing::debug!(target: "app", "Snapshot: idle"),
                }
            }
            AppEvent::Recommendations(recs) => {
                for rec in recs
                    .iter()
                    .filter(|r| r.reason == commands::RecommendationReason::HighTraffic)
                {
                    tracing::info!(
                        target: "app",
                        "Recommendation: {} at {}: {}",
                        rec.process_name,
                        format_speed_compact(rec.total_per_sec),
                        rec.message
                    );
                }
            }
            AppEvent::Action(entry) => tracing::info!(
                target: "app",
                "Applied {} to {}: {}",
                entry.action,
                entry.process_name,
                entry.result
            ),
            AppEvent::Notice(message) => tracing::info!(target: "app", "Notice: {message}"),
        }
    }
    tracing::debug!(target: "app", "Event channel closed");
}

/// Format a speed value in a compact human-readable form.
pub fn format_speed_compact(bps: f64) -> String {
    if bps < 1024.0 {
        format!("{:.0} B/s", bps)
    } else if bps < 1024.0 * 1024.0 {
        format!("{:.1} KB/s", bps / 1024.0)
    } else {
        format!("{:.2} MB/s", bps / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::Harness;
    use crate::core::catalog;
    use crate::test_support::wait_until;
    use std::time::Duration;

    #[test]
    fn test_format_speed_compact_bytes() {
        assert_eq!(format_speed_compact(0.0), "0 B/s");
        assert_eq!(format_speed_compact(512.0), "512 B/s");
        assert_eq!(format_speed_compact(1023.0), "1023 B/s");
    }

    #[test]
    fn test_format_speed_compact_kilobytes() {
        assert_eq!(format_speed_compact(1024.0), "1.0 KB/s");
        assert_eq!(format_speed_compact(300_000.0), "293.0 KB/s");
    }

    #[test]
    fn test_format_speed_compact_megabytes() {
        assert_eq!(format_speed_compact(1048576.0), "1.00 MB/s");
        assert_eq!(format_speed_compact(2621440.0), "2.50 MB/s");
    }

    #[test]
    fn test_start_seeds_rules_and_publishes_snapshots() {
        let mut h = Harness::new();
        std::fs::remove_file(h.state.paths.rules_file()).unwrap();

        BackgroundServices::start(&h.state);
        assert_eq!(*h.state.rules.lock().unwrap(), catalog::default_rules());
        assert!(h.state.sampler.is_running());

        let mut seen = Vec::new();
        assert!(wait_until(Duration::from_secs(2), || {
            seen.extend(h.drain());
            seen.iter().any(|e| matches!(e, AppEvent::Snapshot(_)))
        }));
        assert!(h.runner.count("nettop -P -L 1 -n -x") >= 1);

        BackgroundServices::stop(&h.state);
        assert!(!h.state.sampler.is_running());
    }

    #[test]
    fn test_stop_leaves_gaming_mode() {
        let h = Harness::new();
        BackgroundServices::start(&h.state);
        commands::system::set_gaming_mode(&h.state, true);

        BackgroundServices::stop(&h.state);
        assert!(!h.state.watchdog.is_enabled());
        assert!(!commands::system::status(&h.state).gaming_mode);
    }
}
