//! Rule enforcement while gaming mode is on.
//!
//! The watchdog owns a 1-second [`Ticker`], a cooldown table, and the
//! paused-journal. Every process it suspends is written to the journal on
//! disk before the stop signal is sent, so a crash can never leave a process
//! suspended without a record of it. [`EnforcementWatchdog::recover_if_needed`]
//! undoes whatever a previous, uncleanly terminated instance left behind.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use crate::config::{COOLDOWN_SECS, ENFORCE_INTERVAL_SECS};
use crate::core::catalog;
use crate::core::clock::Clock;
use crate::core::process_control::{ProcessControl, Signal};
use crate::core::rule::{Rule, RuleAction};
use crate::core::throttle::SettingsThrottle;
use crate::core::ticker::Ticker;
use crate::store::journal::{EnforcementState, JournalStore};

/// One applied enforcement action, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub process_name: String,
    pub action: RuleAction,
    pub result: String,
}

pub type ActionCallback = Box<dyn Fn(ActionLogEntry) + Send + Sync>;

#[derive(Debug, Default)]
struct WatchdogState {
    enabled: bool,
    paused: BTreeSet<String>,
}

impl WatchdogState {
    fn journal(&self) -> EnforcementState {
        EnforcementState {
            enabled: self.enabled,
            paused_process_names: self.paused.clone(),
        }
    }
}

pub struct EnforcementWatchdog {
    control: ProcessControl,
    throttle: Arc<SettingsThrottle>,
    journal: JournalStore,
    clock: Arc<dyn Clock>,
    /// Replaced wholesale by `update_rules`; a tick works on the snapshot it took.
    rules: RwLock<Arc<Vec<Rule>>>,
    /// `name:action` to the instant the action was last let through.
    cooldown: DashMap<String, std::time::Instant>,
    state: Mutex<WatchdogState>,
    /// Serializes whole on/off transitions; never taken by a tick.
    transition: Mutex<()>,
    ticker: Mutex<Option<Ticker>>,
    on_action: RwLock<Option<ActionCallback>>,
}

impl EnforcementWatchdog {
    pub fn new(
        control: ProcessControl,
        throttle: Arc<SettingsThrottle>,
        journal: JournalStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // Names a crashed run left suspended stay ours until resumed.
        let paused = journal
            .load()
            .map(|s| s.paused_process_names)
            .unwrap_or_default();
        if !paused.is_empty() {
            tracing::info!(
                target: "watchdog",
                "Loaded {} paused process(es) from journal",
                paused.len()
            );
        }
        Self {
            control,
            throttle,
            journal,
            clock,
            rules: RwLock::new(Arc::new(Vec::new())),
            cooldown: DashMap::new(),
            state: Mutex::new(WatchdogState {
                enabled: false,
                paused,
            }),
            transition: Mutex::new(()),
            ticker: Mutex::new(None),
            on_action: RwLock::new(None),
        }
    }

    /// Register the action-log consumer, replacing any previous one.
    pub fn on_action(&self, callback: ActionCallback) {
        *self.on_action.write().unwrap() = Some(callback);
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }

    /// Names currently recorded as paused by the watchdog.
    pub fn paused_processes(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().paused.clone()
    }

    /// Replace the active rule set. No validation happens here.
    pub fn update_rules(&self, rules: Vec<Rule>) {
        let count = rules.len();
        *self.rules.write().unwrap() = Arc::new(rules);
        tracing::info!(target: "watchdog", "Rules updated: {count}");
    }

    /// Switch gaming mode on or off. Unchanged state is a no-op.
    pub fn set_enabled(self: &Arc<Self>, enabled: bool) {
        let _transition = self.transition.lock().unwrap();
        {
            let mut state = self.state.lock().unwrap();
            if state.enabled == enabled {
                return;
            }
            state.enabled = enabled;
            if enabled {
                // Journal first: a crash from here on is detected at next start.
                self.persist(&state);
            }
        }
        tracing::info!(
            target: "watchdog",
            "Gaming mode -> {}",
            if enabled { "ON" } else { "OFF" }
        );

        if enabled {
            self.throttle.enable();
            self.start_ticker();
        } else {
            self.stop_ticker();
            self.throttle.disable();
            self.resume_paused();
            if let Err(e) = self.journal.clear() {
                tracing::error!(target: "watchdog", "Failed to remove enforcement journal: {e}");
            }
        }
    }

    /// Undo the effects of a previous instance that exited without disabling.
    ///
    /// Returns a notice for the user when something was recovered. Calling it
    /// again right away finds nothing and returns `None`.
    pub fn recover_if_needed(&self) -> Option<String> {
        let journal = self.journal.load()?;
        if journal.is_clean() {
            let _ = self.journal.clear();
            return None;
        }

        tracing::warn!(
            target: "watchdog",
            "Unclean shutdown detected (enabled={}, paused={})",
            journal.enabled,
            journal.paused_process_names.len()
        );
        for name in &journal.paused_process_names {
            self.control.signal(name, Signal::Continue);
            tracing::info!(target: "watchdog", "Resumed process after recovery: {name}");
        }
        self.throttle.disable();

        {
            let mut state = self.state.lock().unwrap();
            state.enabled = false;
            state.paused.clear();
        }
        if let Err(e) = self.journal.clear() {
            tracing::error!(target: "watchdog", "Failed to remove enforcement journal: {e}");
        }

        let names = journal
            .paused_process_names
            .iter()
            .cloned()
            .collect::<Vec<_>>();
        Some(if names.is_empty() {
            "Recovered from an unclean shutdown: system update settings restored.".to_string()
        } else {
            format!(
                "Recovered from an unclean shutdown: resumed {} and restored system update settings.",
                names.join(", ")
            )
        })
    }

    /// One enforcement pass over the current rule snapshot.
    pub fn enforce(&self) {
        if !self.is_enabled() {
            return;
        }
        let rules = Arc::clone(&self.rules.read().unwrap());

        for rule in rules.iter().filter(|r| r.enabled) {
            let name = rule.process_name.as_str();
            if catalog::is_protected(name) {
                continue;
            }
            if !self.control.is_running(name) {
                continue;
            }
            if !self.allow_by_cooldown(name, rule.action) {
                continue;
            }

            let output = match rule.action {
                RuleAction::Pause => {
                    self.journal_paused(name);
                    self.control.signal(name, Signal::Stop)
                }
                RuleAction::Terminate => self.control.signal(name, Signal::Terminate),
            };

            let result = if output.is_empty() {
                "applied".to_string()
            } else {
                output
            };
            tracing::warn!(
                target: "watchdog",
                "Action: {name} -> {}, result={result}",
                rule.action
            );
            self.emit(ActionLogEntry {
                timestamp: Utc::now(),
                process_name: name.to_string(),
                action: rule.action,
                result,
            });
        }
    }

    /// Atomic check-and-record against the cooldown table.
    fn allow_by_cooldown(&self, name: &str, action: RuleAction) -> bool {
        let now = self.clock.now();
        let cooldown = Duration::from_secs(COOLDOWN_SECS);
        match self.cooldown.entry(format!("{name}:{action}")) {
            Entry::Occupied(mut last) => {
                if now.saturating_duration_since(*last.get()) < cooldown {
                    return false;
                }
                last.insert(now);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Record `name` as paused and persist before the stop signal goes out.
    fn journal_paused(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.paused.insert(name.to_string());
        self.persist(&state);
    }

    fn persist(&self, state: &WatchdogState) {
        if let Err(e) = self.journal.save(&state.journal()) {
            tracing::error!(target: "watchdog", "Failed to persist enforcement journal: {e}");
        }
    }

    fn resume_paused(&self) {
        let paused = std::mem::take(&mut self.state.lock().unwrap().paused);
        for name in &paused {
            self.control.signal(name, Signal::Continue);
            tracing::info!(target: "watchdog", "Resumed process: {name}");
        }
    }

    fn emit(&self, entry: ActionLogEntry) {
        if let Some(callback) = self.on_action.read().unwrap().as_ref() {
            callback(entry);
        }
    }

    fn start_ticker(self: &Arc<Self>) {
        let mut ticker = self.ticker.lock().unwrap();
        if ticker.is_some() {
            return;
        }
        let watchdog = Arc::clone(self);
        match Ticker::spawn(
            "enforcement-watchdog",
            Duration::from_secs(ENFORCE_INTERVAL_SECS),
            move || watchdog.enforce(),
        ) {
            Ok(t) => {
                *ticker = Some(t);
                tracing::info!(target: "watchdog", "Watchdog started");
            }
            Err(e) => tracing::error!(target: "watchdog", "Failed to spawn watchdog thread: {e}"),
        }
    }

    /// Cancel the ticker and wait for an in-flight pass, so nothing is paused
    /// after the resume that follows.
    fn stop_ticker(&self) {
        let ticker = self.ticker.lock().unwrap().take();
        if let Some(ticker) = ticker {
            ticker.cancel();
            tracing::info!(target: "watchdog", "Watchdog stopped");
        }
    }
}
