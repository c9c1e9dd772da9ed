//! Shared application state behind every command handler.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{AppPaths, Settings};
use crate::core::clock::Clock;
use crate::core::command::CommandRunner;
use crate::core::process_control::ProcessControl;
use crate::core::rule::Rule;
use crate::core::throttle::SettingsThrottle;
use crate::core::traffic::{UsageSample, UsageSampler};
use crate::core::watchdog::{ActionLogEntry, EnforcementWatchdog};
use crate::store::{BackupStore, JournalStore, RuleStore};

use super::logic::{ActionLog, Recommendation};

/// Everything the presentation layer is told about.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum AppEvent {
    Snapshot(Vec<UsageSample>),
    Recommendations(Vec<Recommendation>),
    Action(ActionLogEntry),
    Notice(String),
}

/// Last values published to the presentation layer.
#[derive(Debug, Default)]
pub struct ViewState {
    pub gaming_mode: bool,
    /// Gaming mode was switched on by auto mode, not by the user.
    pub auto_managed: bool,
    pub usages: Vec<UsageSample>,
    pub recommendations: Vec<Recommendation>,
    pub action_log: ActionLog,
    pub notice: Option<String>,
}

pub struct AppState {
    pub paths: AppPaths,
    pub sampler: Arc<UsageSampler>,
    pub watchdog: Arc<EnforcementWatchdog>,
    pub rule_store: RuleStore,
    pub rules: Mutex<Vec<Rule>>,
    pub settings: Mutex<Settings>,
    pub view: Mutex<ViewState>,
    /// Held across a whole gaming-mode switch so the view and the watchdog agree.
    pub(crate) mode_switch: Mutex<()>,
    events: UnboundedSender<AppEvent>,
}

impl AppState {
    pub fn new(
        paths: AppPaths,
        runner: Arc<dyn CommandRunner>,
        clock: Arc<dyn Clock>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        let throttle = Arc::new(SettingsThrottle::new(
            Arc::clone(&runner),
            BackupStore::new(paths.throttle_backup_file()),
        ));
        let watchdog = Arc::new(EnforcementWatchdog::new(
            ProcessControl::new(Arc::clone(&runner)),
            throttle,
            JournalStore::new(paths.journal_file()),
            Arc::clone(&clock),
        ));
        let sampler = Arc::new(UsageSampler::new(runner, clock));
        let settings = Settings::load(&paths.settings_file());

        Self {
            rule_store: RuleStore::new(paths.rules_file()),
            paths,
            sampler,
            watchdog,
            rules: Mutex::new(Vec::new()),
            settings: Mutex::new(settings),
            view: Mutex::new(ViewState::default()),
            mode_switch: Mutex::new(()),
            events,
        }
    }

    /// Publish an event. A closed channel only means nobody is listening.
    pub fn emit(&self, event: AppEvent) {
        let _ = self.events.send(event);
    }

    /// Record a user-facing notice and publish it.
    pub fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "app", "{message}");
        self.view.lock().unwrap().notice = Some(message.clone());
        self.emit(AppEvent::Notice(message));
    }
}
