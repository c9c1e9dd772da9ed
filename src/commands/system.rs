//! Gaming mode, automatic gaming mode, crash recovery, and status.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::traffic::UsageSample;

use super::logic::{decide_auto_mode, AutoModeDecision};
use super::state::AppState;

/// Point-in-time summary for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub gaming_mode: bool,
    pub auto_gaming_mode: bool,
    pub auto_managed: bool,
    pub rule_count: usize,
    pub paused_processes: BTreeSet<String>,
    pub log_file: String,
}

/// Switch gaming mode by user request. Clears auto management.
pub fn set_gaming_mode(state: &AppState, enabled: bool) {
    tracing::info!(
        target: "app",
        "Gaming mode toggled: {}",
        if enabled { "ON" } else { "OFF" }
    );
    switch_gaming_mode(state, enabled, false);
}

/// Apply a gaming-mode change and record who made it.
///
/// The view lock is released before the watchdog transition, which may wait
/// for an in-flight enforcement pass that reports into the view.
pub(crate) fn switch_gaming_mode(state: &AppState, enabled: bool, auto_managed: bool) {
    let _switch = state.mode_switch.lock().unwrap();
    apply_switch(state, enabled, auto_managed);
}

/// Decide what auto mode wants for `samples` and act on it.
///
/// The decision reads the view under the switch lock, so a user toggle is
/// either fully before it or fully after it.
pub(crate) fn apply_auto_mode(state: &AppState, samples: &[UsageSample]) -> AutoModeDecision {
    let _switch = state.mode_switch.lock().unwrap();
    let auto_enabled = is_auto_gaming_mode(state);
    let (gaming_mode, auto_managed) = {
        let view = state.view.lock().unwrap();
        (view.gaming_mode, view.auto_managed)
    };

    let decision = decide_auto_mode(auto_enabled, gaming_mode, auto_managed, samples);
    match decision {
        AutoModeDecision::Enable => apply_switch(state, true, true),
        AutoModeDecision::Disable => apply_switch(state, false, false),
        AutoModeDecision::Keep => {}
    }
    decision
}

/// Caller holds `mode_switch`.
fn apply_switch(state: &AppState, enabled: bool, auto_managed: bool) {
    {
        let mut view = state.view.lock().unwrap();
        view.gaming_mode = enabled;
        view.auto_managed = enabled && auto_managed;
    }
    state.watchdog.set_enabled(enabled);
}

pub fn set_auto_gaming_mode(state: &AppState, enabled: bool) {
    {
        let mut settings = state.settings.lock().unwrap();
        settings.auto_gaming_mode = enabled;
        settings.save(&state.paths.settings_file());
    }

    if !enabled {
        let _switch = state.mode_switch.lock().unwrap();
        let auto_managed = state.view.lock().unwrap().auto_managed;
        if auto_managed {
            apply_switch(state, false, false);
        }
    }
    state.notify(format!(
        "Auto gaming mode: {}",
        if enabled { "ON" } else { "OFF" }
    ));
}

pub fn is_auto_gaming_mode(state: &AppState) -> bool {
    state.settings.lock().unwrap().auto_gaming_mode
}

/// Undo what a previous, uncleanly terminated run left behind.
pub fn recover(state: &AppState) {
    if let Some(notice) = state.watchdog.recover_if_needed() {
        tracing::warn!(target: "app", "{notice}");
        state.notify(notice);
    }
}

pub fn status(state: &AppState) -> StatusReport {
    let (gaming_mode, auto_managed) = {
        let view = state.view.lock().unwrap();
        (view.gaming_mode, view.auto_managed)
    };
    StatusReport {
        gaming_mode,
        auto_gaming_mode: is_auto_gaming_mode(state),
        auto_managed,
        rule_count: state.rules.lock().unwrap().len(),
        paused_processes: state.watchdog.paused_processes(),
        log_file: state.paths.log_file().display().to_string(),
    }
}
