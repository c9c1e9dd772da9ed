//! Rule list editing.
//!
//! Every successful edit is saved to disk and pushed to the watchdog before
//! returning. A failed save leaves the in-memory list untouched.

use crate::core::rule::{next_rule_id, Rule, RuleAction, RuleId};
use crate::error::AppError;

use super::logic::{validate_action_change, validate_new_rule, validate_removal};
use super::state::AppState;

pub fn list_rules(state: &AppState) -> Vec<Rule> {
    state.rules.lock().unwrap().clone()
}

pub fn add_rule(state: &AppState, process_name: &str, action: RuleAction) -> Result<Rule, AppError> {
    let mut rules = state.rules.lock().unwrap();
    let name = validate_new_rule(&rules, process_name).inspect_err(|e| {
        tracing::warn!(target: "rules", "Rejected rule for '{process_name}': {e}");
    })?;

    let rule = Rule::new(next_rule_id(&rules), name, action);
    let mut next = rules.clone();
    next.push(rule.clone());
    commit(state, &mut rules, next)?;

    tracing::info!(target: "rules", "Added rule: {}, action={action}", rule.process_name);
    state.notify(format!("Rule added: {}", rule.process_name));
    Ok(rule)
}

pub fn remove_rule(state: &AppState, id: RuleId) -> Result<Rule, AppError> {
    let mut rules = state.rules.lock().unwrap();
    let rule = find(&rules, id)?.clone();
    validate_removal(&rule)?;

    let next = rules.iter().filter(|r| r.id != id).cloned().collect();
    commit(state, &mut rules, next)?;

    tracing::info!(target: "rules", "Removed rule: {}", rule.process_name);
    state.notify(format!("Rule removed: {}", rule.process_name));
    Ok(rule)
}

pub fn toggle_rule(state: &AppState, id: RuleId, enabled: bool) -> Result<Rule, AppError> {
    update(state, id, |rule| {
        rule.enabled = enabled;
        Ok(())
    })
    .inspect(|rule| {
        tracing::info!(target: "rules", "Toggled rule: {} -> {enabled}", rule.process_name);
        state.notify(format!(
            "Rule {}: {}",
            if enabled { "enabled" } else { "disabled" },
            rule.process_name
        ));
    })
}

pub fn set_rule_action(state: &AppState, id: RuleId, action: RuleAction) -> Result<Rule, AppError> {
    update(state, id, |rule| {
        validate_action_change(rule, action).inspect_err(|e| {
            tracing::warn!(target: "rules", "Rejected action change: {e}");
        })?;
        rule.action = action;
        Ok(())
    })
    .inspect(|rule| {
        tracing::info!(target: "rules", "Rule action updated: {} -> {action}", rule.process_name);
        state.notify(format!("Action for {} set to {action}", rule.process_name));
    })
}

fn find(rules: &[Rule], id: RuleId) -> Result<&Rule, AppError> {
    rules
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| AppError::InvalidInput(format!("No rule with id {id}")))
}

fn update(
    state: &AppState,
    id: RuleId,
    edit: impl FnOnce(&mut Rule) -> Result<(), AppError>,
) -> Result<Rule, AppError> {
    let mut rules = state.rules.lock().unwrap();
    let mut next = rules.clone();
    let Some(rule) = next.iter_mut().find(|r| r.id == id) else {
        return Err(AppError::InvalidInput(format!("No rule with id {id}")));
    };
    edit(rule)?;
    let updated = rule.clone();
    commit(state, &mut rules, next)?;
    Ok(updated)
}

/// Save `next`, then make it current and hand it to the watchdog.
fn commit(state: &AppState, current: &mut Vec<Rule>, next: Vec<Rule>) -> Result<(), AppError> {
    state.rule_store.save(&next)?;
    *current = next;
    state.watchdog.update_rules(current.clone());
    tracing::debug!(target: "rules", "Rules committed, count={}", current.len());
    Ok(())
}
