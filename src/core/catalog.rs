//! Static process knowledge: the protection allow-list, game detection, and
//! the default rule set.

use crate::core::rule::{Rule, RuleAction, RuleId};

/// Process names that must never be paused or terminated.
pub const PROTECTED_EXACT_NAMES: &[&str] = &[
    "RiotClientServices",
    "RiotClientService",
    "Riot Client",
    "LeagueClient",
    "LeagueClientUx",
    "LeagueClientUx Helper",
    "League of Legends",
    "vgc",
    "vgk",
];

/// Lowercase fragments; any process name containing one is protected.
pub const PROTECTED_NAME_TOKENS: &[&str] = &["riot", "league", "vanguard", "valorant", "vgc", "vgk"];

/// Lowercase fragments identifying a running game client.
pub const GAME_NAME_TOKENS: &[&str] = &["league of legends", "valorant"];

/// Processes paused by default while gaming mode is on.
pub const DEFAULT_PAUSED: &[&str] = &[
    "appstoreagent",
    "storedownloadd",
    "nsurlsessiond",
    "cloudd",
    "bird",
    "photolibraryd",
    "mobileassetd",
];

/// Absolute protection predicate. No rule can override it.
///
/// Substring matching deliberately over-matches: a false positive only means
/// a process is left alone.
pub fn is_protected(process_name: &str) -> bool {
    if PROTECTED_EXACT_NAMES.contains(&process_name) {
        return true;
    }
    let lower = process_name.to_lowercase();
    PROTECTED_NAME_TOKENS.iter().any(|token| lower.contains(token))
}

/// Whether `process_name` looks like a game client.
pub fn is_game_process(process_name: &str) -> bool {
    let lower = process_name.to_lowercase();
    GAME_NAME_TOKENS.iter().any(|token| lower.contains(token))
}

/// Rules seeded on first start or when the stored list is empty.
pub fn default_rules() -> Vec<Rule> {
    DEFAULT_PAUSED
        .iter()
        .enumerate()
        .map(|(i, name)| Rule {
            id: RuleId(i as u64 + 1),
            process_name: name.to_string(),
            action: RuleAction::Pause,
            enabled: true,
            is_default: true,
        })
        .collect()
}
