//! Rule list persistence.

use std::path::PathBuf;

use crate::core::catalog;
use crate::core::rule::Rule;
use crate::error::AppError;

/// Ordered rule list stored as a JSON array.
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        tracing::info!(target: "rules", "Rule store: {}", path.display());
        Self { path }
    }

    pub fn load(&self) -> Option<Vec<Rule>> {
        let rules: Vec<Rule> = super::read_json(&self.path)?;
        tracing::info!(target: "rules", "Loaded {} rules", rules.len());
        Some(rules)
    }

    pub fn save(&self, rules: &[Rule]) -> Result<(), AppError> {
        super::write_json_atomic(&self.path, rules)?;
        tracing::info!(target: "rules", "Saved {} rules", rules.len());
        Ok(())
    }

    /// Stored rules, or the seeded defaults when nothing usable is stored.
    pub fn load_or_seed(&self) -> Vec<Rule> {
        match self.load() {
            Some(rules) if !rules.is_empty() => rules,
            _ => {
                let rules = catalog::default_rules();
                if let Err(e) = self.save(&rules) {
                    tracing::warn!(target: "rules", "Failed to save default rules: {e}");
                }
                tracing::info!(target: "rules", "Seeded {} default rules", rules.len());
                rules
            }
        }
    }
}
