//! In-memory rule set with atomic reload.

use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::Arc;

use crate::rules::types::{Rule, RuleError, TargetType};

/// Outcome of loading a batch of rules.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub accepted: usize,
    pub rejected: Vec<RuleError>,
}

/// Read-mostly store of the rules currently in force.
///
/// Readers take a snapshot; a reload swaps the whole set at once, so a
/// `guard()` call never sees half of an old set and half of a new one.
pub struct RuleStore {
    rules: ArcSwap<Vec<Arc<Rule>>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self {
            rules: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Build a store and load `rules` into it.
    pub fn from_rules(rules: Vec<Rule>) -> (Self, LoadReport) {
        let store = Self::new();
        let report = store.replace(rules);
        (store, report)
    }

    /// Validate `rules` and swap them in. Invalid rules are left out.
    pub fn replace(&self, rules: Vec<Rule>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut seen = HashSet::new();
        let mut accepted = Vec::with_capacity(rules.len());

        for rule in rules {
            if let Err(e) = rule.validate() {
                tracing::error!(rule = %rule.id, error = %e, "Rejecting invalid rule");
                report.rejected.push(e);
                continue;
            }
            if !seen.insert(rule.id.clone()) {
                let e = RuleError::DuplicateId(rule.id.clone());
                tracing::error!(rule = %rule.id, error = %e, "Rejecting invalid rule");
                report.rejected.push(e);
                continue;
            }
            accepted.push(Arc::new(rule));
        }

        report.accepted = accepted.len();
        self.rules.store(Arc::new(accepted));
        tracing::info!(
            accepted = report.accepted,
            rejected = report.rejected.len(),
            "Rule set loaded"
        );
        report
    }

    /// First active rule for this action and target.
    pub fn find_active_rule(
        &self,
        action_type: &str,
        target_type: TargetType,
    ) -> Option<Arc<Rule>> {
        self.rules
            .load()
            .iter()
            .find(|r| r.active && r.action_type == action_type && r.target_type == target_type)
            .cloned()
    }

    /// All active rules for an action, optionally narrowed to one target type.
    pub fn matching(&self, action_type: &str, target_type: Option<TargetType>) -> Vec<Arc<Rule>> {
        self.rules
            .load()
            .iter()
            .filter(|r| r.active && r.action_type == action_type)
            .filter(|r| target_type.map_or(true, |t| r.target_type == t))
            .cloned()
            .collect()
    }

    /// Snapshot of every loaded rule, active or not.
    pub fn all(&self) -> Vec<Rule> {
        self.rules.load().iter().map(|r| Rule::clone(r)).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.load().is_empty()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::types::login_rule;

    fn origin_rule() -> Rule {
        Rule {
            id: "login-per-origin".into(),
            target_type: TargetType::Origin,
            max_attempts: 20,
            auto_block_threshold: 40,
            ..login_rule()
        }
    }

    #[test]
    fn test_lookup_by_action_and_target() {
        let (store, report) = RuleStore::from_rules(vec![login_rule(), origin_rule()]);
        assert_eq!(report.accepted, 2);

        let rule = store.find_active_rule("login", TargetType::Origin).unwrap();
        assert_eq!(rule.id, "login-per-origin");
        assert!(store.find_active_rule("login", TargetType::EmailDomain).is_none());
        assert!(store.find_active_rule("signup", TargetType::Identity).is_none());

        assert_eq!(store.matching("login", None).len(), 2);
        assert_eq!(store.matching("login", Some(TargetType::Identity)).len(), 1);
        assert!(store.matching("signup", None).is_empty());
    }

    #[test]
    fn test_inactive_rules_skipped() {
        let mut inactive = login_rule();
        inactive.active = false;
        let (store, _) = RuleStore::from_rules(vec![inactive]);
        assert_eq!(store.len(), 1);
        assert!(store.matching("login", None).is_empty());
    }

    #[test]
    fn test_invalid_and_duplicate_rules_rejected() {
        let mut broken = origin_rule();
        broken.id = "broken".into();
        broken.window_ms = 0;

        let (store, report) = RuleStore::from_rules(vec![login_rule(), broken, login_rule()]);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected.len(), 2);
        assert!(matches!(report.rejected[0], RuleError::ZeroWindow(_)));
        assert!(matches!(report.rejected[1], RuleError::DuplicateId(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_swaps_whole_set() {
        let (store, _) = RuleStore::from_rules(vec![login_rule()]);
        store.replace(vec![origin_rule()]);
        assert!(store.find_active_rule("login", TargetType::Identity).is_none());
        assert!(store.find_active_rule("login", TargetType::Origin).is_some());
    }
}
