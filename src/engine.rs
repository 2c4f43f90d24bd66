//! The guard engine handed to every request handler.
//!
//! One [`GuardEngine`] is built at process start and shared by `Arc`. It owns
//! all mutable state; there is no global instance.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::GuardConfig;
use crate::detection::Verdict;
use crate::escalation::{ActionContext, Block, Decision, EscalationController};
use crate::events::{AlertQueue, EventDetails, EventLog, EventStats, SecurityEvent, Severity};
use crate::observability::metrics;
use crate::rules::{LoadReport, Rule, RuleStore};
use crate::security::{self, CsrfGuard};
use crate::time::{self, Clock, SharedClock};

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub windows: usize,
    pub blocks: usize,
    pub csrf_tokens: usize,
}

pub struct GuardEngineBuilder {
    config: GuardConfig,
    clock: Option<SharedClock>,
    alerts: Option<AlertQueue>,
}

impl GuardEngineBuilder {
    pub fn clock<C: Clock + 'static>(mut self, clock: Arc<C>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn alerts(mut self, alerts: AlertQueue) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn build(self) -> GuardEngine {
        let clock = self.clock.unwrap_or_else(time::system_clock);
        let alerts = self.alerts.unwrap_or_else(AlertQueue::disabled);
        let engine_config = &self.config.engine;

        let (rules, report) = RuleStore::from_rules(self.config.rules.clone());
        metrics::record_rules_loaded(report.accepted, report.rejected.len());
        let rules = Arc::new(rules);

        let controller = EscalationController::new(
            rules.clone(),
            EventLog::new(engine_config.event_log_capacity, clock.clone()),
            alerts,
            clock.clone(),
            engine_config.critical_block_secs.saturating_mul(1000),
        );

        let ttl_ms = match self.config.csrf.token_ttl_secs {
            0 => None,
            secs => Some(secs.saturating_mul(1000)),
        };
        let csrf = CsrfGuard::new(clock.clone(), self.config.csrf.single_use, ttl_ms);

        GuardEngine {
            controller,
            csrf,
            rules,
            clock,
        }
    }
}

pub struct GuardEngine {
    controller: EscalationController,
    csrf: CsrfGuard,
    rules: Arc<RuleStore>,
    clock: SharedClock,
}

impl GuardEngine {
    pub fn builder(config: GuardConfig) -> GuardEngineBuilder {
        GuardEngineBuilder {
            config,
            clock: None,
            alerts: None,
        }
    }

    /// Decide whether an action may proceed. Never fails, never blocks on I/O.
    pub fn guard(&self, ctx: &ActionContext) -> Decision {
        self.controller.guard(ctx)
    }

    /// Classify text without recording anything, so callers can choose to
    /// sanitize and continue instead of rejecting.
    pub fn inspect(&self, text: &str) -> Verdict {
        self.controller.classify(text)
    }

    pub fn issue_csrf_token(&self, session_id: &str) -> String {
        self.csrf.issue(session_id)
    }

    /// Check a presented token; failures are recorded as forged requests.
    pub fn validate_csrf_token(&self, session_id: &str, presented: &str) -> bool {
        match self.csrf.validate(session_id, presented) {
            Ok(()) => true,
            Err(failure) => {
                self.record_event(
                    Severity::High,
                    "csrf",
                    Some(session_id.to_string()),
                    EventDetails::ForgedRequestAttempt {
                        session_id: session_id.to_string(),
                        failure,
                    },
                );
                false
            }
        }
    }

    pub fn revoke_csrf_token(&self, session_id: &str) -> bool {
        self.csrf.revoke(session_id)
    }

    /// Role check; a refusal is recorded as a privilege escalation attempt.
    pub fn authorize(
        &self,
        caller_role: &str,
        required_role: &str,
        action: &str,
        subject_id: Option<&str>,
    ) -> bool {
        if security::is_authorized(caller_role, required_role) {
            return true;
        }
        self.record_event(
            Severity::High,
            "authorization",
            subject_id.map(str::to_string),
            EventDetails::PrivilegeEscalationAttempt {
                caller_role: caller_role.to_string(),
                required_role: required_role.to_string(),
                action: action.to_string(),
            },
        );
        false
    }

    /// Report an incident observed at a boundary (tampered client state,
    /// session anomalies, and so on).
    pub fn record_event(
        &self,
        severity: Severity,
        source: &str,
        subject_id: Option<String>,
        details: EventDetails,
    ) -> Uuid {
        let event = SecurityEvent::new(severity, source, subject_id, details, self.clock.now_ms());
        self.controller.record(event)
    }

    pub fn recent_events(&self, limit: usize) -> Vec<SecurityEvent> {
        self.events().recent(limit)
    }

    pub fn event_stats(&self, since: Duration) -> EventStats {
        self.events().stats_since(since)
    }

    pub fn events(&self) -> &EventLog {
        self.controller.events()
    }

    pub fn active_blocks(&self) -> Vec<Block> {
        self.controller.blocks().list()
    }

    pub fn is_blocked(&self, target_key: &str) -> bool {
        self.controller.blocks().is_blocked(target_key)
    }

    /// Lift a block before it expires.
    pub fn unblock(&self, target_key: &str) -> bool {
        let removed = self.controller.blocks().remove(target_key);
        if removed {
            tracing::info!(target_key = %target_key, "Block lifted manually");
        }
        removed
    }

    /// Replace the rule set. Window state for unchanged rule ids carries over.
    pub fn reload_rules(&self, rules: Vec<Rule>) -> LoadReport {
        let report = self.rules.replace(rules);
        metrics::record_rules_loaded(report.accepted, report.rejected.len());
        report
    }

    pub fn rules(&self) -> Vec<Rule> {
        self.rules.all()
    }

    pub fn window_entries(&self) -> usize {
        self.controller.windows().len()
    }

    /// Evict stale windows, expired blocks, and expired CSRF tokens.
    pub fn sweep(&self) -> SweepReport {
        SweepReport {
            windows: self.controller.windows().sweep(),
            blocks: self.controller.blocks().sweep(),
            csrf_tokens: self.csrf.sweep(),
        }
    }
}
