//! Guard evaluation and event escalation.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::detection::{ContentClassifier, Verdict};
use crate::escalation::blocks::BlockList;
use crate::events::{AlertQueue, BlockNotice, EventDetails, EventLog, SecurityEvent, Severity};
use crate::limiter::{WindowCounter, WindowEntry};
use crate::observability::metrics;
use crate::rules::{Rule, RuleStore, TargetType};
use crate::time::SharedClock;

const SOURCE: &str = "escalation";

/// What the caller is trying to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
    pub actor_key: String,
    pub action_type: String,
    /// Narrow evaluation to rules of one target type; all match when absent.
    #[serde(default)]
    pub target_type: Option<TargetType>,
    #[serde(default)]
    pub payload: Option<String>,
}

impl ActionContext {
    pub fn new(actor_key: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            actor_key: actor_key.into(),
            action_type: action_type.into(),
            target_type: None,
            payload: None,
        }
    }

    pub fn with_target(mut self, target_type: TargetType) -> Self {
        self.target_type = Some(target_type);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Blocked,
    RateLimited,
    ContentRejected,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::Blocked => "blocked",
            DenyReason::RateLimited => "rate_limited",
            DenyReason::ContentRejected => "content_rejected",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of `guard()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    /// Event recorded while reaching this decision, if any.
    pub event_id: Option<Uuid>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            event_id: None,
        }
    }

    pub fn deny(reason: DenyReason, event_id: Option<Uuid>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            event_id,
        }
    }
}

/// Orchestrates rules, windows, classifier, blocks, and the event log.
pub struct EscalationController {
    rules: Arc<RuleStore>,
    windows: WindowCounter,
    classifier: ContentClassifier,
    blocks: BlockList,
    events: EventLog,
    alerts: AlertQueue,
    clock: SharedClock,
    critical_block_ms: u64,
}

impl EscalationController {
    pub fn new(
        rules: Arc<RuleStore>,
        events: EventLog,
        alerts: AlertQueue,
        clock: SharedClock,
        critical_block_ms: u64,
    ) -> Self {
        Self {
            rules,
            windows: WindowCounter::new(clock.clone()),
            classifier: ContentClassifier::new(),
            blocks: BlockList::new(clock.clone()),
            events,
            alerts,
            clock,
            critical_block_ms,
        }
    }

    /// Decide whether the action may proceed.
    pub fn guard(&self, ctx: &ActionContext) -> Decision {
        if self.blocks.is_blocked(&ctx.actor_key) {
            tracing::debug!(
                actor = %ctx.actor_key,
                action = %ctx.action_type,
                "Refusing blocked actor"
            );
            metrics::record_decision(DenyReason::Blocked.as_str());
            return Decision::deny(DenyReason::Blocked, None);
        }

        let denials: Vec<(Arc<Rule>, WindowEntry)> = self
            .rules
            .matching(&ctx.action_type, ctx.target_type)
            .into_iter()
            .filter_map(|rule| {
                let entry = self
                    .windows
                    .observe(&rule.window_key(&ctx.actor_key), rule.window_ms);
                (entry.count > rule.max_attempts).then_some((rule, entry))
            })
            .collect();

        if !denials.is_empty() {
            let event_id = self.rate_violation(ctx, &denials);
            metrics::record_decision(DenyReason::RateLimited.as_str());
            return Decision::deny(DenyReason::RateLimited, Some(event_id));
        }

        if let Some(payload) = &ctx.payload {
            let verdict = self.classifier.classify(payload);
            if verdict.suspicious {
                let event = SecurityEvent::new(
                    Severity::High,
                    SOURCE,
                    Some(ctx.actor_key.clone()),
                    EventDetails::ContentInjectionAttempt {
                        action_type: ctx.action_type.clone(),
                        reasons: verdict.reasons,
                    },
                    self.clock.now_ms(),
                );
                let event_id = self.record(event);
                metrics::record_decision(DenyReason::ContentRejected.as_str());
                return Decision::deny(DenyReason::ContentRejected, Some(event_id));
            }
        }

        metrics::record_decision("allowed");
        Decision::allow()
    }

    fn rate_violation(&self, ctx: &ActionContext, denials: &[(Arc<Rule>, WindowEntry)]) -> Uuid {
        let mut severity = Severity::Medium;
        // Rule with the longest penalty among those that crossed their block threshold.
        let mut blocking: Option<&(Arc<Rule>, WindowEntry)> = None;

        for denial in denials {
            let (rule, entry) = denial;
            if rule.escalation_point().is_some_and(|point| entry.count >= point) {
                severity = Severity::High;
            }
            if rule.auto_block_enabled
                && entry.count >= rule.auto_block_threshold
                && blocking.map_or(true, |(b, _)| rule.penalty_ms > b.penalty_ms)
            {
                blocking = Some(denial);
            }
        }

        let (primary_rule, primary_entry) = blocking.unwrap_or(&denials[0]);

        let mut blocked = false;
        if let Some((rule, _)) = blocking {
            blocked = true;
            let reason = DenyReason::RateLimited.as_str();
            if let Some(block) = self.blocks.insert(&ctx.actor_key, reason, rule.penalty_ms) {
                tracing::warn!(
                    actor = %ctx.actor_key,
                    rule = %rule.id,
                    expires_at = block.expires_at,
                    "Auto-block created"
                );
                metrics::record_block_created("auto_block");
                if rule.notify_on_block {
                    self.alerts.notify_block(BlockNotice {
                        target_key: block.target_key,
                        rule: Some(Rule::clone(rule)),
                        reason: block.reason,
                        expires_at: block.expires_at,
                    });
                }
            }
        }

        let event = SecurityEvent::new(
            severity,
            SOURCE,
            Some(ctx.actor_key.clone()),
            EventDetails::RateExceeded {
                action_type: ctx.action_type.clone(),
                rule_ids: denials.iter().map(|(r, _)| r.id.clone()).collect(),
                attempts: primary_entry.count,
                max_attempts: primary_rule.max_attempts,
            },
            self.clock.now_ms(),
        )
        .with_blocked(blocked);

        self.record(event)
    }

    /// Append an event, forward it, and apply the critical-event block.
    pub fn record(&self, mut event: SecurityEvent) -> Uuid {
        if event.severity == Severity::Critical && !event.blocked {
            if let Some(subject) = &event.subject_id {
                let penalty_ms = self.critical_block_ms;
                if let Some(block) = self.blocks.insert(subject, "critical_event", penalty_ms) {
                    tracing::warn!(
                        subject = %subject,
                        kind = %event.kind,
                        expires_at = block.expires_at,
                        "Critical event, subject blocked"
                    );
                    metrics::record_block_created("critical_event");
                }
                event.blocked = true;
            }
        }

        match event.severity {
            Severity::Low | Severity::Medium => tracing::info!(
                kind = %event.kind,
                severity = %event.severity,
                subject = ?event.subject_id,
                source = %event.source,
                "Security event"
            ),
            Severity::High | Severity::Critical => tracing::warn!(
                kind = %event.kind,
                severity = %event.severity,
                subject = ?event.subject_id,
                source = %event.source,
                blocked = event.blocked,
                "Security event"
            ),
        }

        metrics::record_security_event(event.kind.as_str(), &event.severity.to_string());
        self.alerts.forward_event(&event);
        self.events.record(event)
    }

    pub fn classify(&self, text: &str) -> Verdict {
        self.classifier.classify(text)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn blocks(&self) -> &BlockList {
        &self.blocks
    }

    pub fn windows(&self) -> &WindowCounter {
        &self.windows
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Alert, EventKind};
    use crate::rules::types::login_rule;
    use crate::time::{Clock, ManualClock};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Fixture {
        clock: Arc<ManualClock>,
        controller: EscalationController,
        alerts: mpsc::Receiver<Alert>,
    }

    fn fixture(rules: Vec<Rule>) -> Fixture {
        let clock = ManualClock::new(1_000_000);
        let (store, _) = RuleStore::from_rules(rules);
        let (queue, alerts) = AlertQueue::channel(64, Severity::High);
        let controller = EscalationController::new(
            Arc::new(store),
            EventLog::new(100, clock.clone()),
            queue,
            clock.clone(),
            3_600_000,
        );
        Fixture {
            clock,
            controller,
            alerts,
        }
    }

    #[test]
    fn test_no_rule_is_fail_open() {
        let f = fixture(vec![]);
        for _ in 0..100 {
            assert!(f.controller.guard(&ActionContext::new("u", "login")).allowed);
        }
        assert!(f.controller.events().is_empty());
    }

    #[test]
    fn test_login_scenario() {
        let mut f = fixture(vec![login_rule()]);
        let ctx = ActionContext::new("user:42", "login");

        for _ in 0..5 {
            assert_eq!(f.controller.guard(&ctx), Decision::allow());
        }
        for call in 6..=10 {
            let d = f.controller.guard(&ctx);
            assert!(!d.allowed, "call {call}");
            assert_eq!(d.reason, Some(DenyReason::RateLimited));
        }

        let block = f.controller.blocks().active("user:42").unwrap();
        assert_eq!(block.expires_at, 1_000_000 + 900_000);
        assert_eq!(f.controller.guard(&ctx).reason, Some(DenyReason::Blocked));

        let events = f.controller.events().recent(10);
        assert_eq!(events.len(), 5);
        let newest = &events[0];
        assert_eq!(newest.severity, Severity::High);
        assert!(newest.blocked);
        assert!(events[1..].iter().all(|e| e.severity == Severity::Medium && !e.blocked));

        let mut saw_block_notice = false;
        while let Ok(alert) = f.alerts.try_recv() {
            if let Alert::Block(notice) = alert {
                assert_eq!(notice.target_key, "user:42");
                let rule = notice.rule.as_ref().unwrap();
                assert_eq!(rule.id, "login-per-account");
                assert_eq!(rule.penalty_ms, 900_000);
                saw_block_notice = true;
            }
        }
        assert!(saw_block_notice);
    }

    fn block_notices(f: &mut Fixture) -> Vec<BlockNotice> {
        let mut notices = Vec::new();
        while let Ok(alert) = f.alerts.try_recv() {
            if let Alert::Block(notice) = alert {
                notices.push(notice);
            }
        }
        notices
    }

    #[test]
    fn test_silent_rule_blocks_without_notice() {
        let quiet = Rule {
            notify_on_block: false,
            ..login_rule()
        };
        let mut f = fixture(vec![quiet]);
        let ctx = ActionContext::new("user:7", "login");
        for _ in 0..10 {
            f.controller.guard(&ctx);
        }

        assert!(f.controller.blocks().is_blocked("user:7"));
        assert!(f.controller.events().recent(1)[0].blocked);
        assert!(block_notices(&mut f).is_empty());
    }

    #[test]
    fn test_existing_block_is_not_renotified() {
        let mut f = fixture(vec![login_rule()]);
        let ctx = ActionContext::new("user:8", "login");
        for _ in 0..10 {
            f.controller.guard(&ctx);
        }
        assert_eq!(block_notices(&mut f).len(), 1);
        let first = f.controller.blocks().active("user:8").unwrap();

        // A critical report for the same subject finds the block already in force.
        f.clock.advance(Duration::from_secs(1));
        f.controller.record(SecurityEvent::new(
            Severity::Critical,
            "client",
            Some("user:8".into()),
            EventDetails::StateTamperingAttempt {
                storage_key: "cart".into(),
                description: "price field rewritten".into(),
            },
            f.clock.now_ms(),
        ));

        assert!(block_notices(&mut f).is_empty());
        assert_eq!(f.controller.blocks().active("user:8"), Some(first));
    }

    #[test]
    fn test_blocked_calls_record_nothing() {
        let f = fixture(vec![login_rule()]);
        let ctx = ActionContext::new("user:42", "login");
        for _ in 0..10 {
            f.controller.guard(&ctx);
        }
        let before = f.controller.events().len();
        for _ in 0..20 {
            assert_eq!(f.controller.guard(&ctx).reason, Some(DenyReason::Blocked));
        }
        assert_eq!(f.controller.events().len(), before);

        f.clock.advance(Duration::from_millis(900_001));
        assert!(f.controller.guard(&ctx).allowed);
    }

    #[test]
    fn test_most_restrictive_rule_wins() {
        let per_origin = Rule {
            id: "login-per-origin".into(),
            target_type: TargetType::Origin,
            max_attempts: 2,
            auto_block_enabled: false,
            ..login_rule()
        };
        let f = fixture(vec![login_rule(), per_origin]);
        let ctx = ActionContext::new("10.0.0.1", "login");

        assert!(f.controller.guard(&ctx).allowed);
        assert!(f.controller.guard(&ctx).allowed);
        assert_eq!(f.controller.guard(&ctx).reason, Some(DenyReason::RateLimited));

        // Narrowed to identity rules only, the stricter origin rule is out of play.
        let identity_only = ctx.clone().with_target(TargetType::Identity);
        assert!(f.controller.guard(&identity_only).allowed);

        let events = f.controller.events().recent(1);
        match &events[0].details {
            EventDetails::RateExceeded { rule_ids, .. } => {
                assert_eq!(rule_ids, &vec!["login-per-origin".to_string()]);
            }
            other => panic!("unexpected details {other:?}"),
        }
    }

    #[test]
    fn test_escalation_without_auto_block() {
        let rule = Rule {
            auto_block_enabled: false,
            max_attempts: 1,
            auto_block_threshold: 3,
            ..login_rule()
        };
        let f = fixture(vec![rule]);
        let ctx = ActionContext::new("u", "login");
        f.controller.guard(&ctx);
        f.controller.guard(&ctx); // count 2: medium
        f.controller.guard(&ctx); // count 3: high
        let events = f.controller.events().recent(2);
        assert_eq!(events[0].severity, Severity::High);
        assert_eq!(events[1].severity, Severity::Medium);
        assert!(f.controller.blocks().list().is_empty());
    }

    #[test]
    fn test_suspicious_payload_rejected() {
        let f = fixture(vec![]);
        let ctx = ActionContext::new("u", "form_submit").with_payload("<script>steal()</script>");
        let d = f.controller.guard(&ctx);
        assert_eq!(d.reason, Some(DenyReason::ContentRejected));

        let event = f.controller.events().get(d.event_id.unwrap()).unwrap();
        assert_eq!(event.kind, EventKind::ContentInjectionAttempt);
        assert_eq!(event.severity, Severity::High);

        let clean = ActionContext::new("u", "form_submit").with_payload("hello");
        assert!(f.controller.guard(&clean).allowed);
    }

    #[test]
    fn test_critical_event_blocks_subject() {
        let f = fixture(vec![]);
        let event = SecurityEvent::new(
            Severity::Critical,
            "client",
            Some("device:abc".into()),
            EventDetails::StateTamperingAttempt {
                storage_key: "auth_token".into(),
                description: "role claim rewritten".into(),
            },
            0,
        );
        let id = f.controller.record(event);
        assert!(f.controller.events().get(id).unwrap().blocked);
        assert_eq!(
            f.controller.guard(&ActionContext::new("device:abc", "api_call")).reason,
            Some(DenyReason::Blocked)
        );
        let block = f.controller.blocks().active("device:abc").unwrap();
        assert_eq!(block.expires_at, 1_000_000 + 3_600_000);
    }
}
