//! Shared fixtures for integration tests.

use std::sync::Arc;
use tokio::sync::mpsc;

use abuse_guard::config::GuardConfig;
use abuse_guard::events::{Alert, AlertQueue, Severity};
use abuse_guard::rules::{Rule, TargetType};
use abuse_guard::time::ManualClock;
use abuse_guard::GuardEngine;

#[allow(dead_code)]
pub const START_MS: u64 = 1_700_000_000_000;

/// The login rule from the reference scenario.
pub fn login_rule() -> Rule {
    Rule {
        id: "login-per-account".into(),
        name: "Login attempts per account".into(),
        action_type: "login".into(),
        target_type: TargetType::Identity,
        window_ms: 60_000,
        max_attempts: 5,
        penalty_ms: 900_000,
        auto_block_enabled: true,
        auto_block_threshold: 10,
        notify_on_block: true,
        active: true,
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub engine: Arc<GuardEngine>,
    #[allow(dead_code)]
    pub alerts: mpsc::Receiver<Alert>,
}

impl Harness {
    #[allow(dead_code)]
    pub fn drain_alerts(&mut self) -> Vec<Alert> {
        let mut out = Vec::new();
        while let Ok(alert) = self.alerts.try_recv() {
            out.push(alert);
        }
        out
    }
}

pub fn harness(config: GuardConfig) -> Harness {
    let clock = ManualClock::new(START_MS);
    let (queue, alerts) = AlertQueue::channel(256, Severity::High);
    let engine = GuardEngine::builder(config)
        .clock(clock.clone())
        .alerts(queue)
        .build();
    Harness {
        clock,
        engine: Arc::new(engine),
        alerts,
    }
}

#[allow(dead_code)]
pub fn harness_with_rules(rules: Vec<Rule>) -> Harness {
    let mut config = GuardConfig::default();
    config.rules = rules;
    harness(config)
}
