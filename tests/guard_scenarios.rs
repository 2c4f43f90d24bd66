//! End-to-end behavior of guard() against the documented properties.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use abuse_guard::events::{Alert, EventDetails, EventKind, Severity};
use abuse_guard::rules::Rule;
use abuse_guard::{ActionContext, DenyReason};

mod common;

#[test]
fn test_reference_login_scenario() {
    let mut h = common::harness_with_rules(vec![common::login_rule()]);
    let ctx = ActionContext::new("user:42", "login");

    for call in 1..=5 {
        assert!(h.engine.guard(&ctx).allowed, "call {call}");
    }
    for call in 6..=10 {
        let decision = h.engine.guard(&ctx);
        assert!(!decision.allowed, "call {call}");
        assert_eq!(decision.reason, Some(DenyReason::RateLimited), "call {call}");
    }

    let blocks = h.engine.active_blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].target_key, "user:42");
    assert_eq!(blocks[0].expires_at, common::START_MS + 900_000);

    let eleventh = h.engine.guard(&ctx);
    assert!(!eleventh.allowed);
    assert_eq!(eleventh.reason, Some(DenyReason::Blocked));

    let notices: Vec<_> = h
        .drain_alerts()
        .into_iter()
        .filter_map(|a| match a {
            Alert::Block(notice) => Some(notice),
            Alert::Event(_) => None,
        })
        .collect();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].expires_at, common::START_MS + 900_000);
    let rule = notices[0].rule.as_ref().unwrap();
    assert_eq!(rule.name, "Login attempts per account");
    assert_eq!(rule.penalty_ms, 900_000);
}

#[test]
fn test_window_reset_allows_fresh_attempts() {
    let mut rule = common::login_rule();
    rule.auto_block_enabled = false;
    let h = common::harness_with_rules(vec![rule]);
    let ctx = ActionContext::new("user:1", "login");

    for _ in 0..5 {
        assert!(h.engine.guard(&ctx).allowed);
    }
    assert_eq!(h.engine.guard(&ctx).reason, Some(DenyReason::RateLimited));

    h.clock.advance(Duration::from_millis(60_000));
    for _ in 0..5 {
        assert!(h.engine.guard(&ctx).allowed);
    }
    assert_eq!(h.engine.guard(&ctx).reason, Some(DenyReason::RateLimited));
}

#[test]
fn test_block_outlives_window_reset() {
    let h = common::harness_with_rules(vec![common::login_rule()]);
    let ctx = ActionContext::new("user:42", "login");
    for _ in 0..10 {
        h.engine.guard(&ctx);
    }

    // Well past the rate window, still inside the 15 minute penalty.
    for minutes in [1, 5, 14] {
        h.clock.set(common::START_MS + minutes * 60_000);
        assert_eq!(h.engine.guard(&ctx).reason, Some(DenyReason::Blocked));
    }

    h.clock.set(common::START_MS + 900_001);
    assert!(h.engine.guard(&ctx).allowed);
}

#[test]
fn test_other_actors_unaffected() {
    let h = common::harness_with_rules(vec![common::login_rule()]);
    for _ in 0..10 {
        h.engine.guard(&ActionContext::new("user:bad", "login"));
    }
    assert!(h.engine.guard(&ActionContext::new("user:good", "login")).allowed);
    assert_eq!(
        h.engine.guard(&ActionContext::new("user:bad", "signup")).reason,
        Some(DenyReason::Blocked)
    );
}

#[test]
fn test_rate_events_escalate() {
    let h = common::harness_with_rules(vec![common::login_rule()]);
    let ctx = ActionContext::new("user:42", "login");
    for _ in 0..10 {
        h.engine.guard(&ctx);
    }

    let stats = h.engine.event_stats(Duration::from_secs(60));
    assert_eq!(stats.total_count, 5);
    assert_eq!(stats.counts_by_type.get(&EventKind::RateExceeded), Some(&5));
    assert_eq!(stats.counts_by_severity.get(&Severity::Medium), Some(&4));
    assert_eq!(stats.counts_by_severity.get(&Severity::High), Some(&1));

    let newest = &h.engine.recent_events(1)[0];
    assert!(newest.blocked);
    match &newest.details {
        EventDetails::RateExceeded {
            attempts,
            max_attempts,
            ..
        } => {
            assert_eq!(*attempts, 10);
            assert_eq!(*max_attempts, 5);
        }
        other => panic!("unexpected details {other:?}"),
    }
}

#[test]
fn test_content_rejected_after_rate_check() {
    let h = common::harness_with_rules(vec![Rule {
        id: "forms".into(),
        action_type: "form_submit".into(),
        max_attempts: 2,
        auto_block_enabled: false,
        ..common::login_rule()
    }]);
    let hostile = ActionContext::new("user:5", "form_submit")
        .with_payload("<img src=x onerror=alert(document.cookie)>");

    assert_eq!(h.engine.guard(&hostile).reason, Some(DenyReason::ContentRejected));
    assert_eq!(h.engine.guard(&hostile).reason, Some(DenyReason::ContentRejected));
    // The rate check runs first, so the third attempt is throttled.
    assert_eq!(h.engine.guard(&hostile).reason, Some(DenyReason::RateLimited));

    let injections = h
        .engine
        .recent_events(10)
        .into_iter()
        .filter(|e| e.kind == EventKind::ContentInjectionAttempt)
        .count();
    assert_eq!(injections, 2);
}

#[test]
fn test_state_tampering_report_blocks_device() {
    let h = common::harness_with_rules(vec![]);
    h.engine.record_event(
        Severity::Critical,
        "client-storage",
        Some("device:f00d".into()),
        EventDetails::StateTamperingAttempt {
            storage_key: "session_role".into(),
            description: "role changed from tenant to admin".into(),
        },
    );
    assert!(h.engine.is_blocked("device:f00d"));

    h.engine.record_event(
        Severity::Medium,
        "session",
        Some("device:beef".into()),
        EventDetails::SessionAnomaly {
            description: "session resumed from a new country".into(),
        },
    );
    assert!(!h.engine.is_blocked("device:beef"));
}

#[test]
fn test_concurrent_guard_never_overshoots() {
    let mut rule = common::login_rule();
    rule.max_attempts = 100;
    rule.auto_block_enabled = false;
    let h = common::harness_with_rules(vec![rule]);
    let allowed = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = h.engine.clone();
            let allowed = allowed.clone();
            std::thread::spawn(move || {
                let ctx = ActionContext::new("user:shared", "login");
                for _ in 0..50 {
                    if engine.guard(&ctx).allowed {
                        allowed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(allowed.load(Ordering::SeqCst), 100);
    assert_eq!(h.engine.recent_events(1000).len(), 300);
}
