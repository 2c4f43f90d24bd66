//! Security event model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ContentInjectionAttempt,
    ForgedRequestAttempt,
    RateExceeded,
    BruteForceAttempt,
    PrivilegeEscalationAttempt,
    StateTamperingAttempt,
    SessionAnomaly,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ContentInjectionAttempt => "content_injection_attempt",
            EventKind::ForgedRequestAttempt => "forged_request_attempt",
            EventKind::RateExceeded => "rate_exceeded",
            EventKind::BruteForceAttempt => "brute_force_attempt",
            EventKind::PrivilegeEscalationAttempt => "privilege_escalation_attempt",
            EventKind::StateTamperingAttempt => "state_tampering_attempt",
            EventKind::SessionAnomaly => "session_anomaly",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a CSRF check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsrfFailure {
    /// No token was issued for the session.
    Missing,
    Mismatch,
    Expired,
}

/// Per-kind structured details. The variant determines the event kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetails {
    ContentInjectionAttempt {
        action_type: String,
        reasons: Vec<String>,
    },
    ForgedRequestAttempt {
        session_id: String,
        failure: CsrfFailure,
    },
    RateExceeded {
        action_type: String,
        rule_ids: Vec<String>,
        attempts: u32,
        max_attempts: u32,
    },
    BruteForceAttempt {
        action_type: String,
        attempts: u32,
    },
    PrivilegeEscalationAttempt {
        caller_role: String,
        required_role: String,
        action: String,
    },
    StateTamperingAttempt {
        storage_key: String,
        description: String,
    },
    SessionAnomaly {
        description: String,
    },
}

impl EventDetails {
    pub fn kind(&self) -> EventKind {
        match self {
            EventDetails::ContentInjectionAttempt { .. } => EventKind::ContentInjectionAttempt,
            EventDetails::ForgedRequestAttempt { .. } => EventKind::ForgedRequestAttempt,
            EventDetails::RateExceeded { .. } => EventKind::RateExceeded,
            EventDetails::BruteForceAttempt { .. } => EventKind::BruteForceAttempt,
            EventDetails::PrivilegeEscalationAttempt { .. } => {
                EventKind::PrivilegeEscalationAttempt
            }
            EventDetails::StateTamperingAttempt { .. } => EventKind::StateTamperingAttempt,
            EventDetails::SessionAnomaly { .. } => EventKind::SessionAnomaly,
        }
    }
}

/// A classified incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub severity: Severity,
    /// Component or boundary that reported the event.
    pub source: String,
    pub subject_id: Option<String>,
    pub details: EventDetails,
    /// Epoch milliseconds.
    pub occurred_at: u64,
    pub blocked: bool,
}

impl SecurityEvent {
    pub fn new(
        severity: Severity,
        source: impl Into<String>,
        subject_id: Option<String>,
        details: EventDetails,
        occurred_at: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: details.kind(),
            severity,
            source: source.into(),
            subject_id,
            details,
            occurred_at,
            blocked: false,
        }
    }

    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_details() {
        let event = SecurityEvent::new(
            Severity::High,
            "authorization",
            Some("user:7".into()),
            EventDetails::PrivilegeEscalationAttempt {
                caller_role: "tenant".into(),
                required_role: "admin".into(),
                action: "delete_listing".into(),
            },
            42,
        );
        assert_eq!(event.kind, EventKind::PrivilegeEscalationAttempt);
        assert!(!event.blocked);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_details_json_is_tagged() {
        let details = EventDetails::SessionAnomaly {
            description: "token reused from new device".into(),
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["kind"], "session_anomaly");
        let back: EventDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back, details);
    }
}
