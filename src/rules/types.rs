//! Rule definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The dimension a rule is keyed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Identity,
    Origin,
    EmailDomain,
    DeviceFingerprint,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TargetType::Identity => "identity",
            TargetType::Origin => "origin",
            TargetType::EmailDomain => "email_domain",
            TargetType::DeviceFingerprint => "device_fingerprint",
        };
        f.write_str(s)
    }
}

/// A named throttling policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Action this rule applies to (e.g. "login", "signup", "password_reset").
    pub action_type: String,

    #[serde(default = "default_target")]
    pub target_type: TargetType,

    pub window_ms: u64,

    pub max_attempts: u32,

    /// How long an auto-block lasts.
    #[serde(default)]
    pub penalty_ms: u64,

    #[serde(default)]
    pub auto_block_enabled: bool,

    /// Attempts within one window at which the key is blocked.
    #[serde(default)]
    pub auto_block_threshold: u32,

    #[serde(default)]
    pub notify_on_block: bool,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_target() -> TargetType {
    TargetType::Identity
}

fn default_active() -> bool {
    true
}

/// Why a rule was refused at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule id must not be empty")]
    EmptyId,
    #[error("rule {0}: action_type must not be empty")]
    EmptyAction(String),
    #[error("rule {0}: window_ms must be greater than zero")]
    ZeroWindow(String),
    #[error("rule {0}: max_attempts must be at least 1")]
    ZeroAttempts(String),
    #[error("rule {id}: auto_block_threshold {threshold} is below max_attempts {max_attempts}")]
    UnreachableThreshold {
        id: String,
        threshold: u32,
        max_attempts: u32,
    },
    #[error("rule {0}: auto-block needs a penalty_ms greater than zero")]
    ZeroPenalty(String),
    #[error("rule {0}: duplicate id")]
    DuplicateId(String),
}

impl Rule {
    /// Check the invariants an evaluable rule must hold.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.id.trim().is_empty() {
            return Err(RuleError::EmptyId);
        }
        if self.action_type.trim().is_empty() {
            return Err(RuleError::EmptyAction(self.id.clone()));
        }
        if self.window_ms == 0 {
            return Err(RuleError::ZeroWindow(self.id.clone()));
        }
        if self.max_attempts == 0 {
            return Err(RuleError::ZeroAttempts(self.id.clone()));
        }
        if self.auto_block_enabled {
            if self.auto_block_threshold < self.max_attempts {
                return Err(RuleError::UnreachableThreshold {
                    id: self.id.clone(),
                    threshold: self.auto_block_threshold,
                    max_attempts: self.max_attempts,
                });
            }
            if self.penalty_ms == 0 {
                return Err(RuleError::ZeroPenalty(self.id.clone()));
            }
        }
        Ok(())
    }

    /// Window key for an actor under this rule.
    pub fn window_key(&self, actor_key: &str) -> String {
        format!("{}:{}", self.id, actor_key)
    }

    /// Attempt count at which a violation escalates to high severity.
    ///
    /// Without auto-block configured there is no escalation point.
    pub fn escalation_point(&self) -> Option<u32> {
        (self.auto_block_threshold >= self.max_attempts && self.auto_block_threshold > 0)
            .then_some(self.auto_block_threshold)
    }
}

#[cfg(test)]
pub(crate) fn login_rule() -> Rule {
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
