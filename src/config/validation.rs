//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of global settings (serde handles syntactic)
//! - Validate value ranges (capacities > 0, addresses parse)
//! - Report rule problems without failing the whole config
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Global settings errors are fatal; rule errors only drop the rule

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{AlertSinkConfig, GuardConfig, PLACEHOLDER_API_KEY};
use crate::rules::{Rule, RuleError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} is not a valid socket address: {value}")]
    BadAddress { field: &'static str, value: String },
    #[error("admin.api_key must be set to a real secret when the admin API is enabled")]
    WeakApiKey,
    #[error("alert webhook url must be an absolute http(s) url with a host: {0}")]
    BadWebhookUrl(String),
    #[error("alert file sink path must not be empty")]
    EmptySinkPath,
}

/// Validate everything except the rules.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.engine.event_log_capacity == 0 {
        errors.push(ValidationError::Zero { field: "engine.event_log_capacity" });
    }
    if config.engine.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "engine.sweep_interval_secs" });
    }
    if config.engine.critical_block_secs == 0 {
        errors.push(ValidationError::Zero { field: "engine.critical_block_secs" });
    }
    if config.alerts.queue_capacity == 0 {
        errors.push(ValidationError::Zero { field: "alerts.queue_capacity" });
    }

    for sink in &config.alerts.sinks {
        match sink {
            AlertSinkConfig::Log => {}
            AlertSinkConfig::File { path } => {
                if path.trim().is_empty() {
                    errors.push(ValidationError::EmptySinkPath);
                }
            }
            AlertSinkConfig::Webhook { url, timeout_secs } => {
                if !is_webhook_url(url) {
                    errors.push(ValidationError::BadWebhookUrl(url.clone()));
                }
                if *timeout_secs == 0 {
                    errors.push(ValidationError::Zero { field: "alerts.sinks.timeout_secs" });
                }
            }
        }
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::WeakApiKey);
        }
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Problems that will keep individual rules out of the rule store.
pub fn validate_rules(rules: &[Rule]) -> Vec<RuleError> {
    let mut seen = std::collections::HashSet::new();
    rules
        .iter()
        .filter_map(|rule| match rule.validate() {
            Err(e) => Some(e),
            Ok(()) if !seen.insert(rule.id.as_str()) => {
                Some(RuleError::DuplicateId(rule.id.clone()))
            }
            Ok(()) => None,
        })
        .collect()
}

fn is_webhook_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&GuardConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GuardConfig::default();
        config.engine.event_log_capacity = 0;
        config.admin.enabled = true;
        config.admin.bind_address = "nowhere".into();
        config.alerts.sinks.push(AlertSinkConfig::Webhook {
            url: "ftp://x".into(),
            timeout_secs: 5,
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::WeakApiKey));
        assert!(errors.contains(&ValidationError::Zero { field: "engine.event_log_capacity" }));
    }

    #[test]
    fn test_webhook_url_must_be_usable() {
        for bad in ["http://", "https://exa mple.com/hook", "hooks.example.com", "ftp://x"] {
            let mut config = GuardConfig::default();
            config.alerts.sinks = vec![AlertSinkConfig::Webhook {
                url: bad.into(),
                timeout_secs: 5,
            }];
            assert_eq!(
                validate_config(&config),
                Err(vec![ValidationError::BadWebhookUrl(bad.into())]),
                "{bad}"
            );
        }

        let mut config = GuardConfig::default();
        config.alerts.sinks = vec![AlertSinkConfig::Webhook {
            url: "https://hooks.example.com:8443/guard?team=sec".into(),
            timeout_secs: 5,
        }];
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_rule_problems_reported() {
        let rule = Rule {
            id: "r".into(),
            name: String::new(),
            action_type: "login".into(),
            target_type: crate::rules::TargetType::Identity,
            window_ms: 1000,
            max_attempts: 3,
            penalty_ms: 0,
            auto_block_enabled: false,
            auto_block_threshold: 0,
            notify_on_block: false,
            active: true,
        };
        let mut bad = rule.clone();
        bad.id = "bad".into();
        bad.max_attempts = 0;

        let errors = validate_rules(&[rule.clone(), bad, rule]);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], RuleError::ZeroAttempts(_)));
        assert!(matches!(errors[1], RuleError::DuplicateId(_)));
    }
}
