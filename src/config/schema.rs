//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from the TOML file.

use serde::{Deserialize, Serialize};

use crate::events::Severity;
use crate::rules::Rule;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Engine-wide limits and timings.
    pub engine: EngineConfig,

    /// CSRF token behavior.
    pub csrf: CsrfConfig,

    /// Alert forwarding (event sink and block notifications).
    pub alerts: AlertsConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Throttling rules. Invalid entries are skipped at load time.
    pub rules: Vec<Rule>,
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ring buffer size of the security event log.
    pub event_log_capacity: usize,

    /// How often stale windows, blocks, and tokens are swept.
    pub sweep_interval_secs: u64,

    /// Block duration applied to the subject of a critical event.
    pub critical_block_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_log_capacity: 1000,
            sweep_interval_secs: 30,
            critical_block_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Consume a token on its first successful validation.
    pub single_use: bool,

    /// Token lifetime in seconds. 0 disables expiry, and the sweeper then
    /// never evicts tokens: sessions must call `revoke_csrf_token` on logout
    /// or the token map grows with every session ever seen.
    pub token_ttl_secs: u64,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            single_use: false,
            token_ttl_secs: 86_400,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Pending alerts held before new ones are dropped.
    pub queue_capacity: usize,

    /// Lowest event severity forwarded to the sinks.
    pub min_severity: Severity,

    pub sinks: Vec<AlertSinkConfig>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            min_severity: Severity::High,
            sinks: vec![AlertSinkConfig::Log],
        }
    }
}

/// An alert destination.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertSinkConfig {
    /// Emit alerts through tracing.
    Log,

    /// Append alerts as JSON lines.
    File { path: String },

    /// POST each alert as JSON.
    Webhook {
        url: String,
        #[serde(default = "default_webhook_timeout")]
        timeout_secs: u64,
    },
}

fn default_webhook_timeout() -> u64 {
    5
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
