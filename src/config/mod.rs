//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks on global settings)
//!     → GuardConfig (validated, immutable)
//!     → GuardEngine::builder
//!
//! On reload (file change, SIGHUP, admin API):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → GuardEngine::reload_rules swaps the rule set
//! ```
//!
//! # Design Decisions
//! - Only rules are hot-reloaded; other settings need a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AlertSinkConfig, AlertsConfig, CsrfConfig, EngineConfig, GuardConfig, LogFormat,
    ObservabilityConfig,
};
