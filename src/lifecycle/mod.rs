//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build engine → Spawn sweeper, alert
//!     dispatcher, rule watcher → Start admin API
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Reload rules from the config file
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → background tasks exit their loops → queued alerts flushed
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then engine, then background tasks
//! - Fail fast: any startup error is fatal
//! - A bad reload never replaces the rules in force

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
