//! Adaptive rate-limiting and threat-detection engine.
//!
//! Build one [`GuardEngine`] at startup, share it by `Arc`, and call
//! [`GuardEngine::guard`] on every sensitive action.

pub mod admin;
pub mod config;
pub mod detection;
pub mod engine;
pub mod escalation;
pub mod events;
pub mod lifecycle;
pub mod limiter;
pub mod observability;
pub mod rules;
pub mod security;
pub mod time;

pub use config::GuardConfig;
pub use engine::GuardEngine;
pub use escalation::{ActionContext, Decision, DenyReason};
pub use lifecycle::Shutdown;
