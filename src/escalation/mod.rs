//! Escalation subsystem: the decision point for every guarded action.
//!
//! # Data Flow
//! ```text
//! ActionContext { actor_key, action_type, target_type?, payload? }
//!     → blocks.rs: active block? → deny "blocked" (no new event)
//!     → RuleStore::matching → WindowCounter::observe per rule
//!         any rule over max_attempts → rate_exceeded event
//!             count >= auto_block_threshold → severity high, Block, notify
//!         → deny "rate_limited"
//!     → ContentClassifier on payload → content_injection_attempt (high)
//!         → deny "content_rejected"
//!     → allow
//! ```
//!
//! # Design Decisions
//! - Policy violations are values, never errors
//! - Most restrictive wins across rules for the same action
//! - The auto-block threshold counts attempts in the rule's own window
//! - Critical events block their subject whether or not a rule matched

pub mod blocks;
pub mod controller;

pub use blocks::{Block, BlockList};
pub use controller::{ActionContext, Decision, DenyReason, EscalationController};
