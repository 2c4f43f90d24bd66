//! Request integrity and privilege checks.
//!
//! # Data Flow
//! ```text
//! Form submit:
//!     → csrf.rs (session token, constant-time compare)
//!     → failure recorded as forged_request_attempt (high)
//!
//! Privileged action:
//!     → authorization.rs (rank(caller) >= rank(required))
//!     → failure recorded as privilege_escalation_attempt (high)
//! ```
//!
//! # Design Decisions
//! - Unknown caller roles rank 0, below every real role
//! - An unknown required role refuses every caller
//! - The caller's role is trusted input; authentication happens upstream
//! - Both guards are pure checks here; the engine records the events

pub mod authorization;
pub mod csrf;

pub use authorization::{is_authorized, rank, Role, UnknownRole};
pub use csrf::CsrfGuard;
