//! Request throttling subsystem.
//!
//! # Data Flow
//! ```text
//! guard(action):
//!     → window.rs (observe "{rule_id}:{actor_key}", compare with max_attempts)
//!     → escalation controller decides allow / rate_limited / block
//!
//! Background:
//!     sweeper.rs ticks every engine.sweep_interval_secs
//!     → drops stale windows, expired blocks, expired CSRF tokens
//! ```
//!
//! # Design Decisions
//! - Fixed windows: O(1) memory and time per key, up to 2x max_attempts
//!   across a boundary is accepted
//! - Per-key locking through DashMap shards; no global lock on the hot path
//! - Sweeping is garbage collection only: a swept key restarts at count 1,
//!   exactly like a fresh key

pub mod sweeper;
pub mod window;

pub use sweeper::Sweeper;
pub use window::{WindowCounter, WindowEntry};
