//! Security event subsystem.
//!
//! # Data Flow
//! ```text
//! Escalation controller / CSRF guard / authorization guard / record_event()
//!     → types.rs (SecurityEvent with typed details)
//!     → log.rs (bounded ring buffer: recent(), stats_since())
//!     → sink.rs (high/critical events and block notices queued for delivery)
//!         → AlertDispatcher task → log / file / webhook sinks
//! ```
//!
//! # Design Decisions
//! - Events are immutable once recorded
//! - The ring buffer is a memory bound; eviction of the oldest entry is silent
//! - Delivery is fire-and-forget: a full queue or a failing sink never
//!   reaches the caller of guard()

pub mod log;
pub mod sink;
pub mod types;

pub use log::{EventLog, EventStats};
pub use sink::{Alert, AlertDispatcher, AlertQueue, BlockNotice, SinkError};
pub use types::{EventDetails, EventKind, SecurityEvent, Severity};
