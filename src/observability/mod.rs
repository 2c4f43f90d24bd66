//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (decision counters, event counters, table gauges)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured fields on every log line (actor, rule, kind, severity)
//! - Metric updates are cheap and never fail; with no recorder installed
//!   they are no-ops, which keeps the engine usable as a plain library

pub mod logging;
pub mod metrics;
