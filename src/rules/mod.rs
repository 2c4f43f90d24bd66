//! Throttling policy subsystem.
//!
//! # Data Flow
//! ```text
//! [[rules]] in config file
//!     → loader (parse)
//!     → Rule::validate (invariants)
//!     → RuleStore::replace (atomic swap, invalid rules dropped)
//!     → EscalationController::guard reads matching active rules
//! ```
//!
//! # Design Decisions
//! - The engine never writes rules back; the file is the rule source
//! - An invalid rule is rejected on its own, the rest still load
//! - No matching rule means allow: over-restriction is always explicit

pub mod store;
pub mod types;

pub use store::{LoadReport, RuleStore};
pub use types::{Rule, RuleError, TargetType};
