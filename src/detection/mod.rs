//! Content threat detection.
//!
//! The classifier signals threats; it never rewrites content. Callers that
//! want to continue with cleaned input hand the text to their own sanitizer
//! after looking at the [`Verdict`].

pub mod classifier;

pub use classifier::{ContentClassifier, ThreatPattern, Verdict};
