//! Pattern-table classifier for markup and script injection.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The independent checks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatPattern {
    ScriptTag,
    ScriptUri,
    InlineEventHandler,
    MarkupDataUri,
    EmbeddedObject,
    CssExpression,
}

impl ThreatPattern {
    pub const ALL: [ThreatPattern; 6] = [
        ThreatPattern::ScriptTag,
        ThreatPattern::ScriptUri,
        ThreatPattern::InlineEventHandler,
        ThreatPattern::MarkupDataUri,
        ThreatPattern::EmbeddedObject,
        ThreatPattern::CssExpression,
    ];

    fn pattern(self) -> &'static str {
        match self {
            ThreatPattern::ScriptTag => r"(?i)<\s*/?\s*script\b",
            ThreatPattern::ScriptUri => r"(?i)\b(?:java|vb)script\s*:",
            ThreatPattern::InlineEventHandler => r#"(?i)<[^>]*[\s/"']on[a-z]+\s*="#,
            ThreatPattern::MarkupDataUri => r"(?i)\bdata\s*:\s*(?:text/html|image/svg\+xml)",
            ThreatPattern::EmbeddedObject => r"(?i)<\s*(?:iframe|object|embed)\b",
            ThreatPattern::CssExpression => r"(?i)\bexpression\s*\(|@import\b",
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            ThreatPattern::ScriptTag => "script tag detected",
            ThreatPattern::ScriptUri => "javascript/vbscript URI detected",
            ThreatPattern::InlineEventHandler => "inline event handler attribute detected",
            ThreatPattern::MarkupDataUri => "HTML or SVG data URI detected",
            ThreatPattern::EmbeddedObject => "iframe/object/embed tag detected",
            ThreatPattern::CssExpression => "CSS expression() or @import detected",
        }
    }
}

/// Outcome of classifying one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub suspicious: bool,
    pub reasons: Vec<String>,
    pub matched: Vec<ThreatPattern>,
}

impl Verdict {
    pub fn clean() -> Self {
        Self::default()
    }
}

/// Compiled pattern table. Holds no mutable state; share it freely.
#[derive(Debug)]
pub struct ContentClassifier {
    checks: Vec<(ThreatPattern, Regex)>,
}

impl ContentClassifier {
    pub fn new() -> Self {
        let checks = ThreatPattern::ALL
            .iter()
            .filter_map(|&p| match Regex::new(p.pattern()) {
                Ok(re) => Some((p, re)),
                Err(e) => {
                    tracing::error!(pattern = ?p, error = %e, "Failed to compile threat pattern");
                    None
                }
            })
            .collect();
        Self { checks }
    }

    /// Run every check; each match contributes its reason.
    pub fn classify(&self, text: &str) -> Verdict {
        let matched: Vec<ThreatPattern> = self
            .checks
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(p, _)| *p)
            .collect();

        Verdict {
            suspicious: !matched.is_empty(),
            reasons: matched.iter().map(|p| p.reason().to_string()).collect(),
            matched,
        }
    }
}

impl Default for ContentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
