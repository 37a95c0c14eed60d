//! Structured-output recovery
//!
//! Recovers one JSON object from free-form generator text. The cascade is
//! plain data: an ordered table of candidate extractors. Every candidate gets
//! a strict parse and then one [`repair_json`] pass; the first candidate that
//! yields a JSON *object* wins.
//!
//! Recovery never fails loudly: malformed input yields `None`.

use crate::repair::repair_json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// The whole normalized text.
    WholeText,
    /// The body of a fenced code block.
    FencedBlock,
    /// First `{` through last `}`.
    BraceSpan,
    /// The first brace-balanced object.
    BalancedObject,
}

impl RecoveryStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WholeText => "whole_text",
            Self::FencedBlock => "fenced_block",
            Self::BraceSpan => "brace_span",
            Self::BalancedObject => "balanced_object",
        }
    }
}

impl std::fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type CandidateFn = fn(&str) -> Vec<&str>;

/// Candidate extractors in the order they are tried.
pub const STRATEGIES: &[(RecoveryStrategy, CandidateFn)] = &[
    (RecoveryStrategy::WholeText, whole_text),
    (RecoveryStrategy::FencedBlock, fenced_blocks),
    (RecoveryStrategy::BraceSpan, brace_span),
    (RecoveryStrategy::BalancedObject, balanced_object),
];

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredObject {
    pub object: Map<String, Value>,
    pub strategy: RecoveryStrategy,
    /// Whether the object only parsed after the repair pass.
    pub repaired: bool,
}

impl RecoveredObject {
    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }
}

/// Typographic quotes to ASCII, leading BOM stripped, trimmed.
pub fn normalize(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.trim()
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{FF02}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            c => c,
        })
        .collect()
}

/// Recover the first JSON object from `text`, or `None`.
pub fn recover_object(text: &str) -> Option<RecoveredObject> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return None;
    }

    for (strategy, extract) in STRATEGIES {
        for candidate in extract(&normalized) {
            let candidate = candidate.trim();
            if candidate.is_empty() {
                continue;
            }
            if let Some(object) = parse_object(candidate) {
                debug!(strategy = %strategy, "recovered object");
                return Some(RecoveredObject {
                    object,
                    strategy: *strategy,
                    repaired: false,
                });
            }
            if let Some(object) = parse_object(&repair_json(candidate)) {
                debug!(strategy = %strategy, "recovered object after repair");
                return Some(RecoveredObject {
                    object,
                    strategy: *strategy,
                    repaired: true,
                });
            }
        }
    }
    None
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

// ============================================================================
// Candidate extractors
// ============================================================================

fn whole_text(text: &str) -> Vec<&str> {
    vec![text]
}

/// Bodies of ```` ``` ```` fences. An unterminated final fence (a response cut
/// off mid-block) yields everything after its opener.
fn fenced_blocks(text: &str) -> Vec<&str> {
    const FENCE: &str = "```";
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after = &rest[open + FENCE.len()..];
        // Skip an info string such as `json`.
        let tag_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(after.len());
        let body = &after[tag_len..];

        match body.find(FENCE) {
            Some(close) => {
                out.push(&body[..close]);
                rest = &body[close + FENCE.len()..];
            }
            None => {
                out.push(body);
                break;
            }
        }
    }
    out
}

fn brace_span(text: &str) -> Vec<&str> {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => vec![&text[start..=end]],
        (Some(start), _) => vec![&text[start..]],
        _ => Vec::new(),
    }
}

/// The first complete object, balancing braces outside strings.
fn balanced_object(text: &str) -> Vec<&str> {
    let Some(start) = text.find('{') else {
        return Vec::new();
    };

    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escape = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return vec![&text[start..start + offset + 1]];
                }
            }
            _ => {}
        }
    }
    Vec::new()
}
