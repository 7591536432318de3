//! Lenient JSON extraction from model output.
//!
//! Models are asked for bare JSON but frequently wrap it in a fenced block
//! (optionally tagged ```json). Everything here strips that wrapper, parses
//! strictly, and hands back the caller's fallback on any failure.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

static FENCED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A```(?:[A-Za-z0-9_+-]*[ \t]*\r?\n)?(.*?)\s*```\z").expect("static fence regex")
});

/// Remove one surrounding fenced block (with optional language tag).
/// Text without a complete surrounding fence is returned trimmed.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    match FENCED.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => {
            // Opening fence with no closing fence (truncated output)
            if let Some(rest) = trimmed.strip_prefix("```") {
                let body = rest
                    .split_once('\n')
                    .map(|(_, body)| body)
                    .unwrap_or(rest);
                return body.trim();
            }
            trimmed
        }
    }
}

/// Parse `text` as JSON, returning `fallback` unchanged if it is not valid.
pub fn parse_json(text: &str, fallback: Value) -> Value {
    match serde_json::from_str(strip_fences(text)) {
        Ok(value) => value,
        Err(e) => {
            warn!("model output is not valid JSON, using fallback: {}", e);
            fallback
        }
    }
}

/// Typed variant of [`parse_json`].
pub fn parse_json_as<T: DeserializeOwned>(text: &str, fallback: T) -> T {
    match serde_json::from_str(strip_fences(text)) {
        Ok(value) => value,
        Err(e) => {
            warn!("model output did not match the expected shape, using fallback: {}", e);
            fallback
        }
    }
}
