//! Coarse intent classification of a raw prompt.
//!
//! Pure keyword matching (case-insensitive substring). The generation
//! instructions ask the model to repeat this classification itself; this
//! local version only drives deterministic choices such as the synthetic
//! output-format question.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Image,
    Text,
    Research,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Image => "image generation",
            Intent::Text => "text / chat",
            Intent::Research => "search / research",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const IMAGE_KEYWORDS: &[&str] = &[
    "draw",
    "paint",
    "illustrate",
    "generate an image",
    "generate image",
    "create an image",
    "create a picture",
    "make an image",
    "make a picture",
    "sketch",
    "render",
    "design an image",
    "image of",
    "picture of",
    "photo of",
    "artwork",
];

pub const RESEARCH_KEYWORDS: &[&str] = &[
    "find",
    "research",
    "what is",
    "what are",
    "look up",
    "sources on",
    "latest news",
];

/// Classify `text`; image phrases take precedence over research phrases.
pub fn classify_keywords(text: &str) -> Intent {
    let lower = text.to_lowercase();
    if IMAGE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Intent::Image
    } else if RESEARCH_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Intent::Research
    } else {
        Intent::Text
    }
}
