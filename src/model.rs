//! Data shapes passed between the analyzer, question generator, builder and
//! the session wizard.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::profiles::Profile;

/// Key of the synthetic "desired output format" question/answer.
pub const OUTPUT_FORMAT_KEY: &str = "desired_output_format";

/// User answers keyed by component (plus [`OUTPUT_FORMAT_KEY`]).
pub type AnswerMap = BTreeMap<String, String>;

/// Detection result: every component of one profile mapped to the snippet
/// found in the raw prompt, or `None` when absent.
///
/// Only constructible through [`ComponentMap::backfilled`] /
/// [`ComponentMap::all_absent`], so the key set always equals the profile's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentMap {
    entries: BTreeMap<String, Option<String>>,
}

impl ComponentMap {
    pub fn all_absent(profile: &Profile) -> Self {
        Self {
            entries: profile
                .components
                .iter()
                .map(|c| (c.clone(), None))
                .collect(),
        }
    }

    /// Build a map for `profile` from untrusted parsed output.
    ///
    /// Unknown keys are dropped, missing keys become `None`, and anything
    /// that is not a non-blank string counts as absent.
    pub fn backfilled(profile: &Profile, parsed: &Value) -> Self {
        let object = parsed.as_object();
        let entries = profile
            .components
            .iter()
            .map(|key| {
                let found = object
                    .and_then(|o| o.get(key))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                (key.clone(), found)
            })
            .collect();
        Self { entries }
    }

    /// True before any analysis has run (no keys at all)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|v| v.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Present components in profile order
    pub fn present<'a>(&'a self, profile: &'a Profile) -> Vec<(&'a str, &'a str)> {
        profile
            .components
            .iter()
            .filter_map(|k| self.get(k).map(|v| (k.as_str(), v)))
            .collect()
    }

    /// Missing components in profile order
    pub fn missing<'a>(&self, profile: &'a Profile) -> Vec<&'a str> {
        profile
            .components
            .iter()
            .filter(|k| self.get(k).is_none())
            .map(String::as_str)
            .collect()
    }

    pub fn has_missing(&self) -> bool {
        self.entries.values().any(Option::is_none)
    }

    pub fn coverage_percent(&self) -> u8 {
        if self.entries.is_empty() {
            return 0;
        }
        let present = self.entries.values().filter(|v| v.is_some()).count();
        (present * 100 / self.entries.len()) as u8
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.entries).unwrap_or(Value::Null)
    }
}

fn default_placeholder() -> String {
    "Type your answer here...".to_string()
}

/// One clarifying question for a missing or weak component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarifyingQuestion {
    #[serde(default)]
    pub component: String,
    pub question: String,
    /// Ready-to-accept candidate answer inferred from the raw prompt
    #[serde(default)]
    pub inferred_example: String,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl ClarifyingQuestion {
    pub fn new(component: &str, question: &str, inferred_example: &str) -> Self {
        Self {
            component: component.to_string(),
            question: question.to_string(),
            inferred_example: inferred_example.to_string(),
            placeholder: default_placeholder(),
        }
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    /// Lenient conversion from one element of a model-produced array.
    /// Returns `None` unless the element is an object with a string `question`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let question = obj.get("question")?.as_str()?.trim();
        if question.is_empty() {
            return None;
        }
        let text = |field: &str| {
            obj.get(field)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        };
        Some(Self {
            component: text("component").unwrap_or_default(),
            question: question.to_string(),
            inferred_example: text("inferred_example").unwrap_or_default(),
            placeholder: text("placeholder")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(default_placeholder),
        })
    }
}
