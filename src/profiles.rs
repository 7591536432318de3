//! Target-model profiles.
//!
//! Each profile describes how a target LLM's prompting framework is shaped:
//! which components it recognises, how they are labelled, and the free-form
//! structure/style guidance that is pasted verbatim into generation
//! instructions. Every other module reads target-specific behavior from these
//! fields only; nothing outside this file matches on a target name.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::util::humanize_key;

/// How the target expects the final prompt to be laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Structure {
    XmlTags,
    BoldHeaders,
    MarkdownHeaders,
    ResearchDirective,
}

impl Structure {
    pub fn describe(&self) -> &'static str {
        match self {
            Structure::XmlTags => "one XML tag per section (<role>, <task>, ...)",
            Structure::BoldHeaders => "bold **Headers** separating sections",
            Structure::MarkdownHeaders => "## Markdown headers, directive last",
            Structure::ResearchDirective => {
                "a single focused research directive, no persona and no examples"
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    /// Ordered component keys the target's framework recognises
    pub components: Vec<String>,
    pub labels: BTreeMap<String, String>,
    /// One-line summary shown next to the target selector
    pub style_hint: String,
    /// Structure/style guidance used verbatim in system instructions
    pub special: String,
    /// Persona lead-in, e.g. "Act as [expert]." (None for non-persona targets)
    pub role_framing: Option<String>,
    pub cot_phrase: Option<String>,
    pub structure: Structure,
    pub avoid: Vec<String>,
}

impl Profile {
    pub fn new(id: &str, style_hint: &str, structure: Structure, special: &str) -> Self {
        Self {
            id: id.to_string(),
            components: Vec::new(),
            labels: BTreeMap::new(),
            style_hint: style_hint.to_string(),
            special: special.to_string(),
            role_framing: None,
            cot_phrase: None,
            structure,
            avoid: Vec::new(),
        }
    }

    pub fn component(mut self, key: &str, label: &str) -> Self {
        self.components.push(key.to_string());
        self.labels.insert(key.to_string(), label.to_string());
        self
    }

    pub fn role(mut self, framing: &str) -> Self {
        self.role_framing = Some(framing.to_string());
        self
    }

    pub fn cot(mut self, phrase: &str) -> Self {
        self.cot_phrase = Some(phrase.to_string());
        self
    }

    pub fn avoid(mut self, phrases: &[&str]) -> Self {
        self.avoid = phrases.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn has_component(&self, key: &str) -> bool {
        self.components.iter().any(|c| c == key)
    }

    /// Display label for a component key, humanised if the key is unknown
    pub fn label(&self, key: &str) -> String {
        self.labels
            .get(key)
            .cloned()
            .unwrap_or_else(|| humanize_key(key))
    }

    /// Check the components/labels invariant: identical key sets, no duplicates.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let keys: BTreeSet<&str> = self.components.iter().map(String::as_str).collect();
        if keys.len() != self.components.len() {
            return Err(RegistryError::DuplicateComponent(self.id.clone()));
        }
        let labelled: BTreeSet<&str> = self.labels.keys().map(String::as_str).collect();
        if keys != labelled {
            return Err(RegistryError::LabelMismatch(self.id.clone()));
        }
        if self.components.is_empty() {
            return Err(RegistryError::NoComponents(self.id.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown target LLM: {0}")]
pub struct UnknownTargetError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("profile {0} has component keys that do not match its labels")]
    LabelMismatch(String),
    #[error("profile {0} lists the same component twice")]
    DuplicateComponent(String),
    #[error("profile {0} has no components")]
    NoComponents(String),
    #[error("profile {0} is registered twice")]
    DuplicateProfile(String),
}

#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<Profile>,
}

impl ProfileRegistry {
    /// Build a registry from arbitrary profiles, validating each one.
    pub fn with_profiles(profiles: Vec<Profile>) -> Result<Self, RegistryError> {
        let mut seen = BTreeSet::new();
        for profile in &profiles {
            profile.validate()?;
            if !seen.insert(profile.id.as_str()) {
                return Err(RegistryError::DuplicateProfile(profile.id.clone()));
            }
        }
        Ok(Self { profiles })
    }

    pub fn builtin() -> Self {
        Self {
            profiles: builtin_profiles(),
        }
    }

    pub fn get(&self, target: &str) -> Result<&Profile, UnknownTargetError> {
        self.profiles
            .iter()
            .find(|p| p.id == target)
            .ok_or_else(|| UnknownTargetError(target.to_string()))
    }

    /// Target identifiers in registration order
    pub fn targets(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }
}

static BUILTIN: Lazy<ProfileRegistry> = Lazy::new(ProfileRegistry::builtin);

/// The process-wide read-only registry of built-in targets.
pub fn registry() -> &'static ProfileRegistry {
    &BUILTIN
}

pub fn get_profile(target: &str) -> Result<&'static Profile, UnknownTargetError> {
    BUILTIN.get(target)
}

fn builtin_profiles() -> Vec<Profile> {
    vec![
        Profile::new(
            "Claude",
            "XML tags · Full structure · Explain WHY · Chain-of-thought",
            Structure::XmlTags,
            "Use XML tags for every section. Explain the reasoning BEHIND each constraint \
             (e.g. 'Avoid jargon because the audience is non-technical'), not just the constraint itself. \
             Place instructions AFTER any long context blocks. \
             Be explicit about desired quality — Claude will not infer 'go beyond basics' without being told.",
        )
        .role("You are [expert].")
        .cot("Think through this carefully before responding.")
        .avoid(&["be thorough", "do not be lazy", "carefully"])
        .component("role", "Role (expert persona)")
        .component("task", "Task (objective)")
        .component("context", "Context (background + WHY it matters)")
        .component("examples", "Examples (few-shot demonstrations)")
        .component("output", "Output (format, length, structure)")
        .component("constraints", "Constraints (boundaries + reasoning)")
        .component("instructions", "Instructions (meta-guidance + CoT trigger)"),
        Profile::new(
            "ChatGPT",
            "Act as · Numbered steps · Few-shot + rules · Think step by step",
            Structure::BoldHeaders,
            "Start with 'Act as [expert persona].' \
             Use bold **Headers** to separate sections. \
             Pair EACH example with the explicit rule it demonstrates — examples alone are not enough. \
             Include 2–5 diverse examples. \
             End instructions with 'Think step by step.' \
             GPT-4 follows instructions very literally — be precise, avoid vague language.",
        )
        .role("Act as [expert].")
        .cot("Think step by step.")
        .avoid(&["vague adjectives", "ambiguous phrasing"])
        .component("persona", "Persona (Act as...)")
        .component("objective", "Objective (what to accomplish)")
        .component("context", "Context (background)")
        .component("steps", "Steps (numbered instructions)")
        .component("examples", "Examples (with paired rules)")
        .component("output_format", "Output Format (structure + length)")
        .component("chain_of_thought", "Chain-of-Thought (reasoning trigger)"),
        Profile::new(
            "Gemini",
            "## Markdown headers · Instructions LAST · Anchor phrase · Direct commands",
            Structure::MarkdownHeaders,
            "Use ## Markdown headers for each section. \
             Place the actual directive LAST, after all context — Gemini reasons better this way. \
             End with the anchor phrase: 'Based on the information above, [directive].' \
             Gemini 3 gives direct answers by default; explicitly request detail/length if needed. \
             Avoid filler words like 'please', 'carefully', 'I need you to' — use direct commands. \
             Use 2–3 examples maximum; too many cause overfitting.",
        )
        .role("You are [expert].")
        .avoid(&["please", "carefully", "I need you to", "could you"])
        .component("role", "Role")
        .component("background", "Background (rich context)")
        .component("task", "Task")
        .component("examples", "Examples (2–3 only)")
        .component("output_format", "Output Format"),
        Profile::new(
            "Perplexity",
            "Single topic · No role · No examples · Cite sources · Time scope",
            Structure::ResearchDirective,
            "Perplexity is a search-augmented model — NOT a chat model. Rules: \
             (1) ONE focused topic per query — multi-topic queries confuse the search engine. \
             (2) NO role persona — irrelevant for a search model. \
             (3) NO few-shot examples — they trigger searches for your example content, not your actual query. \
             (4) NEVER request URLs — the model cannot see actual URLs and will hallucinate them. \
             (5) Always specify a time scope (e.g. 'published after January 2025'). \
             (6) Specify source types: Academic / Reddit / YouTube / Writing / Wolfram Alpha. \
             (7) Use evidence-first framing: 'Cite sources for each claim'.",
        )
        .avoid(&[
            "few-shot examples",
            "URL requests",
            "role personas",
            "multi-topic queries",
        ])
        .component("research_question", "Research Question (specific, single-topic)")
        .component("time_scope", "Time Scope (recency filter)")
        .component("source_types", "Source Types (Academic / Reddit / etc.)")
        .component("inclusions", "Required Inclusions (what to cite/show)")
        .component("exclusions", "Exclusions (what to omit)")
        .component("output_format", "Output Format"),
    ]
}
