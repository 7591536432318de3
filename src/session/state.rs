use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::model::{AnswerMap, ClarifyingQuestion, ComponentMap};

pub const DEFAULT_TARGET: &str = "Claude";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Input,
    Analysis,
    Questions,
    Result,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::Analysis => "analysis",
            Stage::Questions => "questions",
            Stage::Result => "result",
        };
        write!(f, "{}", name)
    }
}

/// Everything one user session remembers between actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub stage: Stage,
    pub raw_prompt: String,
    pub target: String,
    /// Empty until the analyzer has run for the current prompt
    pub components: ComponentMap,
    pub questions: Vec<ClarifyingQuestion>,
    pub cursor: usize,
    pub answers: AnswerMap,
    /// Pre-filled text for the current question's input
    pub draft: String,
    pub enhanced_prompt: String,
    pub last_request_at: Option<SystemTime>,
    pub request_count: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            stage: Stage::Input,
            raw_prompt: String::new(),
            target: DEFAULT_TARGET.to_string(),
            components: ComponentMap::default(),
            questions: Vec::new(),
            cursor: 0,
            answers: AnswerMap::new(),
            draft: String::new(),
            enhanced_prompt: String::new(),
            last_request_at: None,
            request_count: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to a fresh session, rate-limit counters included.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn current_question(&self) -> Option<&ClarifyingQuestion> {
        self.questions.get(self.cursor)
    }

    pub fn is_last_question(&self) -> bool {
        self.cursor + 1 >= self.questions.len()
    }
}
