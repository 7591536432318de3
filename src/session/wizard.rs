use std::borrow::Cow;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::rate_limit::{RateLimitExceeded, RateLimiter};
use super::state::{SessionState, Stage};
use crate::config::LimitsConfig;
use crate::llm::{GatewayError, LlmClient};
use crate::model::{AnswerMap, ComponentMap, OUTPUT_FORMAT_KEY};
use crate::pipeline::{analyzer, builder, questions};
use crate::profiles::{registry, Profile, ProfileRegistry, UnknownTargetError};
use crate::util::truncate_chars;

/// Everything a front-end can ask the wizard to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectTarget(String),
    Submit { prompt: String },
    Analyze,
    BuildNow,
    AskQuestions,
    UseSuggestion,
    AcceptSuggestion,
    Answer { text: String },
    Skip,
    Back,
    Reset,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SelectTarget(_) => "select_target",
            Action::Submit { .. } => "submit",
            Action::Analyze => "analyze",
            Action::BuildNow => "build_now",
            Action::AskQuestions => "ask_questions",
            Action::UseSuggestion => "use_suggestion",
            Action::AcceptSuggestion => "accept_suggestion",
            Action::Answer { .. } => "answer",
            Action::Skip => "skip",
            Action::Back => "back",
            Action::Reset => "reset",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error(transparent)]
    UnknownTarget(#[from] UnknownTargetError),

    #[error("action {action} is not valid in the {stage} stage")]
    InvalidAction { action: &'static str, stage: Stage },
}

impl WizardError {
    /// Text that is safe to show the end user.
    pub fn user_message(&self) -> String {
        match self {
            WizardError::RateLimited(e) => e.user_message(),
            WizardError::Gateway(e) => e.user_message().to_string(),
            WizardError::EmptyPrompt => "Please enter a prompt first.".to_string(),
            WizardError::UnknownTarget(e) => format!("Unknown target: {}", e.0),
            WizardError::InvalidAction { .. } => "That action is not available here.".to_string(),
        }
    }
}

/// The session state machine. Owns the generation client and the limits;
/// all per-user data lives in [`SessionState`].
pub struct Wizard {
    client: Box<dyn LlmClient>,
    registry: Cow<'static, ProfileRegistry>,
    limits: LimitsConfig,
    limiter: RateLimiter,
}

impl Wizard {
    pub fn new(client: Box<dyn LlmClient>, limits: LimitsConfig) -> Self {
        let limiter = RateLimiter::from_limits(&limits);
        Self {
            client,
            registry: Cow::Borrowed(registry()),
            limits,
            limiter,
        }
    }

    /// Replace the shared built-in registry with a custom one.
    pub fn with_registry(mut self, registry: ProfileRegistry) -> Self {
        self.registry = Cow::Owned(registry);
        self
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Profile for the session's current target.
    pub fn profile(&self, state: &SessionState) -> Result<&Profile, WizardError> {
        Ok(self.registry.get(&state.target)?)
    }

    /// Apply one action. On error the session is left as it was, apart from
    /// rate-limit bookkeeping for a call that was attempted.
    pub async fn handle(
        &self,
        state: &mut SessionState,
        action: Action,
        now: SystemTime,
    ) -> Result<(), WizardError> {
        debug!("handling {} in {} stage", action.name(), state.stage);
        match (state.stage, action) {
            (_, Action::Reset) => {
                info!("session reset");
                state.reset();
                Ok(())
            }
            (_, Action::Back) => self.back(state),

            (Stage::Input, Action::SelectTarget(target)) => {
                self.registry.get(&target)?;
                if state.target != target {
                    state.target = target;
                    state.components = ComponentMap::default();
                }
                Ok(())
            }
            (Stage::Input, Action::Submit { prompt }) => self.submit(state, &prompt, now),

            (Stage::Analysis, Action::Analyze) => self.analyze(state, now).await,
            (Stage::Analysis, Action::BuildNow) => self.build_now(state, now).await,
            (Stage::Analysis, Action::AskQuestions) => self.ask_questions(state, now).await,

            (Stage::Questions, Action::UseSuggestion) => {
                if let Some(q) = state.current_question() {
                    state.draft = q.inferred_example.clone();
                }
                Ok(())
            }
            (Stage::Questions, Action::AcceptSuggestion) => {
                let example = state
                    .current_question()
                    .map(|q| q.inferred_example.clone())
                    .unwrap_or_default();
                let entry = (!example.trim().is_empty()).then_some(example);
                self.advance(state, entry, now).await
            }
            (Stage::Questions, Action::Answer { text }) => {
                let text = truncate_chars(text.trim(), self.limits.max_answer_chars).trim_end();
                let entry = (!text.is_empty()).then(|| text.to_string());
                self.advance(state, entry, now).await
            }
            (Stage::Questions, Action::Skip) => self.advance(state, None, now).await,

            (stage, action) => Err(WizardError::InvalidAction {
                action: action.name(),
                stage,
            }),
        }
    }

    /// [`handle`](Self::handle) at the current wall-clock time.
    pub async fn handle_now(
        &self,
        state: &mut SessionState,
        action: Action,
    ) -> Result<(), WizardError> {
        self.handle(state, action, SystemTime::now()).await
    }

    fn submit(&self, state: &mut SessionState, prompt: &str, now: SystemTime) -> Result<(), WizardError> {
        let prompt = truncate_chars(prompt.trim(), self.limits.max_prompt_chars).trim_end();
        if prompt.is_empty() {
            return Err(WizardError::EmptyPrompt);
        }
        self.registry.get(&state.target)?;
        self.limiter.check(state, now)?;

        state.raw_prompt = prompt.to_string();
        state.components = ComponentMap::default();
        state.questions.clear();
        state.cursor = 0;
        state.answers.clear();
        state.draft.clear();
        state.enhanced_prompt.clear();
        state.stage = Stage::Analysis;
        info!(
            "prompt submitted for {} ({} chars)",
            state.target,
            state.raw_prompt.chars().count()
        );
        Ok(())
    }

    async fn analyze(&self, state: &mut SessionState, now: SystemTime) -> Result<(), WizardError> {
        if !state.components.is_empty() {
            debug!("analysis already cached");
            return Ok(());
        }
        let profile = self.profile(state)?;
        self.limiter.acquire(state, now)?;

        let components = analyzer::analyze(
            self.client.as_ref(),
            &state.raw_prompt,
            profile,
            self.limits.analysis_max_tokens,
        )
        .await
        .inspect_err(|e| warn!("analysis failed: {}", e))?;
        state.components = components;
        Ok(())
    }

    /// The analyzed components, or an all-absent map if analysis never
    /// completed for this prompt.
    fn effective_components(&self, state: &SessionState, profile: &Profile) -> ComponentMap {
        if state.components.is_empty() {
            ComponentMap::all_absent(profile)
        } else {
            state.components.clone()
        }
    }

    async fn build_now(&self, state: &mut SessionState, now: SystemTime) -> Result<(), WizardError> {
        let profile = self.profile(state)?;
        let components = self.effective_components(state, profile);
        self.limiter.acquire(state, now)?;

        let answers = AnswerMap::new();
        let enhanced = builder::build(
            self.client.as_ref(),
            &state.raw_prompt,
            profile,
            &components,
            &answers,
            self.limits.build_max_tokens,
        )
        .await
        .inspect_err(|e| warn!("build failed: {}", e))?;

        state.answers = answers;
        state.enhanced_prompt = enhanced;
        state.stage = Stage::Result;
        Ok(())
    }

    async fn ask_questions(
        &self,
        state: &mut SessionState,
        now: SystemTime,
    ) -> Result<(), WizardError> {
        let profile = self.profile(state)?;
        let components = self.effective_components(state, profile);

        let mut generated = if components.has_missing() {
            self.limiter.acquire(state, now)?;
            questions::generate_questions(
                self.client.as_ref(),
                &state.raw_prompt,
                profile,
                &components,
                self.limits.max_questions,
                self.limits.questions_max_tokens,
            )
            .await
            .inspect_err(|e| warn!("question generation failed: {}", e))?
        } else {
            Vec::new()
        };

        // Answers are keyed by component, so a question must name one
        generated.retain(|q| {
            let known = profile.has_component(&q.component);
            if !known {
                debug!("dropping question for unknown component {:?}", q.component);
            }
            known
        });

        let mut all = Vec::with_capacity(generated.len() + 1);
        all.push(questions::output_format_question(&state.raw_prompt));
        all.extend(generated);

        state.questions = all;
        state.cursor = 0;
        state.answers.clear();
        state.draft.clear();
        state.stage = Stage::Questions;
        Ok(())
    }

    /// Record `entry` for the current question and move on. Leaving the last
    /// question triggers the build, and nothing is committed unless it
    /// succeeds.
    async fn advance(
        &self,
        state: &mut SessionState,
        entry: Option<String>,
        now: SystemTime,
    ) -> Result<(), WizardError> {
        let Some(question) = state.current_question() else {
            return Err(WizardError::InvalidAction {
                action: "advance",
                stage: state.stage,
            });
        };
        let key = question.component.clone();
        let is_last = state.is_last_question();

        if !is_last {
            if let Some(value) = entry {
                state.answers.insert(key, value);
            }
            state.cursor += 1;
            state.draft.clear();
            return Ok(());
        }

        let mut answers = state.answers.clone();
        if let Some(value) = entry {
            answers.insert(key, value);
        }

        let profile = self.profile(state)?;
        let components = self.effective_components(state, profile);
        self.limiter.acquire(state, now)?;

        let enhanced = builder::build(
            self.client.as_ref(),
            &state.raw_prompt,
            profile,
            &components,
            &answers,
            self.limits.build_max_tokens,
        )
        .await
        .inspect_err(|e| warn!("build failed: {}", e))?;

        state.answers = answers;
        state.cursor = state.questions.len();
        state.draft.clear();
        state.enhanced_prompt = enhanced;
        state.stage = Stage::Result;
        Ok(())
    }

    fn back(&self, state: &mut SessionState) -> Result<(), WizardError> {
        match state.stage {
            Stage::Input => {
                return Err(WizardError::InvalidAction {
                    action: "back",
                    stage: Stage::Input,
                })
            }
            Stage::Analysis => {
                state.components = ComponentMap::default();
                state.stage = Stage::Input;
            }
            Stage::Questions => {
                state.questions.clear();
                state.cursor = 0;
                state.answers.clear();
                state.draft.clear();
                state.stage = Stage::Analysis;
            }
            Stage::Result => {
                state.enhanced_prompt.clear();
                state.stage = Stage::Analysis;
            }
        }
        debug!("moved back to {} stage", state.stage);
        Ok(())
    }
}

/// Label/answer pairs that fed the result, in profile order with the
/// output-format answer last.
pub fn contributing_answers(profile: &Profile, answers: &AnswerMap) -> Vec<(String, String)> {
    let mut rows: Vec<(String, String)> = profile
        .components
        .iter()
        .filter_map(|key| answers.get(key).map(|a| (profile.label(key), a.clone())))
        .collect();
    if let Some(format) = answers.get(OUTPUT_FORMAT_KEY) {
        rows.push((profile.label(OUTPUT_FORMAT_KEY), format.clone()));
    }
    rows
}
