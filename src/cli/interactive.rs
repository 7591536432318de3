use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::info;

use crate::compare;
use crate::config::Config;
use crate::llm::factory;
use crate::session::wizard::contributing_answers;
use crate::session::{Action, SessionState, Stage, Wizard, WizardError};

/// What one line (or block) of terminal input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Act(Action),
    Help,
    Quit,
    /// Nothing to do; redraw
    Ignore,
}

pub async fn run(
    config_path: Option<String>,
    provider_override: Option<String>,
    model_override: Option<String>,
    target_override: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let mut config = Config::load_with_path(config_path)?;

    if let Some(ref provider) = provider_override {
        info!("CLI override: provider = {}", provider);
        config.llm.provider = provider.clone();
    }
    if let Some(ref model) = model_override {
        info!("CLI override: model = {}", model);
        config.llm.model = model.clone();
    }
    info!("Dry run: {}", dry_run);

    let client = factory::create_client(&config, dry_run)?;
    let wizard = Wizard::new(client, config.limits.clone());
    info!("Using model {}", wizard.model_name());

    let mut state = SessionState::new();
    if let Some(target) = target_override {
        info!("CLI override: target = {}", target);
        wizard
            .handle_now(&mut state, Action::SelectTarget(target))
            .await
            .map_err(|e| anyhow::anyhow!("{}", e.user_message()))?;
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_session(&wizard, &mut state, stdin, &mut stdout).await
}

/// Drive one session from `input` until `/quit` or end of input.
pub async fn run_session<R, W>(
    wizard: &Wizard,
    state: &mut SessionState,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut previous = None;

    loop {
        // Entering ANALYSIS with nothing cached runs the analyzer once
        if state.stage == Stage::Analysis
            && state.components.is_empty()
            && previous != Some(Stage::Analysis)
        {
            writeln!(out, "Analyzing your prompt...")?;
            dispatch(wizard, state, Action::Analyze, out).await?;
        }
        previous = Some(state.stage);

        render(wizard, state, out)?;
        out.flush()?;

        match read_command(state, &mut lines).await? {
            Command::Quit => break,
            Command::Help => writeln!(out, "{}", help_text(state.stage))?,
            Command::Ignore => {}
            Command::Act(action) => {
                if matches!(action, Action::Back | Action::Reset) {
                    previous = None;
                }
                dispatch(wizard, state, action, out).await?;
            }
        }
    }
    Ok(())
}

async fn dispatch<W: Write>(
    wizard: &Wizard,
    state: &mut SessionState,
    action: Action,
    out: &mut W,
) -> Result<()> {
    let busy = matches!(
        action,
        Action::BuildNow | Action::AskQuestions | Action::Analyze
    );
    if busy {
        writeln!(out, "Working...")?;
    }
    if let Err(e) = wizard.handle_now(state, action).await {
        writeln!(out, "! {}", e.user_message())?;
        if matches!(&e, WizardError::Gateway(g) if !g.is_retryable()) {
            writeln!(out, "  Retrying will not help until the deployment is fixed.")?;
        }
    }
    Ok(())
}

async fn read_command<R>(state: &SessionState, lines: &mut Lines<R>) -> Result<Command>
where
    R: AsyncBufRead + Unpin,
{
    let Some(first) = lines.next_line().await? else {
        return Ok(Command::Quit);
    };

    if state.stage == Stage::Input && !first.trim_start().starts_with('/') {
        // Prompts may span several lines; an empty line ends them
        let mut block = first;
        if !block.trim().is_empty() {
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    break;
                }
                block.push('\n');
                block.push_str(&line);
            }
        }
        return Ok(parse_command(state, &block));
    }
    Ok(parse_command(state, &first))
}

/// Map one input line to a command for the current stage.
pub fn parse_command(state: &SessionState, line: &str) -> Command {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix('/') {
        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .map(|(n, a)| (n, a.trim()))
            .unwrap_or((rest, ""));
        return match (state.stage, name) {
            (_, "quit" | "exit") => Command::Quit,
            (_, "help") => Command::Help,
            (_, "reset") => Command::Act(Action::Reset),
            (_, "back") => Command::Act(Action::Back),
            (Stage::Input, "target") if !arg.is_empty() => {
                Command::Act(Action::SelectTarget(arg.to_string()))
            }
            (Stage::Analysis, "build") => Command::Act(Action::BuildNow),
            (Stage::Analysis, "ask") => Command::Act(Action::AskQuestions),
            (Stage::Analysis, "retry") => Command::Act(Action::Analyze),
            (Stage::Questions, "use") => Command::Act(Action::UseSuggestion),
            (Stage::Questions, "accept") => Command::Act(Action::AcceptSuggestion),
            (Stage::Questions, "skip") => Command::Act(Action::Skip),
            // Answers may start with a slash, e.g. an API path
            (Stage::Questions, _) => Command::Act(Action::Answer {
                text: trimmed.to_string(),
            }),
            _ => Command::Help,
        };
    }

    match state.stage {
        Stage::Input if trimmed.is_empty() => Command::Ignore,
        Stage::Input => Command::Act(Action::Submit {
            prompt: line.to_string(),
        }),
        // An empty line submits whatever is in the draft
        Stage::Questions if trimmed.is_empty() => Command::Act(Action::Answer {
            text: state.draft.clone(),
        }),
        Stage::Questions => Command::Act(Action::Answer {
            text: trimmed.to_string(),
        }),
        Stage::Analysis | Stage::Result => Command::Ignore,
    }
}

fn help_text(stage: Stage) -> &'static str {
    match stage {
        Stage::Input => {
            "Type your prompt and finish with an empty line.\n/target NAME switches the target LLM. /quit exits."
        }
        Stage::Analysis => {
            "/build enhances with what we already have. /ask answers a few questions first.\n/retry re-runs a failed analysis. /back edits the prompt. /reset starts over."
        }
        Stage::Questions => {
            "Type an answer and press Enter. An empty line submits the draft.\n/use copies the suggestion into the draft, /accept takes it as-is, /skip moves on.\n/back returns to the analysis. /reset starts over."
        }
        Stage::Result => "/back returns to the analysis. /reset starts a new prompt. /quit exits.",
    }
}

fn render<W: Write>(wizard: &Wizard, state: &SessionState, out: &mut W) -> Result<()> {
    match state.stage {
        Stage::Input => render_input(wizard, state, out),
        Stage::Analysis => render_analysis(wizard, state, out),
        Stage::Questions => render_questions(wizard, state, out),
        Stage::Result => render_result(wizard, state, out),
    }
}

fn render_input<W: Write>(wizard: &Wizard, state: &SessionState, out: &mut W) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "== Prompt Enhancer ==")?;
    match wizard.profile(state) {
        Ok(profile) => writeln!(out, "Target: {} ({})", profile.id, profile.style_hint)?,
        Err(_) => writeln!(out, "Target: {}", state.target)?,
    }
    writeln!(
        out,
        "Available: {}",
        wizard.registry().targets().join(", ")
    )?;
    writeln!(
        out,
        "Enter your prompt (up to {} characters), then an empty line. /help for commands.",
        wizard.limits().max_prompt_chars
    )?;
    Ok(())
}

fn render_analysis<W: Write>(wizard: &Wizard, state: &SessionState, out: &mut W) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "== Prompt Analysis ({}) ==", state.target)?;
    let profile = wizard.profile(state)?;

    if state.components.is_empty() {
        writeln!(out, "Analysis unavailable. /retry to try again, or /build anyway.")?;
        return Ok(());
    }

    writeln!(
        out,
        "Prompt completeness: {}%",
        state.components.coverage_percent()
    )?;

    writeln!(out, "Found in your prompt:")?;
    let present = state.components.present(profile);
    if present.is_empty() {
        writeln!(out, "  Nothing detected yet.")?;
    }
    for (key, found) in present {
        writeln!(out, "  {}: {}", profile.label(key), found)?;
    }

    writeln!(out, "Missing or unclear:")?;
    let missing = state.components.missing(profile);
    if missing.is_empty() {
        writeln!(out, "  All components detected!")?;
    }
    for key in missing {
        writeln!(out, "  - {}", profile.label(key))?;
    }

    writeln!(
        out,
        "/build enhance with current info | /ask answer questions to improve | /back | /reset"
    )?;
    Ok(())
}

fn render_questions<W: Write>(wizard: &Wizard, state: &SessionState, out: &mut W) -> Result<()> {
    let Some(question) = state.current_question() else {
        return Ok(());
    };
    let profile = wizard.profile(state)?;

    writeln!(out)?;
    writeln!(
        out,
        "== Question {} of {} | Improving: {} ==",
        state.cursor + 1,
        state.questions.len(),
        profile.label(&question.component)
    )?;
    writeln!(out, "{}", question.question)?;
    if !question.inferred_example.is_empty() {
        writeln!(out, "Based on your prompt, we think:")?;
        for line in question.inferred_example.lines() {
            writeln!(out, "  {}", line)?;
        }
    }
    if !state.draft.is_empty() {
        writeln!(out, "Draft (empty line to submit):")?;
        for line in state.draft.lines() {
            writeln!(out, "  {}", line)?;
        }
    }
    writeln!(
        out,
        "[{}] /use | /accept | /skip | /back",
        question.placeholder
    )?;
    Ok(())
}

fn render_result<W: Write>(wizard: &Wizard, state: &SessionState, out: &mut W) -> Result<()> {
    let profile = wizard.profile(state)?;

    writeln!(out)?;
    writeln!(out, "== Enhanced prompt for {} ==", profile.id)?;
    writeln!(out, "{}", state.enhanced_prompt)?;

    let lines = compare::line_diff(&state.raw_prompt, &state.enhanced_prompt);
    let (added, removed) = compare::stats(&lines);
    writeln!(out)?;
    writeln!(out, "== Changes (+{} -{}) ==", added, removed)?;
    writeln!(out, "{}", compare::render(&lines))?;

    let rows = contributing_answers(profile, &state.answers);
    if !rows.is_empty() {
        writeln!(out)?;
        writeln!(out, "== Your answers ==")?;
        for (label, answer) in rows {
            writeln!(out, "{}: {}", label, answer)?;
        }
    }
    writeln!(out, "/back | /reset for a new prompt | /quit")?;
    Ok(())
}
