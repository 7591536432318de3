use tracing::info;

use crate::llm::prompts::{build_system, build_user_message};
use crate::llm::{GatewayError, GenerationRequest, LlmClient};
use crate::model::{AnswerMap, ComponentMap};
use crate::profiles::Profile;

pub fn build_request(
    profile: &Profile,
    raw_prompt: &str,
    components: &ComponentMap,
    answers: &AnswerMap,
    max_tokens: u32,
) -> GenerationRequest {
    let components_json =
        serde_json::to_string_pretty(&components.to_json()).unwrap_or_else(|_| "{}".to_string());
    let answers_json = serde_json::to_string_pretty(answers).unwrap_or_else(|_| "{}".to_string());
    GenerationRequest::new(
        build_system(profile),
        build_user_message(&profile.id, raw_prompt, &components_json, &answers_json),
        max_tokens,
    )
}

/// Produce the enhanced prompt for `profile`.
pub async fn build(
    client: &dyn LlmClient,
    raw_prompt: &str,
    profile: &Profile,
    components: &ComponentMap,
    answers: &AnswerMap,
    max_tokens: u32,
) -> Result<String, GatewayError> {
    let request = build_request(profile, raw_prompt, components, answers, max_tokens);
    let output = client.complete(&request).await?;
    let enhanced = output.trim().to_string();
    info!(
        "built enhanced prompt for {} ({} answers, {} chars)",
        profile.id,
        answers.len(),
        enhanced.len()
    );
    Ok(enhanced)
}
