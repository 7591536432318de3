use serde_json::Value;
use tracing::{debug, info};

use crate::intent::{classify_keywords, Intent};
use crate::llm::prompts::{questions_system, questions_user_message};
use crate::llm::{GatewayError, GenerationRequest, LlmClient};
use crate::model::{ClarifyingQuestion, ComponentMap, OUTPUT_FORMAT_KEY};
use crate::parse::parse_json_as;
use crate::profiles::Profile;

const OUTPUT_FORMAT_QUESTION: &str = "What should the final output look like?";

const IMAGE_FORMAT_EXAMPLE: &str = "\
A single high-resolution image, 16:9 landscape.
Photorealistic style with soft natural lighting and shallow depth of field.
Warm, inviting color palette with the main subject centered.
Calm, peaceful mood; no text or watermarks in the frame.
Eye-level camera angle, subject filling roughly a third of the composition.";

const REPORT_FORMAT_EXAMPLE: &str = "\
A structured written report of roughly 500 to 800 words.
Open with a two or three sentence summary of the key takeaway.
Use short section headings and bullet points for the main findings.
Include a brief table if comparing more than two options.
Close with concrete next steps or recommendations.";

pub fn questions_request(
    profile: &Profile,
    raw_prompt: &str,
    components: &ComponentMap,
    max_questions: usize,
    max_tokens: u32,
) -> GenerationRequest {
    // Present keys come from the profile, never from extracted user text
    let present: Vec<&str> = components
        .present(profile)
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    let missing = components.missing(profile);
    GenerationRequest::new(
        questions_system(profile, max_questions, &present),
        questions_user_message(raw_prompt, &missing, &present),
        max_tokens,
    )
}

/// Ask the model for clarifying questions about missing components.
///
/// Nothing missing means no call and no questions. Malformed elements are
/// dropped and the result is capped at `max_questions`.
pub async fn generate_questions(
    client: &dyn LlmClient,
    raw_prompt: &str,
    profile: &Profile,
    components: &ComponentMap,
    max_questions: usize,
    max_tokens: u32,
) -> Result<Vec<ClarifyingQuestion>, GatewayError> {
    if !components.has_missing() {
        debug!("all components present, skipping question generation");
        return Ok(Vec::new());
    }

    let request = questions_request(profile, raw_prompt, components, max_questions, max_tokens);
    let output = client.complete(&request).await?;

    let items: Vec<Value> = parse_json_as(&output, Vec::new());
    let questions: Vec<ClarifyingQuestion> = items
        .iter()
        .filter_map(ClarifyingQuestion::from_value)
        .take(max_questions)
        .collect();

    info!("generated {} clarifying questions for {}", questions.len(), profile.id);
    Ok(questions)
}

/// The deterministic question prepended to every question list.
pub fn output_format_question(raw_prompt: &str) -> ClarifyingQuestion {
    let intent = classify_keywords(raw_prompt);
    debug!("output-format question for {} intent", intent);
    let example = match intent {
        Intent::Image => IMAGE_FORMAT_EXAMPLE,
        Intent::Text | Intent::Research => REPORT_FORMAT_EXAMPLE,
    };
    ClarifyingQuestion::new(OUTPUT_FORMAT_KEY, OUTPUT_FORMAT_QUESTION, example)
        .with_placeholder("Format, length, style")
}
