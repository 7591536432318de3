use serde_json::Value;
use tracing::{debug, info};

use crate::llm::prompts::{analysis_user_message, ANALYSIS_SYSTEM};
use crate::llm::{GatewayError, GenerationRequest, LlmClient};
use crate::model::ComponentMap;
use crate::parse::parse_json;
use crate::profiles::Profile;

pub fn analysis_request(profile: &Profile, raw_prompt: &str, max_tokens: u32) -> GenerationRequest {
    GenerationRequest::new(
        ANALYSIS_SYSTEM,
        analysis_user_message(profile, raw_prompt),
        max_tokens,
    )
}

/// Detect which of the profile's components the raw prompt already covers.
///
/// The returned map always carries exactly the profile's component keys.
/// Unparseable output degrades to an all-absent map; gateway errors are
/// passed through for the caller to present.
pub async fn analyze(
    client: &dyn LlmClient,
    raw_prompt: &str,
    profile: &Profile,
    max_tokens: u32,
) -> Result<ComponentMap, GatewayError> {
    let request = analysis_request(profile, raw_prompt, max_tokens);
    let output = client.complete(&request).await?;
    debug!("analysis output: {} chars", output.len());

    let parsed = parse_json(&output, Value::Null);
    let components = ComponentMap::backfilled(profile, &parsed);
    info!(
        "analyzed prompt for {}: {}% coverage, {} missing",
        profile.id,
        components.coverage_percent(),
        components.missing(profile).len()
    );
    Ok(components)
}
