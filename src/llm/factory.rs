use anyhow::{bail, Result};
use tracing::warn;

use super::client::{LlmClient, MockLlmClient, UnconfiguredClient};
use super::client_impl::{
    AnthropicClient, GeminiClient, OpenAIClient, ANTHROPIC_BASE_URL, GEMINI_BASE_URL,
    OPENAI_BASE_URL,
};
use crate::config::Config;

/// Create the generation client described by the configuration.
///
/// A missing credential does not fail here: the session still starts, and
/// every generation attempt reports a configuration error instead.
pub fn create_client(config: &Config, dry_run: bool) -> Result<Box<dyn LlmClient>> {
    if dry_run {
        return Ok(Box::new(MockLlmClient::new()));
    }

    let llm = &config.llm;
    let default_base = match llm.provider.as_str() {
        "anthropic" => ANTHROPIC_BASE_URL,
        "openai" => OPENAI_BASE_URL,
        "gemini" => GEMINI_BASE_URL,
        unknown => bail!("Unknown LLM provider: {}", unknown),
    };

    let Some(api_key) = config.resolve_api_key() else {
        warn!(
            "no API key found in secret store or environment variable {}",
            llm.api_key_env
        );
        return Ok(Box::new(UnconfiguredClient::new(format!(
            "API key not found (secret store or environment variable {})",
            llm.api_key_env
        ))));
    };

    let base_url = llm
        .base_url
        .clone()
        .unwrap_or_else(|| default_base.to_string());

    let client: Box<dyn LlmClient> = match llm.provider.as_str() {
        "anthropic" => Box::new(
            AnthropicClient::with_base_url(api_key, llm.model.clone(), base_url, llm.timeout_secs)?
                .with_max_tokens_cap(llm.max_tokens),
        ),
        "openai" => Box::new(
            OpenAIClient::with_base_url(api_key, llm.model.clone(), base_url, llm.timeout_secs)?
                .with_max_tokens_cap(llm.max_tokens),
        ),
        _ => Box::new(
            GeminiClient::with_base_url(api_key, llm.model.clone(), base_url, llm.timeout_secs)?
                .with_max_tokens_cap(llm.max_tokens),
        ),
    };
    Ok(client)
}
