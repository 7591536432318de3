use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::client::{GenerationRequest, LlmClient};
use super::error::GatewayError;
use crate::util::SecretString;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

/// Turn a non-2xx response into the matching gateway error.
async fn ensure_success(provider: &str, response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::from_status(provider, status.as_u16(), &body))
}

fn clamp_tokens(requested: u32, cap: Option<u32>) -> u32 {
    match cap {
        Some(cap) => requested.min(cap).max(1),
        None => requested.max(1),
    }
}

// ============================================================================
// Anthropic Client
// ============================================================================

pub struct AnthropicClient {
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens_cap: Option<u32>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

impl AnthropicClient {
    pub fn new(api_key: SecretString, model: String, timeout_secs: u64) -> Result<Self> {
        Self::with_base_url(api_key, model, ANTHROPIC_BASE_URL.to_string(), timeout_secs)
    }

    pub fn with_base_url(
        api_key: SecretString,
        model: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens_cap: None,
            client: http_client(timeout_secs)?,
        })
    }

    pub fn with_max_tokens_cap(mut self, cap: Option<u32>) -> Self {
        self.max_tokens_cap = cap;
        self
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: clamp_tokens(request.max_tokens, self.max_tokens_cap),
            system: &request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.user,
            }],
        };

        debug!("Calling Anthropic API with model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let api_response: AnthropicResponse = ensure_success("Anthropic", response)
            .await?
            .json()
            .await?;

        api_response
            .content
            .into_iter()
            .find(|c| c.kind == "text" || !c.text.is_empty())
            .map(|c| c.text.trim().to_string())
            .ok_or_else(|| GatewayError::Service("No content in Anthropic response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// OpenAI Client
// ============================================================================

pub struct OpenAIClient {
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens_cap: Option<u32>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

impl OpenAIClient {
    pub fn new(api_key: SecretString, model: String, timeout_secs: u64) -> Result<Self> {
        Self::with_base_url(api_key, model, OPENAI_BASE_URL.to_string(), timeout_secs)
    }

    pub fn with_base_url(
        api_key: SecretString,
        model: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens_cap: None,
            client: http_client(timeout_secs)?,
        })
    }

    pub fn with_max_tokens_cap(mut self, cap: Option<u32>) -> Self {
        self.max_tokens_cap = cap;
        self
    }

    fn build_request<'a>(&'a self, request: &GenerationRequest) -> OpenAIRequest<'a> {
        let tokens = clamp_tokens(request.max_tokens, self.max_tokens_cap);
        // GPT-5+ models use max_completion_tokens instead of max_tokens
        let (max_tokens, max_completion_tokens) = if self.model.starts_with("gpt-5") {
            (None, Some(tokens))
        } else {
            (Some(tokens), None)
        };
        OpenAIRequest {
            model: &self.model,
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            max_tokens,
            max_completion_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let body = self.build_request(request);

        debug!(
            "Calling OpenAI API at {} with model: {}",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.api_key.expose()))
            .json(&body)
            .send()
            .await?;

        let api_response: OpenAIResponse = ensure_success("OpenAI", response)
            .await?
            .json()
            .await?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| GatewayError::Service("No choices in OpenAI response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Gemini Client (Google Generative AI)
// ============================================================================

pub struct GeminiClient {
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens_cap: Option<u32>,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: SecretString, model: String, timeout_secs: u64) -> Result<Self> {
        Self::with_base_url(api_key, model, GEMINI_BASE_URL.to_string(), timeout_secs)
    }

    pub fn with_base_url(
        api_key: SecretString,
        model: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens_cap: None,
            client: http_client(timeout_secs)?,
        })
    }

    pub fn with_max_tokens_cap(mut self, cap: Option<u32>) -> Self {
        self.max_tokens_cap = cap;
        self
    }

    fn build_request(&self, request: &GenerationRequest) -> GeminiRequest {
        GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system.clone(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.user.clone(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: clamp_tokens(request.max_tokens, self.max_tokens_cap),
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let body = self.build_request(request);

        debug!("Calling Gemini API with model: {}", self.model);

        // Key goes in a header so it never appears in a logged URL
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", self.api_key.expose())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let api_response: GeminiResponse = ensure_success("Gemini", response)
            .await?
            .json()
            .await?;

        api_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .ok_or_else(|| GatewayError::Service("No content in Gemini response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
