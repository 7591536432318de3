use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::error::GatewayError;

/// One call to the generation service.
///
/// `system` must only ever be assembled from static profile/config text;
/// anything the end user typed belongs in `user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one generation and return the raw text output.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError>;

    fn model_name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        (**self).complete(request).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Stand-in used when no credential could be resolved. Every call fails the
/// same way until the deployment is fixed.
pub struct UnconfiguredClient {
    reason: String,
}

impl UnconfiguredClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LlmClient for UnconfiguredClient {
    async fn complete(&self, _request: &GenerationRequest) -> Result<String, GatewayError> {
        Err(GatewayError::Configuration(self.reason.clone()))
    }
}

/// Canned client for `--dry-run`: answers based on which stage is calling.
pub struct MockLlmClient;

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }

    /// Pull `"key": label` lines out of an analysis user message.
    fn analysis_keys(user: &str) -> Vec<String> {
        user.lines()
            .map(str::trim)
            .filter(|l| l.starts_with('"'))
            .filter_map(|l| l[1..].split('"').next().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let system = request.system.as_str();
        if system.contains("identify which framework components are present") {
            // Analyzer: credit only the first component
            let keys = Self::analysis_keys(&request.user);
            let mut obj = serde_json::Map::new();
            for (i, key) in keys.iter().enumerate() {
                let value = if i == 0 {
                    serde_json::Value::String("implied by the raw prompt".to_string())
                } else {
                    serde_json::Value::Null
                };
                obj.insert(key.clone(), value);
            }
            Ok(format!(
                "```json\n{}\n```",
                serde_json::Value::Object(obj)
            ))
        } else if system.contains("most impactful missing or") {
            Ok(r#"[
  {
    "component": "context",
    "question": "Who is the audience, and why does this matter to them?",
    "inferred_example": "The audience is a small team of product managers preparing a quarterly review.\nThey are non-technical, so explanations should avoid jargon.\nThe output feeds a slide deck, so key points must be skimmable.\nAccuracy matters more than flourish.\nAssume they have ten minutes to read it.",
    "placeholder": "Describe the audience and purpose"
  },
  {
    "component": "constraints",
    "question": "Are there limits on length, tone or scope?",
    "inferred_example": "Keep it under 400 words.\nUse a neutral, professional tone.\nDo not speculate beyond the provided material.\nFlag any assumption explicitly.\nPrefer concrete numbers over adjectives.",
    "placeholder": "Length, tone, scope"
  }
]"#
            .to_string())
        } else if system.contains("Transform the raw prompt") {
            Ok("<role>You are an experienced analyst.</role>\n\n<task>Complete the request described by the user.</task>\n\n<instructions>Think through this carefully before responding.</instructions>".to_string())
        } else {
            Ok(r#"{"status": "mock"}"#.to_string())
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// Test double: replays queued responses in order and records every request.
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<Result<String, GatewayError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedLlmClient {
    pub fn new(responses: Vec<Result<String, GatewayError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Convenience for all-success scripts
    pub fn replying(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Service("no scripted response left".to_string())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_always_fails_with_configuration() {
        let client = UnconfiguredClient::new("API key not found in ANTHROPIC_API_KEY");
        let req = GenerationRequest::new("sys", "user", 10);
        for _ in 0..2 {
            assert!(matches!(
                client.complete(&req).await,
                Err(GatewayError::Configuration(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_scripted_client_replays_in_order_and_records() {
        let client = ScriptedLlmClient::new(vec![
            Ok("first".to_string()),
            Err(GatewayError::Busy("429".to_string())),
        ]);
        let req = GenerationRequest::new("sys", "hello", 64);
        assert_eq!(client.complete(&req).await.unwrap(), "first");
        assert!(matches!(client.complete(&req).await, Err(GatewayError::Busy(_))));
        assert!(matches!(client.complete(&req).await, Err(GatewayError::Service(_))));
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.requests()[0].user, "hello");
    }

    #[test]
    fn test_mock_analysis_keys() {
        let user = "Target LLM: X\n\nComponent keys to detect:\n  \"role\": Role\n  \"task\": Task\n\nRaw prompt to analyze:\nhi";
        assert_eq!(MockLlmClient::analysis_keys(user), vec!["role", "task"]);
    }
}
