//! Provider clients against a local mock HTTP server

use mockito::Matcher;
use prompt_enhancer::llm::client_impl::{AnthropicClient, GeminiClient, OpenAIClient};
use prompt_enhancer::llm::{GatewayError, GenerationRequest, LlmClient};
use prompt_enhancer::util::SecretString;
use serde_json::json;

fn key() -> SecretString {
    SecretString::new("test-key".to_string())
}

fn request() -> GenerationRequest {
    GenerationRequest::new("You rewrite prompts.", "write a poem", 512)
}

#[tokio::test]
async fn test_anthropic_sends_system_field_and_trims_output() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "test-key")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(json!({
            "model": "claude-haiku-4-5-20251001",
            "max_tokens": 512,
            "system": "You rewrite prompts.",
            "messages": [{"role": "user", "content": "write a poem"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"content": [{"type": "text", "text": "  <task>poem</task>\n"}]}"#)
        .create_async()
        .await;

    let client = AnthropicClient::with_base_url(
        key(),
        "claude-haiku-4-5-20251001".to_string(),
        server.url(),
        30,
    )
    .unwrap();
    let out = client.complete(&request()).await.unwrap();
    assert_eq!(out, "<task>poem</task>");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_anthropic_rate_limit_is_busy() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(429)
        .with_body(r#"{"type": "error", "error": {"type": "rate_limit_error"}}"#)
        .create_async()
        .await;

    let client =
        AnthropicClient::with_base_url(key(), "m".to_string(), server.url(), 30).unwrap();
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Busy(_)));
    assert_eq!(
        err.user_message(),
        "The AI service is busy. Please try again in a few seconds."
    );
}

#[tokio::test]
async fn test_anthropic_overloaded_is_busy() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(529)
        .with_body(r#"{"type": "error", "error": {"type": "overloaded_error"}}"#)
        .create_async()
        .await;

    let client =
        AnthropicClient::with_base_url(key(), "m".to_string(), server.url(), 30).unwrap();
    assert!(matches!(
        client.complete(&request()).await,
        Err(GatewayError::Busy(_))
    ));
}

#[tokio::test]
async fn test_server_error_hides_body_from_user_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(500)
        .with_body("stack trace with secrets")
        .create_async()
        .await;

    let client =
        AnthropicClient::with_base_url(key(), "m".to_string(), server.url(), 30).unwrap();
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Service(_)));
    assert!(!err.user_message().contains("secrets"));
}

#[tokio::test]
async fn test_rejected_key_is_configuration() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(401)
        .with_body(r#"{"error": {"type": "authentication_error"}}"#)
        .create_async()
        .await;

    let client =
        AnthropicClient::with_base_url(key(), "m".to_string(), server.url(), 30).unwrap();
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Configuration(_)));
    assert!(!err.to_string().contains("test-key"));
}

#[tokio::test]
async fn test_openai_sends_system_message_first() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "max_tokens": 256,
            "messages": [
                {"role": "system", "content": "You rewrite prompts."},
                {"role": "user", "content": "write a poem"}
            ]
        })))
        .with_status(200)
        .with_body(
            r#"{"choices": [{"message": {"role": "assistant", "content": "Act as a poet.\n"}}]}"#,
        )
        .create_async()
        .await;

    let client = OpenAIClient::with_base_url(key(), "gpt-4o".to_string(), server.url(), 30)
        .unwrap()
        .with_max_tokens_cap(Some(256));
    let out = client.complete(&request()).await.unwrap();
    assert_eq!(out, "Act as a poet.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_gemini_uses_system_instruction_and_header_key() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-2.0-flash:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJson(json!({
            "systemInstruction": {"parts": [{"text": "You rewrite prompts."}]},
            "generationConfig": {"maxOutputTokens": 512}
        })))
        .with_status(200)
        .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "Role: poet"}]}}]}"#)
        .create_async()
        .await;

    let client = GeminiClient::with_base_url(
        key(),
        "gemini-2.0-flash".to_string(),
        server.url(),
        30,
    )
    .unwrap();
    assert_eq!(client.complete(&request()).await.unwrap(), "Role: poet");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_gemini_resource_exhausted_is_busy() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/models/g:generateContent")
        .with_status(400)
        .with_body(r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#)
        .create_async()
        .await;

    let client = GeminiClient::with_base_url(key(), "g".to_string(), server.url(), 30).unwrap();
    assert!(matches!(
        client.complete(&request()).await,
        Err(GatewayError::Busy(_))
    ));
}
