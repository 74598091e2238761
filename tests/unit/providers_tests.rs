/*!
 * Tests for provider adapters, the registry and the mock provider
 */

use reqwest::StatusCode;
use std::sync::Arc;
use subtrans::app_config::{ProviderKind, TranslationConfig};
use subtrans::errors::{ProviderError, RATE_LIMIT_MESSAGE};
use subtrans::providers::gemini::Gemini;
use subtrans::providers::mock::{MockProvider, MockReply};
use subtrans::providers::openai::OpenAI;
use subtrans::providers::{ProviderRegistry, TranslationProvider, TranslationResult, map_http_error};
use crate::common;

#[test]
fn test_mapHttpError_with429_shouldBeRateLimitWithUserMessage() {
    let error = map_http_error(StatusCode::TOO_MANY_REQUESTS, r#"{"error":{"message":"quota"}}"#);
    assert!(matches!(error, ProviderError::RateLimitExceeded(_)));
    assert!(error.to_string().contains(RATE_LIMIT_MESSAGE));
}

#[test]
fn test_mapHttpError_with403_shouldBeAuthentication() {
    let error = map_http_error(StatusCode::FORBIDDEN, "");
    assert!(matches!(error, ProviderError::AuthenticationError(_)));
}

#[test]
fn test_mapHttpError_withPlainTextBody_shouldKeepBody() {
    let error = map_http_error(StatusCode::BAD_GATEWAY, "upstream timed out");
    assert_eq!(
        error,
        ProviderError::ApiError { status_code: 502, message: "upstream timed out".to_string() }
    );
}

#[tokio::test]
async fn test_gemini_withEmptyKey_shouldFailBeforeRequest() {
    let client = Gemini::new("http://127.0.0.1:9", "gemini-2.0-flash", 1, 0.3).unwrap();
    let result = client.translate_batch(&common::sample_entries(2), "", "French", "").await;
    assert!(matches!(result, Err(ProviderError::AuthenticationError(_))));
}

#[tokio::test]
async fn test_openai_withEmptyKey_shouldFailBeforeRequest() {
    let client = OpenAI::new("http://127.0.0.1:9", "gpt-4o-mini", 1, 0.3).unwrap();
    let result = client.translate_batch(&common::sample_entries(2), "", "French", "   ").await;
    assert!(matches!(result, Err(ProviderError::AuthenticationError(_))));
}

#[test]
fn test_registry_register_shouldReplaceSameKind() {
    let mut registry = ProviderRegistry::from_config(&TranslationConfig::default()).unwrap();
    let mock = MockProvider::working().with_kind(ProviderKind::OpenAI);
    registry.register(Arc::new(mock));

    let provider = registry.get(ProviderKind::OpenAI).unwrap();
    assert!(format!("{:?}", provider).contains("MockProvider"));
    assert_eq!(registry.kinds().len(), 2);
}

#[test]
fn test_registry_empty_shouldHaveNoProviders() {
    let registry = ProviderRegistry::new();
    assert!(registry.get(ProviderKind::Gemini).is_none());
    assert!(registry.kinds().is_empty());
}

#[tokio::test]
async fn test_mockProvider_shouldRecordBatchBoundaries() {
    let provider = MockProvider::working();
    let entries = common::sample_entries(3);
    provider.translate_batch(&entries[0..2], "casual", "Vietnamese", "k").await.unwrap();
    provider.translate_batch(&entries[2..], "casual", "Vietnamese", "k").await.unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].entry_ids, vec![1, 2]);
    assert_eq!(calls[1].entry_ids, vec![3]);
    assert_eq!(calls[0].style_instruction, "casual");
}

#[tokio::test]
async fn test_mockProvider_scriptedResults_shouldBeReturnedVerbatim() {
    let scripted = vec![TranslationResult { id: 9, translated_text: "x".to_string() }];
    let provider = MockProvider::scripted([MockReply::Results(scripted.clone())]);
    let results = provider.translate_batch(&common::sample_entries(1), "", "German", "k").await.unwrap();
    assert_eq!(results, scripted);
}

fn gemini_body(inner: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": inner }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 5 }
    })
    .to_string()
}

fn openai_body(inner: &str) -> String {
    serde_json::json!({
        "choices": [{
            "message": { "role": "assistant", "content": inner },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
    })
    .to_string()
}

#[tokio::test]
async fn test_gemini_withSuccessfulResponse_shouldReturnResultsAndSendKeyHeader() -> anyhow::Result<()> {
    let inner = r#"{"translations":[{"id":1,"translatedText":"Un"},{"id":2,"translatedText":"Deux"}]}"#;
    let (base_url, request) = common::serve_once("200 OK", &gemini_body(inner)).await?;
    let client = Gemini::new(format!("{}/v1beta", base_url), "gemini-2.0-flash", 5, 0.3)?;

    let results = client.translate_batch(&common::sample_entries(2), "", "French", "g-key").await?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[1], TranslationResult { id: 2, translated_text: "Deux".to_string() });

    let request = request.await?;
    assert!(request.head.starts_with("POST /v1beta/models/gemini-2.0-flash:generateContent"));
    assert!(request.head.to_lowercase().contains("x-goog-api-key: g-key"));
    assert!(request.body.contains("responseSchema"));
    Ok(())
}

#[tokio::test]
async fn test_gemini_with429_shouldBeRateLimit() -> anyhow::Result<()> {
    let (base_url, _request) = common::serve_once(
        "429 Too Many Requests",
        r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#,
    )
    .await?;
    let client = Gemini::new(base_url, "gemini-2.0-flash", 5, 0.3)?;

    let result = client.translate_batch(&common::sample_entries(2), "", "French", "g-key").await;
    assert_eq!(result, Err(ProviderError::rate_limited()));
    Ok(())
}

#[tokio::test]
async fn test_gemini_withMalformedText_shouldBeParseError() -> anyhow::Result<()> {
    let (base_url, _request) = common::serve_once("200 OK", &gemini_body("Sure! Here you go.")).await?;
    let client = Gemini::new(base_url, "gemini-2.0-flash", 5, 0.3)?;

    let result = client.translate_batch(&common::sample_entries(1), "", "French", "g-key").await;
    assert!(matches!(result, Err(ProviderError::ParseError(_))));
    Ok(())
}

#[tokio::test]
async fn test_gemini_withUnresponsiveServer_shouldTimeOut() -> anyhow::Result<()> {
    let base_url = common::serve_silence(std::time::Duration::from_secs(5)).await?;
    let client = Gemini::new(base_url, "gemini-2.0-flash", 1, 0.3)?;

    let result = client.translate_batch(&common::sample_entries(1), "", "French", "g-key").await;
    assert!(matches!(result, Err(ProviderError::ConnectionError(_))));
    Ok(())
}

#[tokio::test]
async fn test_openai_withSuccessfulResponse_shouldReturnResultsAndSendBearer() -> anyhow::Result<()> {
    let inner = r#"{"translations":[{"id":1,"translatedText":"Xin chào"}]}"#;
    let (base_url, request) = common::serve_once("200 OK", &openai_body(inner)).await?;
    let client = OpenAI::new(format!("{}/v1", base_url), "gpt-4o-mini", 5, 0.3)?;

    let results = client.translate_batch(&common::sample_entries(1), "casual", "Vietnamese", "sk-test").await?;
    assert_eq!(results, vec![TranslationResult { id: 1, translated_text: "Xin chào".to_string() }]);

    let request = request.await?;
    assert!(request.head.starts_with("POST /v1/chat/completions"));
    assert!(request.head.to_lowercase().contains("authorization: bearer sk-test"));
    assert!(request.body.contains("json_schema"));
    assert!(request.body.contains("casual"));
    Ok(())
}

#[tokio::test]
async fn test_openai_with500_shouldBeApiErrorWithProviderMessage() -> anyhow::Result<()> {
    let (base_url, _request) = common::serve_once(
        "500 Internal Server Error",
        r#"{"error":{"message":"The server had an error while processing your request"}}"#,
    )
    .await?;
    let client = OpenAI::new(base_url, "gpt-4o-mini", 5, 0.3)?;

    let result = client.translate_batch(&common::sample_entries(2), "", "French", "sk-test").await;
    match result {
        Err(error @ ProviderError::ApiError { status_code: 500, .. }) => {
            assert!(error.is_transport());
            assert!(error.to_string().contains("The server had an error"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_openai_with401_shouldBeAuthentication() -> anyhow::Result<()> {
    let (base_url, _request) = common::serve_once(
        "401 Unauthorized",
        r#"{"error":{"message":"Incorrect API key provided"}}"#,
    )
    .await?;
    let client = OpenAI::new(base_url, "gpt-4o-mini", 5, 0.3)?;

    let result = client.translate_batch(&common::sample_entries(1), "", "French", "sk-bad").await;
    assert_eq!(result, Err(ProviderError::AuthenticationError("Incorrect API key provided".to_string())));
    Ok(())
}
