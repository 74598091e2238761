/*!
 * Provider adapters for the translation services.
 *
 * Every backend sits behind the [`TranslationProvider`] trait so the batch
 * orchestrator never knows which service it is talking to:
 * - Gemini: Google Generative Language API
 * - OpenAI: Chat Completions API
 * - Mock: scripted in-process provider for tests and benchmarks
 */

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{ProviderKind, TranslationConfig};
use crate::errors::ProviderError;
use crate::subtitle_processor::SubtitleEntry;

/// One translated entry as returned by a provider, addressed by the original id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Id of the source entry
    pub id: u64,
    /// Translated text for that entry
    #[serde(rename = "translatedText")]
    pub translated_text: String,
}

/// Common trait for all translation backends
///
/// One call is one network request; nothing is cached or retried here.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Which backend this adapter talks to
    fn kind(&self) -> ProviderKind;

    /// Translate one batch of entries into the target language
    ///
    /// # Arguments
    /// * `entries` - The batch, non-empty
    /// * `style_instruction` - Free-text style guidance; blank selects the default style
    /// * `target_language` - Human-readable target language name
    /// * `api_key` - Secret for the backend; blank fails before any request is made
    async fn translate_batch(
        &self,
        entries: &[SubtitleEntry],
        style_instruction: &str,
        target_language: &str,
        api_key: &str,
    ) -> Result<Vec<TranslationResult>, ProviderError>;
}

/// Fail fast on missing credentials
pub fn ensure_credentials(kind: ProviderKind, api_key: &str) -> Result<(), ProviderError> {
    if api_key.trim().is_empty() {
        return Err(ProviderError::AuthenticationError(format!(
            "no API key configured for {}",
            kind.display_name()
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Map a non-success HTTP response to the error taxonomy
///
/// Both supported APIs report failures as `{"error": {"message": ...}}`;
/// the raw body is used when it has another shape.
pub fn map_http_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                trimmed.chars().take(300).collect()
            }
        });

    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    }
}

/// HTTP client shared by the adapters
pub(crate) fn build_http_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::ConnectionError(format!("failed to build HTTP client: {}", e)))
}

/// Registered adapters keyed by provider
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn TranslationProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the Gemini and OpenAI adapters from configuration
    pub fn from_config(config: &TranslationConfig) -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        registry.register(Arc::new(gemini::Gemini::new(
            config.get_endpoint_for(ProviderKind::Gemini),
            config.get_model_for(ProviderKind::Gemini),
            config.get_timeout_secs_for(ProviderKind::Gemini),
            config.common.temperature,
        )?));
        registry.register(Arc::new(openai::OpenAI::new(
            config.get_endpoint_for(ProviderKind::OpenAI),
            config.get_model_for(ProviderKind::OpenAI),
            config.get_timeout_secs_for(ProviderKind::OpenAI),
            config.common.temperature,
        )?));
        Ok(registry)
    }

    /// Register an adapter, replacing any previous one for the same provider
    pub fn register(&mut self, provider: Arc<dyn TranslationProvider>) -> &mut Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    /// Look up the adapter for a provider
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn TranslationProvider>> {
        self.providers.get(&kind).cloned()
    }

    /// Providers with a registered adapter
    pub fn kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.providers.contains_key(kind))
            .collect()
    }
}

pub mod gemini;
pub mod mock;
pub mod openai;
