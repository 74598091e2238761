use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::app_config::ProviderKind;
use crate::errors::ProviderError;
use crate::subtitle_processor::SubtitleEntry;
use crate::translation::prompts;
use super::{TranslationProvider, TranslationResult, build_http_client, ensure_credentials, map_http_error};

/// Gemini client for the Generative Language API
#[derive(Debug)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API base URL, e.g. https://generativelanguage.googleapis.com/v1beta
    endpoint: String,
    /// Model used for every request
    model: String,
    /// Sampling temperature
    temperature: f32,
}

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// System instruction guiding the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,

    /// Conversation turns
    contents: Vec<GeminiContent>,

    /// Sampling and output format settings
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// A content block made of text parts
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A single text part
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

/// Generation settings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

/// generateContent response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// One response candidate
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token accounting
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart { text: text.into() }],
        }
    }
}

impl GenerateContentRequest {
    /// Create a request with a single user turn
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            contents: vec![GeminiContent::text(Some("user"), user_text)],
            generation_config: None,
        }
    }

    /// Set the system instruction
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system_instruction = Some(GeminiContent::text(None, system));
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config_mut().temperature = Some(temperature);
        self
    }

    /// Constrain the answer to JSON matching a schema
    pub fn json_schema(mut self, schema: Value) -> Self {
        let config = self.config_mut();
        config.response_mime_type = Some("application/json".to_string());
        config.response_schema = Some(schema);
        self
    }

    fn config_mut(&mut self) -> &mut GenerationConfig {
        self.generation_config.get_or_insert(GenerationConfig {
            temperature: None,
            response_mime_type: None,
            response_schema: None,
        })
    }
}

/// Response schema in the OpenAPI subset Gemini accepts
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "translations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "INTEGER" },
                        "translatedText": { "type": "STRING" }
                    },
                    "required": ["id", "translatedText"]
                }
            }
        },
        "required": ["translations"]
    })
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout_secs: u64, temperature: f32) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            endpoint: endpoint.into(),
            model: model.into(),
            temperature,
        })
    }

    /// Build the request for one batch
    pub fn build_request(&self, entries: &[SubtitleEntry], style_instruction: &str, target_language: &str) -> GenerateContentRequest {
        GenerateContentRequest::new(prompts::build_user_payload(entries))
            .system(prompts::build_system_instruction(target_language, style_instruction))
            .temperature(self.temperature)
            .json_schema(response_schema())
    }

    /// Call generateContent
    pub async fn generate(&self, request: &GenerateContentRequest, api_key: &str) -> Result<GenerateContentResponse, ProviderError> {
        let api_url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );

        let response = self.client.post(&api_url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(map_http_error(status, &error_text));
        }

        let body = response.text().await?;
        serde_json::from_str::<GenerateContentResponse>(&body)
            .map_err(|e| ProviderError::ParseError(format!("unexpected Gemini response: {}", e)))
    }

    /// Concatenate the text parts of the first candidate
    pub fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let content = response.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|part| part.text.as_str()).collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

#[async_trait]
impl TranslationProvider for Gemini {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn translate_batch(
        &self,
        entries: &[SubtitleEntry],
        style_instruction: &str,
        target_language: &str,
        api_key: &str,
    ) -> Result<Vec<TranslationResult>, ProviderError> {
        ensure_credentials(self.kind(), api_key)?;

        let request = self.build_request(entries, style_instruction, target_language);
        let response = self.generate(&request, api_key).await?;

        if let Some(usage) = &response.usage_metadata {
            debug!("Gemini usage: {} prompt / {} candidate tokens", usage.prompt_token_count, usage.candidates_token_count);
        }

        let text = Self::extract_text(&response).ok_or_else(|| {
            let reason = response.candidates.first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            ProviderError::ParseError(format!("Gemini returned no text ({})", reason))
        })?;

        prompts::parse_translation_response(&text, entries)
    }
}
