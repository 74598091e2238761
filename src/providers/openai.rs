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

/// OpenAI client for the Chat Completions API
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API base URL, e.g. https://api.openai.com/v1
    endpoint: String,
    /// Model used for every request
    model: String,
    /// Sampling temperature
    temperature: f32,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Structured output constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

/// Chat message
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// One completion choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl OpenAIRequest {
    /// Create a new request for a model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            response_format: None,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: Some(content.into()),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Constrain the answer to a strict JSON schema
    pub fn json_schema(mut self, name: &str, schema: Value) -> Self {
        self.response_format = Some(json!({
            "type": "json_schema",
            "json_schema": {
                "name": name,
                "strict": true,
                "schema": schema
            }
        }));
        self
    }
}

impl OpenAI {
    /// Create a new OpenAI client
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout_secs: u64, temperature: f32) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            endpoint: endpoint.into(),
            model: model.into(),
            temperature,
        })
    }

    /// Build the request for one batch
    pub fn build_request(&self, entries: &[SubtitleEntry], style_instruction: &str, target_language: &str) -> OpenAIRequest {
        OpenAIRequest::new(self.model.clone())
            .add_message("system", prompts::build_system_instruction(target_language, style_instruction))
            .add_message("user", prompts::build_user_payload(entries))
            .temperature(self.temperature)
            .json_schema("subtitle_translations", prompts::response_json_schema())
    }

    /// Send a chat completion request
    pub async fn complete(&self, request: &OpenAIRequest, api_key: &str) -> Result<OpenAIResponse, ProviderError> {
        let api_url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));

        let response = self.client.post(&api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error ({}): {}", status, error_text);
            return Err(map_http_error(status, &error_text));
        }

        let body = response.text().await?;
        serde_json::from_str::<OpenAIResponse>(&body)
            .map_err(|e| ProviderError::ParseError(format!("unexpected OpenAI response: {}", e)))
    }

    /// Extract the assistant text from a response
    pub fn extract_text(response: &OpenAIResponse) -> Option<&str> {
        response.choices.first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[async_trait]
impl TranslationProvider for OpenAI {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
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
        let response = self.complete(&request, api_key).await?;

        if let Some(usage) = &response.usage {
            debug!("OpenAI usage: {} prompt / {} completion tokens", usage.prompt_tokens, usage.completion_tokens);
        }
        if let Some(reason) = response.choices.first().and_then(|c| c.finish_reason.as_deref()) {
            if reason != "stop" {
                debug!("OpenAI finished with reason '{}'", reason);
            }
        }

        let text = Self::extract_text(&response)
            .ok_or_else(|| ProviderError::ParseError("OpenAI response contained no message content".to_string()))?;

        prompts::parse_translation_response(text, entries)
    }
}
