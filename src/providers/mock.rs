/*!
 * Mock provider implementation for testing.
 *
 * - `MockProvider::working()` - Translates every entry as `[<target>] <text>`
 * - `MockProvider::failing(error)` - Always fails with the given error
 * - `MockProvider::scripted(replies)` - Plays back one reply per call, then
 *   falls back to working behavior
 *
 * Every call is recorded so tests can assert on batch boundaries.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::ProviderKind;
use crate::errors::ProviderError;
use crate::subtitle_processor::SubtitleEntry;
use super::{TranslationProvider, TranslationResult, ensure_credentials};

/// One scripted answer
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Translate every entry of the batch
    Translate,
    /// Return exactly these results
    Results(Vec<TranslationResult>),
    /// Fail the call
    Fail(ProviderError),
}

/// What the provider received on one call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    /// Ids of the batch, in order
    pub entry_ids: Vec<u64>,
    /// Style instruction as passed in
    pub style_instruction: String,
    /// Target language as passed in
    pub target_language: String,
    /// Credentials as passed in
    pub api_key: String,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    kind: ProviderKind,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    fallback: MockReply,
    calls: Arc<Mutex<Vec<MockCall>>>,
    latency: Option<Duration>,
}

impl MockProvider {
    fn with_fallback(fallback: MockReply) -> Self {
        Self {
            kind: ProviderKind::Gemini,
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            calls: Arc::new(Mutex::new(Vec::new())),
            latency: None,
        }
    }

    /// Create a mock that always succeeds
    pub fn working() -> Self {
        Self::with_fallback(MockReply::Translate)
    }

    /// Create a mock that always fails with `error`
    pub fn failing(error: ProviderError) -> Self {
        Self::with_fallback(MockReply::Fail(error))
    }

    /// Create a mock that plays back `replies` in order
    pub fn scripted(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let provider = Self::working();
        provider.script.lock().extend(replies);
        provider
    }

    /// Report a different provider kind
    pub fn with_kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sleep before answering each call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Translation produced by the `Translate` reply
    pub fn translate_text(target_language: &str, text: &str) -> String {
        format!("[{}] {}", target_language, text)
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn translate_batch(
        &self,
        entries: &[SubtitleEntry],
        style_instruction: &str,
        target_language: &str,
        api_key: &str,
    ) -> Result<Vec<TranslationResult>, ProviderError> {
        ensure_credentials(self.kind, api_key)?;

        self.calls.lock().push(MockCall {
            entry_ids: entries.iter().map(|e| e.id).collect(),
            style_instruction: style_instruction.to_string(),
            target_language: target_language.to_string(),
            api_key: api_key.to_string(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self.script.lock().pop_front().unwrap_or_else(|| self.fallback.clone());
        match reply {
            MockReply::Translate => Ok(entries
                .iter()
                .map(|entry| TranslationResult {
                    id: entry.id,
                    translated_text: Self::translate_text(target_language, &entry.text),
                })
                .collect()),
            MockReply::Results(results) => Ok(results),
            MockReply::Fail(error) => Err(error),
        }
    }
}
