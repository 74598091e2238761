/*!
 * Prompt construction and response parsing shared by every provider adapter.
 *
 * The structural rules a provider must follow (translate everything, keep
 * ids, never merge entries, answer in a fixed schema) live here so each
 * adapter gets them by construction rather than by convention.
 */

use log::warn;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashSet;

use crate::errors::ProviderError;
use crate::providers::TranslationResult;
use crate::subtitle_processor::SubtitleEntry;

/// Style used when a task carries no instruction of its own
pub const DEFAULT_STYLE_INSTRUCTION: &str =
    "Natural, fluent and contextually appropriate, the way a native speaker would say it on screen.";

/// Resolve the style instruction for a batch, falling back to the default for blank input
pub fn effective_style(style_instruction: &str) -> &str {
    let trimmed = style_instruction.trim();
    if trimmed.is_empty() {
        DEFAULT_STYLE_INSTRUCTION
    } else {
        trimmed
    }
}

/// Build the system-level instruction sent with every batch
pub fn build_system_instruction(target_language: &str, style_instruction: &str) -> String {
    format!(
        "You are a professional subtitle translator. Translate subtitle entries into {target}.\n\
         \n\
         RULES:\n\
         1. Translate EVERY entry you receive. Never omit, skip or summarize an entry.\n\
         2. Copy each entry's \"id\" exactly as given. Never renumber, invent or drop ids.\n\
         3. Never merge the content of several entries into one output item, and never split one entry. \
         Return exactly one item per input entry.\n\
         4. Keep line breaks inside an entry as \\n and keep formatting tags such as <i> untouched.\n\
         5. Translation style: {style}\n\
         6. Respond ONLY with a JSON object of the form \
         {{\"translations\": [{{\"id\": <number>, \"translatedText\": \"<text>\"}}]}} and nothing else.",
        target = target_language,
        style = effective_style(style_instruction),
    )
}

/// Build the user-level payload listing the batch as {id, text} pairs
pub fn build_user_payload(entries: &[SubtitleEntry]) -> String {
    let items: Vec<Value> = entries
        .iter()
        .map(|entry| json!({ "id": entry.id, "text": entry.text }))
        .collect();

    json!({ "entries": items }).to_string()
}

/// JSON Schema of the expected response object
pub fn response_json_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "translations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "translatedText": { "type": "string" }
                    },
                    "required": ["id", "translatedText"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["translations"],
        "additionalProperties": false
    })
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    translations: Vec<RawTranslation>,
}

#[derive(Debug, Deserialize)]
struct RawTranslation {
    id: Value,
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Parse the model's JSON answer for one batch
///
/// A body that does not fit the schema fails the whole batch. Items whose id
/// is not a JSON integer are dropped rather than coerced, and a short answer
/// is returned as-is after a warning: entries without a result keep their
/// original text downstream.
pub fn parse_translation_response(
    body: &str,
    batch: &[SubtitleEntry],
) -> Result<Vec<TranslationResult>, ProviderError> {
    let envelope: RawEnvelope = serde_json::from_str(strip_code_fence(body)).map_err(|e| {
        ProviderError::ParseError(format!("{} (body starts with: {})", e, preview(body)))
    })?;

    let batch_ids: HashSet<u64> = batch.iter().map(|entry| entry.id).collect();
    let mut results = Vec::with_capacity(envelope.translations.len());

    for item in envelope.translations {
        match item.id.as_u64() {
            Some(id) => {
                if !batch_ids.contains(&id) {
                    warn!("Provider returned id {} which is not part of this batch", id);
                }
                results.push(TranslationResult {
                    id,
                    translated_text: item.translated_text,
                });
            }
            None => warn!("Ignoring translation with non-integer id {}", item.id),
        }
    }

    if results.len() != batch.len() {
        warn!(
            "Translation count mismatch: sent {} entries, received {}",
            batch.len(),
            results.len()
        );
    }

    Ok(results)
}

/// Remove a surrounding markdown code fence, which some models add despite the schema
fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn preview(body: &str) -> String {
    body.chars().take(120).collect()
}
