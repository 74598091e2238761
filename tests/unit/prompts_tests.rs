/*!
 * Tests for request construction and response parsing
 */

use serde_json::Value;
use subtrans::errors::ProviderError;
use subtrans::subtitle_processor::SubtitleEntry;
use subtrans::translation::prompts::{
    DEFAULT_STYLE_INSTRUCTION, build_system_instruction, build_user_payload, parse_translation_response,
    response_json_schema,
};

fn batch() -> Vec<SubtitleEntry> {
    vec![
        SubtitleEntry::new(1, 0, 1000, "Hello"),
        SubtitleEntry::new(2, 1000, 2000, "World"),
        SubtitleEntry::new(3, 2000, 3000, "!"),
    ]
}

#[test]
fn test_systemInstruction_shouldEnumerateStructuralRules() {
    let instruction = build_system_instruction("Vietnamese", "");
    assert!(instruction.contains("Translate EVERY entry"));
    assert!(instruction.contains("\"id\" exactly"));
    assert!(instruction.contains("Never merge"));
    assert!(instruction.contains(DEFAULT_STYLE_INSTRUCTION));
    assert!(instruction.contains("translations"));
}

#[test]
fn test_userPayload_shouldPreserveBatchOrder() {
    let payload: Value = serde_json::from_str(&build_user_payload(&batch())).unwrap();
    let ids: Vec<u64> = payload["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_responseSchema_shouldRequireIdAndText() {
    let schema = response_json_schema();
    let required = &schema["properties"]["translations"]["items"]["required"];
    assert_eq!(required, &serde_json::json!(["id", "translatedText"]));
}

#[test]
fn test_parse_withMalformedBody_shouldBeStructuralError() {
    let result = parse_translation_response("Sure! Here are your translations:", &batch());
    assert!(matches!(result, Err(ProviderError::ParseError(_))));
}

#[test]
fn test_parse_withWrongShape_shouldBeStructuralError() {
    let result = parse_translation_response(r#"{"items":[{"id":1,"text":"x"}]}"#, &batch());
    assert!(matches!(result, Err(ProviderError::ParseError(_))));
}

#[test]
fn test_parse_withFewerEntries_shouldReturnWhatArrived() {
    let body = r#"{"translations":[{"id":1,"translatedText":"Xin chào"}]}"#;
    let results = parse_translation_response(body, &batch()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 1);
}

#[test]
fn test_parse_withStringIds_shouldDropThemWithoutCoercion() {
    let body = r#"{"translations":[{"id":"1","translatedText":"A"},{"id":2,"translatedText":"B"},{"id":2.5,"translatedText":"C"}]}"#;
    let results = parse_translation_response(body, &batch()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 2);
}

#[test]
fn test_parse_withIdOutsideBatch_shouldStillReturnIt() {
    let body = r#"{"translations":[{"id":42,"translatedText":"?"}]}"#;
    let results = parse_translation_response(body, &batch()).unwrap();
    assert_eq!(results[0].id, 42);
}
