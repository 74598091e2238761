/*!
 * Integration tests for the batch translator driving a mock provider
 */

use std::time::{Duration, Instant};
use subtrans::errors::{ProviderError, TranslationError};
use subtrans::providers::TranslationResult;
use subtrans::providers::mock::{MockProvider, MockReply};
use subtrans::subtitle_processor::SubtitleEntry;
use subtrans::tasks::{FileTask, TaskUpdate};
use subtrans::translation::{BatchOptions, BatchTranslator, RunOutcome};
use crate::common;

fn translator(batch_size: usize) -> BatchTranslator {
    BatchTranslator::new(BatchOptions::new(batch_size, Duration::ZERO))
}

fn result(id: u64, text: &str) -> TranslationResult {
    TranslationResult { id, translated_text: text.to_string() }
}

fn hello_world_task() -> FileTask {
    FileTask::new(
        "hello.srt",
        vec![
            SubtitleEntry::new(1, 1000, 2000, "Hello"),
            SubtitleEntry::new(2, 3000, 4000, "World"),
            SubtitleEntry::new(3, 5000, 6000, "!"),
        ],
    )
}

/// Run a task and collect every published update
async fn run_collecting(
    translator: &BatchTranslator,
    task: &FileTask,
    provider: &MockProvider,
) -> (Result<RunOutcome, TranslationError>, Vec<TaskUpdate>) {
    let mut updates = Vec::new();
    let mut record = |update: TaskUpdate| updates.push(update);
    let outcome = translator.run(task, provider, "test-key", "Vietnamese", &mut record).await;
    (outcome, updates)
}

fn progress_values(updates: &[TaskUpdate]) -> Vec<u8> {
    updates
        .iter()
        .filter_map(|update| match update {
            TaskUpdate::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

fn last_processed(updates: &[TaskUpdate]) -> Vec<SubtitleEntry> {
    updates
        .iter()
        .rev()
        .find_map(|update| match update {
            TaskUpdate::Progress { processed_subs, .. } => Some(processed_subs.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_run_shouldMakeCeilNOverBCalls() {
    for (count, batch_size) in [(1u64, 30usize), (30, 30), (31, 30), (95, 40), (7, 2), (5, 1)] {
        let provider = MockProvider::working();
        let task = FileTask::new("f.srt", common::sample_entries(count));
        let (outcome, _) = run_collecting(&translator(batch_size), &task, &provider).await;

        let expected = (count as usize).div_ceil(batch_size);
        assert_eq!(provider.call_count(), expected, "count={} batch_size={}", count, batch_size);
        assert!(matches!(outcome, Ok(RunOutcome::Completed { batches, .. }) if batches == expected));

        let sent: Vec<u64> = provider.calls().into_iter().flat_map(|call| call.entry_ids).collect();
        let original: Vec<u64> = task.original_subs().iter().map(|e| e.id).collect();
        assert_eq!(sent, original);
    }
}

#[tokio::test]
async fn test_run_helloWorldScenario_shouldTranslateAllEntries() {
    let provider = MockProvider::scripted([
        MockReply::Results(vec![result(1, "Xin chào"), result(2, "Thế giới")]),
        MockReply::Results(vec![result(3, "!")]),
    ]);
    let task = hello_world_task();
    let (outcome, updates) = run_collecting(&translator(2), &task, &provider).await;

    assert!(outcome.is_ok());
    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].entry_ids, vec![1, 2]);
    assert_eq!(calls[1].entry_ids, vec![3]);

    assert_eq!(updates.first(), Some(&TaskUpdate::Started));
    assert_eq!(updates.last(), Some(&TaskUpdate::Completed));
    assert_eq!(progress_values(&updates), vec![50, 100]);

    let processed = last_processed(&updates);
    let texts: Vec<&str> = processed.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Xin chào", "Thế giới", "!"]);
    assert_eq!(processed[1].start_time_ms, 3000);
}

#[tokio::test]
async fn test_run_withSecondBatchRateLimited_shouldKeepFirstBatchOnly() {
    let provider = MockProvider::scripted([
        MockReply::Results(vec![result(1, "Xin chào"), result(2, "Thế giới")]),
        MockReply::Fail(ProviderError::rate_limited()),
    ]);
    let task = hello_world_task();
    let (outcome, updates) = run_collecting(&translator(2), &task, &provider).await;

    let error = outcome.unwrap_err();
    assert_eq!(error, TranslationError::Provider(ProviderError::rate_limited()));
    assert_eq!(
        updates.last(),
        Some(&TaskUpdate::Failed { message: error.to_string() })
    );
    assert_eq!(progress_values(&updates), vec![50]);

    let processed = last_processed(&updates);
    assert_eq!(processed[0].text, "Xin chào");
    assert_eq!(processed[2].text, "!");
    assert_eq!(processed[2], task.original_subs()[2]);
}

#[tokio::test]
async fn test_run_withFailingFirstBatch_shouldNotAttemptRemainingBatches() {
    let provider = MockProvider::failing(ProviderError::ConnectionError("refused".to_string()));
    let task = FileTask::new("f.srt", common::sample_entries(6));
    let (outcome, updates) = run_collecting(&translator(2), &task, &provider).await;

    assert!(outcome.is_err());
    assert_eq!(provider.call_count(), 1);
    assert!(progress_values(&updates).is_empty());
}

#[tokio::test]
async fn test_run_withUnmatchedIds_shouldLeaveTextUntouched() {
    let provider = MockProvider::scripted([MockReply::Results(vec![result(99, "ghost"), result(3, "other batch")])]);
    let task = FileTask::new("f.srt", common::sample_entries(2));
    let (outcome, updates) = run_collecting(&translator(2), &task, &provider).await;

    assert_eq!(outcome.unwrap(), RunOutcome::Completed { batches: 1, translated: 0 });
    assert_eq!(last_processed(&updates), task.original_subs());
}

#[tokio::test]
async fn test_run_withShortAnswer_shouldKeepOriginalForMissingIds() {
    let provider = MockProvider::scripted([MockReply::Results(vec![result(2, "deux")])]);
    let task = FileTask::new("f.srt", common::sample_entries(3));
    let (_, updates) = run_collecting(&translator(3), &task, &provider).await;

    let processed = last_processed(&updates);
    assert_eq!(processed.len(), 3);
    assert_eq!(processed[0].text, "Line 1");
    assert_eq!(processed[1].text, "deux");
    assert_eq!(processed[2].text, "Line 3");
}

#[tokio::test]
async fn test_run_progress_shouldBeMonotonicAndEndAt100() {
    let provider = MockProvider::working();
    let task = FileTask::new("f.srt", common::sample_entries(7));
    let (_, updates) = run_collecting(&translator(1), &task, &provider).await;

    let values = progress_values(&updates);
    assert_eq!(values.len(), 7);
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(values.last(), Some(&100));
    assert!(values[..6].iter().all(|v| *v < 100));
}

#[tokio::test]
async fn test_run_withEmptyTask_shouldBeNoOp() {
    let provider = MockProvider::working();
    let task = FileTask::new("empty.srt", Vec::new());
    let (outcome, updates) = run_collecting(&translator(2), &task, &provider).await;

    assert_eq!(outcome.unwrap(), RunOutcome::Skipped);
    assert!(updates.is_empty());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_run_shouldPassPromptAndLanguageToProvider() {
    let provider = MockProvider::working();
    let task = FileTask::new("f.srt", common::sample_entries(1)).with_prompt("Formal, no contractions");
    run_collecting(&translator(5), &task, &provider).await.0.unwrap();

    let call = &provider.calls()[0];
    assert_eq!(call.style_instruction, "Formal, no contractions");
    assert_eq!(call.target_language, "Vietnamese");
    assert_eq!(call.api_key, "test-key");
}

#[tokio::test]
async fn test_run_withEmptyKey_shouldFailWithAuthentication() {
    let provider = MockProvider::working();
    let task = FileTask::new("f.srt", common::sample_entries(2));
    let mut updates = Vec::new();
    let mut record = |update: TaskUpdate| updates.push(update);
    let outcome = translator(2).run(&task, &provider, "", "Vietnamese", &mut record).await;

    assert!(matches!(
        outcome,
        Err(TranslationError::Provider(ProviderError::AuthenticationError(_)))
    ));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_run_delay_shouldOnlyApplyBetweenBatches() {
    let delay = Duration::from_millis(40);
    let translator = BatchTranslator::new(BatchOptions::new(1, delay));

    let provider = MockProvider::working();
    let task = FileTask::new("f.srt", common::sample_entries(3));
    let start = Instant::now();
    run_collecting(&translator, &task, &provider).await.0.unwrap();
    assert!(start.elapsed() >= delay * 2);

    let single = FileTask::new("g.srt", common::sample_entries(1));
    let translator = BatchTranslator::new(BatchOptions::new(1, Duration::from_secs(5)));
    let start = Instant::now();
    run_collecting(&translator, &single, &provider).await.0.unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));
}
