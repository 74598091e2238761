/*!
 * Batch translation processing.
 *
 * A file's entries are cut into consecutive batches of at most
 * `batch_size` entries. Batches are sent one after another, each answer is
 * merged back by id into a working copy, and the working copy is published
 * after every batch so partial progress is visible mid-run.
 */

use log::{debug, error, info};
use std::time::{Duration, Instant};

use crate::app_config::TranslationCommonConfig;
use crate::errors::TranslationError;
use crate::providers::{TranslationProvider, TranslationResult};
use crate::subtitle_processor::SubtitleEntry;
use crate::tasks::{FileTask, TaskUpdate};

/// Batching parameters for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOptions {
    /// Maximum entries per request
    pub batch_size: usize,
    /// Pause between two consecutive batches
    pub batch_delay: Duration,
}

impl BatchOptions {
    pub fn new(batch_size: usize, batch_delay: Duration) -> Self {
        Self { batch_size, batch_delay }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&TranslationCommonConfig::default())
    }
}

impl From<&TranslationCommonConfig> for BatchOptions {
    fn from(config: &TranslationCommonConfig) -> Self {
        Self::new(config.batch_size, config.batch_delay())
    }
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The task had no entries; nothing was changed
    Skipped,
    /// Every batch was translated
    Completed {
        /// Provider calls made
        batches: usize,
        /// Entries whose text was replaced
        translated: usize,
    },
}

/// Split entries into consecutive batches of at most `batch_size`
///
/// A zero batch size is treated as one.
pub fn partition(entries: &[SubtitleEntry], batch_size: usize) -> Vec<&[SubtitleEntry]> {
    entries.chunks(batch_size.max(1)).collect()
}

/// Overwrite the text of entries in `window` whose id matches a result
///
/// Ids are compared exactly; results for ids outside the window are ignored.
/// Returns the number of entries updated.
pub fn merge_results(window: &mut [SubtitleEntry], results: &[TranslationResult]) -> usize {
    let mut updated = 0;
    for result in results {
        if let Some(entry) = window.iter_mut().find(|entry| entry.id == result.id) {
            entry.text = result.translated_text.clone();
            updated += 1;
        }
    }
    updated
}

/// Percentage of work done after `completed` of `total` batches
pub fn progress_after(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed.min(total) * 100) / total) as u8
}

/// Drives one file's translation run
#[derive(Debug, Clone, Default)]
pub struct BatchTranslator {
    options: BatchOptions,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(options: BatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Translate every batch of `task`, reporting state through `on_update`
    ///
    /// The task itself is never modified here; the owner applies the updates.
    /// The first failing batch aborts the run: a `Failed` update is published
    /// and the error is returned. Batches are not retried.
    pub async fn run(
        &self,
        task: &FileTask,
        provider: &dyn TranslationProvider,
        api_key: &str,
        target_language: &str,
        on_update: &mut (dyn FnMut(TaskUpdate) + Send),
    ) -> Result<RunOutcome, TranslationError> {
        let original = task.original_subs();
        if original.is_empty() {
            debug!("Skipping {}: no subtitle entries", task.file_name());
            return Ok(RunOutcome::Skipped);
        }

        on_update(TaskUpdate::Started);

        let batch_size = self.options.batch_size.max(1);
        let total_batches = partition(original, batch_size).len();
        let mut working = original.to_vec();
        let mut translated = 0;
        let start_time = Instant::now();

        info!(
            "Translating {} ({} entries, {} batches) with {}",
            task.file_name(),
            original.len(),
            total_batches,
            provider.kind().display_name()
        );

        for batch_index in 0..total_batches {
            let start = batch_index * batch_size;
            let end = (start + batch_size).min(working.len());
            let batch = &original[start..end];

            debug!(
                "Batch {}/{} of {}: entries {}-{}",
                batch_index + 1,
                total_batches,
                task.file_name(),
                batch[0].id,
                batch[batch.len() - 1].id
            );

            let results = match provider
                .translate_batch(batch, task.prompt(), target_language, api_key)
                .await
            {
                Ok(results) => results,
                Err(e) => {
                    error!("Batch {}/{} of {} failed: {}", batch_index + 1, total_batches, task.file_name(), e);
                    let error = TranslationError::from(e);
                    on_update(TaskUpdate::Failed { message: error.to_string() });
                    return Err(error);
                }
            };

            translated += merge_results(&mut working[start..end], &results);
            on_update(TaskUpdate::Progress {
                processed_subs: working.clone(),
                progress: progress_after(batch_index + 1, total_batches),
            });

            let is_last = batch_index + 1 == total_batches;
            if !is_last && !self.options.batch_delay.is_zero() {
                tokio::time::sleep(self.options.batch_delay).await;
            }
        }

        on_update(TaskUpdate::Completed);
        info!(
            "Translated {} in {:?} ({}/{} entries updated)",
            task.file_name(),
            start_time.elapsed(),
            translated,
            original.len()
        );

        Ok(RunOutcome::Completed {
            batches: total_batches,
            translated,
        })
    }
}
