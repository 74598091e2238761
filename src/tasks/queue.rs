/*!
 * Task queue for subtitle files.
 *
 * The queue owns every `FileTask` and is the only writer of task state. A
 * run visits each task that is not yet completed, one at a time and in
 * insertion order, and applies the batch translator's updates as they come
 * in. Only one run can be active at a time.
 */

use anyhow::Result;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::app_config::{Config, ProviderKind};
use crate::credentials::CredentialStore;
use crate::errors::{QueueError, TranslationError};
use crate::language_utils;
use crate::providers::ProviderRegistry;
use crate::subtitle_processor::{SubtitleCodec, decode_text};
use crate::translation::{BatchOptions, BatchTranslator, RunOutcome};
use super::models::{FileTask, TaskStatus, TaskSummary, TaskUpdate};

/// Callback invoked with a task after each state change
///
/// Runs while the queue is locked and must not call back into the queue.
pub type ProgressObserver = Arc<dyn Fn(&FileTask) + Send + Sync>;

/// Settings applied to every run of a queue
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Provider used for translation and export naming
    pub provider: ProviderKind,
    /// Target language name as embedded in the instructions, e.g. "Vietnamese"
    pub target_language: String,
    /// Style instruction given to newly enqueued tasks
    pub default_prompt: String,
    /// Batching parameters
    pub batch: BatchOptions,
}

impl QueueOptions {
    /// Derive options from the application configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            provider: config.translation.provider,
            target_language: language_utils::get_language_name(&config.target_language)?,
            default_prompt: config.translation.common.default_prompt.clone(),
            batch: BatchOptions::from(&config.translation.common),
        })
    }
}

/// Outcome of one queue run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueReport {
    /// Tasks selected for this run
    pub attempted: usize,
    /// Tasks that finished every batch
    pub completed: usize,
    /// Tasks with no entries, left unchanged
    pub skipped: usize,
    /// File name and message of each task that failed
    pub failures: Vec<(String, String)>,
}

/// Clears the in-flight flag when dropped
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the file tasks and runs them through the batch translator
#[derive(Clone)]
pub struct TaskQueue {
    tasks: Arc<Mutex<Vec<FileTask>>>,
    running: Arc<AtomicBool>,
    registry: ProviderRegistry,
    credentials: Arc<dyn CredentialStore>,
    translator: BatchTranslator,
    options: QueueOptions,
    observer: Option<ProgressObserver>,
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("tasks", &self.tasks.lock().len())
            .field("running", &self.is_running())
            .field("options", &self.options)
            .finish()
    }
}

impl TaskQueue {
    /// Create an empty queue
    pub fn new(registry: ProviderRegistry, credentials: Arc<dyn CredentialStore>, options: QueueOptions) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            registry,
            credentials,
            translator: BatchTranslator::new(options.batch),
            options,
            observer: None,
        }
    }

    /// Register a callback receiving every task state change
    pub fn on_progress(&mut self, observer: impl Fn(&FileTask) + Send + Sync + 'static) {
        self.observer = Some(Arc::new(observer));
    }

    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    /// Whether a run is in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Read and parse files from disk, appending one task per path
    ///
    /// A file that cannot be read, decoded or parsed still produces a task,
    /// in Error status with no entries. Returns the new task ids in input order.
    pub async fn enqueue_files<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<String> {
        let mut ids = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());

            let task = match tokio::fs::read(path).await {
                Ok(bytes) => self.build_task(file_name, &bytes),
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    FileTask::failed(file_name, format!("Failed to read file: {}", e))
                }
            }
            .with_source_path(path);

            ids.push(self.push(task));
        }
        ids
    }

    /// Parse in-memory file content and append it as a task
    pub fn enqueue_source(&self, file_name: impl Into<String>, bytes: &[u8]) -> String {
        let task = self.build_task(file_name.into(), bytes);
        self.push(task)
    }

    fn build_task(&self, file_name: String, bytes: &[u8]) -> FileTask {
        let parsed = decode_text(bytes).and_then(|text| SubtitleCodec::parse(&text));
        match parsed {
            Ok(entries) => {
                debug!("Parsed {} entries from {}", entries.len(), file_name);
                FileTask::new(file_name, entries).with_prompt(self.options.default_prompt.clone())
            }
            Err(e) => {
                warn!("Rejected {}: {}", file_name, e);
                FileTask::failed(file_name, e.to_string())
            }
        }
    }

    fn push(&self, task: FileTask) -> String {
        let id = task.id().to_string();
        self.notify(&task);
        self.tasks.lock().push(task);
        id
    }

    fn notify(&self, task: &FileTask) {
        if let Some(observer) = &self.observer {
            observer(task);
        }
    }

    /// Snapshot of every task in queue order
    pub fn tasks(&self) -> Vec<FileTask> {
        self.tasks.lock().clone()
    }

    /// Snapshot of one task
    pub fn task(&self, id: &str) -> Option<FileTask> {
        self.tasks.lock().iter().find(|task| task.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Count tasks per status
    pub fn summary(&self) -> TaskSummary {
        TaskSummary::from_tasks(self.tasks.lock().iter())
    }

    /// Delete a task; refused while it is being processed
    pub fn remove_task(&self, id: &str) -> Result<FileTask, QueueError> {
        let mut tasks = self.tasks.lock();
        let index = tasks
            .iter()
            .position(|task| task.id() == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;

        if tasks[index].status() == TaskStatus::Processing {
            return Err(QueueError::TaskProcessing(id.to_string()));
        }
        Ok(tasks.remove(index))
    }

    /// Delete every completed task, returning how many were removed
    pub fn clear_completed(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|task| task.status() != TaskStatus::Completed);
        before - tasks.len()
    }

    /// Change a task's style instruction; takes effect on its next run
    pub fn set_prompt(&self, id: &str, prompt: impl Into<String>) -> Result<(), QueueError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|task| task.id() == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;

        if task.status() == TaskStatus::Processing {
            return Err(QueueError::TaskProcessing(id.to_string()));
        }
        task.set_prompt(prompt.into());
        Ok(())
    }

    /// Translate every task that is not completed, one after another
    ///
    /// Returns `None` without doing anything when a run is already active.
    /// A failing task is recorded and the run moves on to the next one.
    pub async fn run_queue(&self) -> Option<QueueReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Queue run requested while another run is active");
            return None;
        }
        let _guard = RunningGuard(&self.running);

        let pending: Vec<String> = self
            .tasks
            .lock()
            .iter()
            .filter(|task| task.status().is_pending())
            .map(|task| task.id().to_string())
            .collect();

        let mut report = QueueReport {
            attempted: pending.len(),
            ..QueueReport::default()
        };
        info!("Starting queue run over {} task(s)", pending.len());

        for id in pending {
            let Some(snapshot) = self.task(&id) else {
                continue;
            };

            match self.run_task(&snapshot).await {
                Ok(RunOutcome::Completed { .. }) => report.completed += 1,
                Ok(RunOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    error!("Translation of {} failed: {}", snapshot.file_name(), e);
                    report.failures.push((snapshot.file_name().to_string(), e.to_string()));
                }
            }
        }

        info!(
            "Queue run finished: {} completed, {} failed, {} skipped",
            report.completed,
            report.failures.len(),
            report.skipped
        );
        Some(report)
    }

    async fn run_task(&self, snapshot: &FileTask) -> Result<RunOutcome, TranslationError> {
        let tasks = Arc::clone(&self.tasks);
        let observer = self.observer.clone();
        let task_id = snapshot.id().to_string();
        let mut apply = move |update: TaskUpdate| {
            let mut tasks = tasks.lock();
            if let Some(task) = tasks.iter_mut().find(|task| task.id() == task_id) {
                task.apply(update);
                if let Some(observer) = &observer {
                    observer(task);
                }
            }
        };

        let kind = self.options.provider;
        let Some(provider) = self.registry.get(kind) else {
            let error = TranslationError::MissingProvider(kind.display_name().to_string());
            if !snapshot.original_subs().is_empty() {
                apply(TaskUpdate::Failed { message: error.to_string() });
            }
            return Err(error);
        };

        // Read once per run; a key change applies from the next task on
        let api_key = self.credentials.get(kind).unwrap_or_default();

        self.translator
            .run(snapshot, provider.as_ref(), &api_key, &self.options.target_language, &mut apply)
            .await
    }
}
