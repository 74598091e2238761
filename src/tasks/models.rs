/*!
 * Data models for file tasks.
 */

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::subtitle_processor::SubtitleEntry;

/// Lifecycle of a file task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting to be translated
    Idle,
    /// A translation run is in flight
    Processing,
    /// Every batch was translated
    Completed,
    /// Decoding, parsing or translation failed
    Error,
}

impl TaskStatus {
    /// Whether the next queue run should attempt this task
    pub fn is_pending(&self) -> bool {
        !matches!(self, TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Idle => "idle",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// State change reported by the batch translator
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    /// A run started: status becomes Processing, progress resets, the error clears
    Started,
    /// A batch was merged into the working copy
    Progress {
        /// Working copy after the merge
        processed_subs: Vec<SubtitleEntry>,
        /// Percentage of batches done
        progress: u8,
    },
    /// All batches were translated
    Completed,
    /// A batch failed; remaining batches were not attempted
    Failed {
        /// Human-readable cause
        message: String,
    },
}

/// One uploaded file's translation job
#[derive(Debug, Clone, Serialize)]
pub struct FileTask {
    id: String,
    file_name: String,
    source_path: Option<PathBuf>,
    original_subs: Vec<SubtitleEntry>,
    processed_subs: Vec<SubtitleEntry>,
    prompt: String,
    status: TaskStatus,
    progress: u8,
    error: Option<String>,
}

impl FileTask {
    /// Create an idle task for a parsed file
    pub fn new(file_name: impl Into<String>, entries: Vec<SubtitleEntry>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            source_path: None,
            processed_subs: entries.clone(),
            original_subs: entries,
            prompt: String::new(),
            status: TaskStatus::Idle,
            progress: 0,
            error: None,
        }
    }

    /// Create a task for a file that could not be decoded or parsed
    pub fn failed(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut task = Self::new(file_name, Vec::new());
        task.status = TaskStatus::Error;
        task.error = Some(message.into());
        task
    }

    /// Remember where the file was read from
    pub fn with_source_path(mut self, path: impl AsRef<Path>) -> Self {
        self.source_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the style instruction used for this file
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Entries as parsed; never modified after creation
    pub fn original_subs(&self) -> &[SubtitleEntry] {
        &self.original_subs
    }

    /// Working copy holding translated text where available
    pub fn processed_subs(&self) -> &[SubtitleEntry] {
        &self.processed_subs
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn set_prompt(&mut self, prompt: String) {
        self.prompt = prompt;
    }

    /// Apply a state change reported by the batch translator
    pub(crate) fn apply(&mut self, update: TaskUpdate) {
        match update {
            TaskUpdate::Started => {
                self.status = TaskStatus::Processing;
                self.progress = 0;
                self.error = None;
                self.processed_subs = self.original_subs.clone();
            }
            TaskUpdate::Progress { processed_subs, progress } => {
                self.processed_subs = processed_subs;
                self.progress = progress.min(100);
            }
            TaskUpdate::Completed => {
                self.status = TaskStatus::Completed;
                self.progress = 100;
            }
            TaskUpdate::Failed { message } => {
                self.status = TaskStatus::Error;
                self.error = Some(message);
            }
        }
    }
}

/// Count of tasks per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub idle: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
}

impl TaskSummary {
    /// Tally a set of tasks
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a FileTask>) -> Self {
        let mut summary = Self::default();
        for task in tasks {
            match task.status() {
                TaskStatus::Idle => summary.idle += 1,
                TaskStatus::Processing => summary.processing += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Error => summary.error += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.idle + self.processing + self.completed + self.error
    }
}
