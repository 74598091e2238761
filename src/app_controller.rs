use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::credentials::{CredentialStore, EnvOverrideStore, FileCredentialStore};
use crate::file_utils::FileManager;
use crate::providers::ProviderRegistry;
use crate::tasks::{FileTask, QueueOptions, TaskQueue, TaskStatus, export_task};

// @module: Application controller for subtitle translation

/// Result of one controller run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Tasks translated and exported
    pub exported: Vec<PathBuf>,
    /// File name and message of every task that ended in error
    pub errors: Vec<(String, String)>,
    /// Wall-clock duration
    pub duration: Duration,
}

impl RunSummary {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Adapters for every provider
    registry: ProviderRegistry,
    // @field: API key source
    credentials: Arc<dyn CredentialStore>,
    // @field: Whether progress bars are drawn
    show_progress: bool,
}

impl Controller {
    // @method: Create a controller using the on-disk credential store
    pub fn with_config(config: Config) -> Result<Self> {
        let store = FileCredentialStore::open_default().context("Failed to open credential store")?;
        let credentials: Arc<dyn CredentialStore> = Arc::new(EnvOverrideStore::new(Arc::new(store)));
        let registry = ProviderRegistry::from_config(&config.translation)
            .context("Failed to initialize provider clients")?;
        Self::with_parts(config, registry, credentials)
    }

    // @method: Create a controller from explicit collaborators
    pub fn with_parts(config: Config, registry: ProviderRegistry, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            credentials,
            show_progress: true,
        })
    }

    /// Disable progress bar rendering
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate every input file (directories are searched for .srt files) and export the results
    pub async fn run<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<RunSummary> {
        let start_time = Instant::now();

        let files = FileManager::collect_inputs(inputs)?;
        if files.is_empty() {
            return Err(anyhow!("No subtitle files found in the given inputs"));
        }

        let provider = self.config.translation.provider;
        info!(
            "Translating {} file(s) to {} with {} ({})",
            files.len(),
            self.config.target_language,
            provider.display_name(),
            self.config.translation.get_model()
        );

        let multi_progress = if self.show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut queue = TaskQueue::new(
            self.registry.clone(),
            Arc::clone(&self.credentials),
            QueueOptions::from_config(&self.config)?,
        );
        queue.on_progress(progress_observer(multi_progress));

        queue.enqueue_files(&files).await;
        let report = queue
            .run_queue()
            .await
            .ok_or_else(|| anyhow!("A translation run is already in progress"))?;

        let mut summary = RunSummary::default();
        for task in queue.tasks() {
            match task.status() {
                TaskStatus::Completed => match self.export(&task) {
                    Ok(path) => summary.exported.push(path),
                    Err(e) => {
                        error!("Failed to export {}: {}", task.file_name(), e);
                        summary.errors.push((task.file_name().to_string(), e.to_string()));
                    }
                },
                TaskStatus::Error => {
                    let message = task.error().unwrap_or("unknown error").to_string();
                    warn!("{}: {}", task.file_name(), message);
                    summary.errors.push((task.file_name().to_string(), message));
                }
                TaskStatus::Idle | TaskStatus::Processing => {}
            }
        }

        summary.duration = start_time.elapsed();
        info!(
            "Run complete in {}: {} exported, {} failed ({} attempted)",
            Self::format_duration(summary.duration),
            summary.exported.len(),
            summary.errors.len(),
            report.attempted
        );

        Ok(summary)
    }

    fn export(&self, task: &FileTask) -> Result<PathBuf> {
        let output_dir = self.output_dir_for(task);
        FileManager::ensure_dir(&output_dir)?;
        export_task(
            task,
            self.config.translation.provider,
            &output_dir,
            self.config.output.force_overwrite,
        )
    }

    // @returns: Configured output dir, else the input file's directory
    fn output_dir_for(&self, task: &FileTask) -> PathBuf {
        if let Some(dir) = &self.config.output.output_dir {
            return dir.clone();
        }
        task.source_path()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// One progress bar per task, driven by queue updates
fn progress_observer(multi_progress: MultiProgress) -> impl Fn(&FileTask) + Send + Sync + 'static {
    let bars: Mutex<HashMap<String, ProgressBar>> = Mutex::new(HashMap::new());
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}% {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░");

    move |task: &FileTask| {
        let mut bars = bars.lock();
        let bar = bars.entry(task.id().to_string()).or_insert_with(|| {
            let bar = multi_progress.add(ProgressBar::new(100));
            bar.set_style(style.clone());
            bar.set_message(task.file_name().to_string());
            bar
        });

        bar.set_position(u64::from(task.progress()));
        match task.status() {
            TaskStatus::Completed => bar.finish_with_message(format!("{} done", task.file_name())),
            TaskStatus::Error => bar.abandon_with_message(format!(
                "{} failed: {}",
                task.file_name(),
                task.error().unwrap_or("unknown error")
            )),
            TaskStatus::Processing => bar.set_message(format!("{} translating", task.file_name())),
            TaskStatus::Idle => {}
        }
    }
}
