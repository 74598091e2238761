use anyhow::{Result, anyhow};
use log::info;
use std::path::{Path, PathBuf};

use crate::app_config::ProviderKind;
use crate::file_utils::FileManager;
use crate::subtitle_processor::SubtitleCodec;
use super::models::{FileTask, TaskStatus};

// @returns: Exported file name, e.g. "gemini_movie.srt"
pub fn export_file_name(provider: ProviderKind, file_name: &str) -> String {
    format!("{}_{}", provider.export_prefix(), file_name)
}

/// Whether a file name looks like one this tool exported, e.g. "openai_movie.srt"
pub fn is_export_file_name(file_name: &str) -> bool {
    ProviderKind::ALL.iter().any(|kind| {
        file_name
            .strip_prefix(kind.export_prefix())
            .is_some_and(|rest| rest.starts_with('_'))
    })
}

/// Write a completed task's translated entries into `output_dir`
///
/// Fails for tasks that are not completed, and for an existing target
/// unless `force_overwrite` is set. Returns the written path.
pub fn export_task<P: AsRef<Path>>(
    task: &FileTask,
    provider: ProviderKind,
    output_dir: P,
    force_overwrite: bool,
) -> Result<PathBuf> {
    if task.status() != TaskStatus::Completed {
        return Err(anyhow!(
            "Cannot export {}: task is {}",
            task.file_name(),
            task.status()
        ));
    }

    let output_path = output_dir.as_ref().join(export_file_name(provider, task.file_name()));
    if FileManager::file_exists(&output_path) && !force_overwrite {
        return Err(anyhow!(
            "Output file already exists: {:?} (use --force-overwrite to replace it)",
            output_path
        ));
    }

    let content = SubtitleCodec::serialize(task.processed_subs());
    FileManager::write_to_file(&output_path, &content)?;
    info!("Wrote {} entries to {:?}", task.processed_subs().len(), output_path);

    Ok(output_path)
}
