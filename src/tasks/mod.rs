/*!
 * File task management.
 *
 * - `models`: task state and the updates applied to it
 * - `queue`: the queue owning all tasks and driving translation runs
 * - `export`: writing translated tasks back to subtitle files
 */

pub use self::export::{export_file_name, export_task, is_export_file_name};
pub use self::models::{FileTask, TaskStatus, TaskSummary, TaskUpdate};
pub use self::queue::{ProgressObserver, QueueOptions, QueueReport, TaskQueue};

pub mod export;
pub mod models;
pub mod queue;
