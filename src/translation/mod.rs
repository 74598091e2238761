/*!
 * Translation pipeline for subtitle files.
 *
 * - `batch`: splits a file into batches, drives the provider and merges results
 * - `prompts`: request construction and response parsing shared by all providers
 */

pub use self::batch::{BatchOptions, BatchTranslator, RunOutcome};

pub mod batch;
pub mod prompts;
