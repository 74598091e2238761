use std::collections::HashSet;
use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;

// @module: SRT subtitle codec

// @const: SRT timestamp line; accepts ',' or '.' before the milliseconds
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    // @field: Identifier, unique within one file and never renumbered
    pub id: u64,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(id: u64, start_time_ms: u64, end_time_ms: u64, text: impl Into<String>) -> Self {
        SubtitleEntry {
            id,
            start_time_ms,
            end_time_ms,
            text: text.into(),
        }
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Decode raw file bytes into text, dropping a UTF-8 byte order mark
pub fn decode_text(bytes: &[u8]) -> Result<String, SubtitleError> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| SubtitleError::Decode(format!("file is not valid UTF-8 text ({})", e)))
}

/// SubRip (.srt) parser and serializer
pub struct SubtitleCodec;

impl SubtitleCodec {
    /// Parse SRT text into entries, in file order
    ///
    /// Ids are kept exactly as written. Blocks without a numeric id or a
    /// usable timestamp line are skipped with a warning, as is any block
    /// repeating an earlier id. A file that yields no entries is a format error.
    pub fn parse(content: &str) -> Result<Vec<SubtitleEntry>, SubtitleError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut entries = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut block: Vec<&str> = Vec::new();
        let mut line_number = 0usize;
        let mut block_start = 1usize;

        for line in content.lines().chain(std::iter::once("")) {
            line_number += 1;
            let trimmed = line.trim_end_matches('\r');

            if !trimmed.trim().is_empty() {
                if block.is_empty() {
                    block_start = line_number;
                }
                block.push(trimmed);
                continue;
            }

            if block.is_empty() {
                continue;
            }

            if let Some(entry) = Self::parse_block(&block, block_start) {
                if seen_ids.insert(entry.id) {
                    entries.push(entry);
                } else {
                    warn!("Skipping subtitle {} at line {}: duplicate id", entry.id, block_start);
                }
            }
            block.clear();
        }

        if entries.is_empty() {
            return Err(SubtitleError::FormatError(
                "no valid subtitle entries were found".to_string(),
            ));
        }

        debug!("Parsed {} subtitle entries", entries.len());
        Ok(entries)
    }

    /// Serialize entries back into SRT text
    pub fn serialize(entries: &[SubtitleEntry]) -> String {
        entries.iter().map(|entry| entry.to_string()).collect()
    }

    fn parse_block(block: &[&str], block_start: usize) -> Option<SubtitleEntry> {
        let id = match block[0].trim().parse::<u64>() {
            Ok(id) => id,
            Err(_) => {
                warn!("Skipping block at line {}: missing numeric id", block_start);
                return None;
            }
        };

        let caps = match block.get(1).and_then(|line| TIMESTAMP_REGEX.captures(line.trim())) {
            Some(caps) => caps,
            None => {
                warn!("Skipping subtitle {} at line {}: missing timestamp", id, block_start);
                return None;
            }
        };

        let (Some(start_time_ms), Some(end_time_ms)) =
            (Self::parse_timestamp_to_ms(&caps, 1), Self::parse_timestamp_to_ms(&caps, 5))
        else {
            warn!("Skipping subtitle {} at line {}: timestamp out of range", id, block_start);
            return None;
        };
        if end_time_ms < start_time_ms {
            warn!("Subtitle {} ends before it starts", id);
        }

        let text = block[2..].iter().map(|line| line.trim()).collect::<Vec<_>>().join("\n");
        Some(SubtitleEntry::new(id, start_time_ms, end_time_ms, text))
    }

    // @returns: None when a field does not fit in u64 milliseconds
    fn parse_timestamp_to_ms(caps: &regex::Captures, start_idx: usize) -> Option<u64> {
        let part = |offset: usize| -> Option<u64> {
            caps.get(start_idx + offset)?.as_str().parse().ok()
        };

        part(0)?
            .checked_mul(3600)?
            .checked_add(part(1)? * 60 + part(2)?)?
            .checked_mul(1000)?
            .checked_add(part(3)?)
    }
}
