//! Passage log records and their line format.

use crate::error::{BirdhouseError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout used in the passage log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator between the fields of a log line.
pub const FIELD_SEPARATOR: char = ';';

/// One counted passage, written once and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageRecord {
    /// When the passage was counted (local time, whole seconds)
    pub timestamp: NaiveDateTime,
    /// Passages counted since the last local-date rollover, starting at 1
    pub daily_count: u64,
    /// Passages counted since records began
    pub total_count: u64,
}

impl PassageRecord {
    /// Calendar date of the record.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// The record as a complete log line, including the trailing newline.
    pub fn to_log_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for PassageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ; {} ; {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.daily_count,
            self.total_count
        )
    }
}

impl FromStr for PassageRecord {
    type Err = BirdhouseError;

    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split(FIELD_SEPARATOR).map(str::trim).collect();
        if fields.len() != 3 {
            return Err(BirdhouseError::log_format_error(format!(
                "expected 3 fields, found {} in {:?}",
                fields.len(),
                line
            )));
        }

        let timestamp = NaiveDateTime::parse_from_str(fields[0], TIMESTAMP_FORMAT).map_err(|e| {
            BirdhouseError::log_format_error(format!("bad timestamp {:?}: {}", fields[0], e))
        })?;
        let daily_count = parse_count(fields[1])?;
        let total_count = parse_count(fields[2])?;

        Ok(Self {
            timestamp,
            daily_count,
            total_count,
        })
    }
}

/// Parse one count field of a log line.
pub(crate) fn parse_count(field: &str) -> Result<u64> {
    field
        .trim()
        .parse::<u64>()
        .map_err(|e| BirdhouseError::log_format_error(format!("bad count {:?}: {}", field, e)))
}

/// A log line as the dashboard reports it.
///
/// The timestamp is passed through as written so the browser sees exactly
/// what is on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassageEntry {
    pub datetime: String,
    pub daily: u64,
    pub total: u64,
}

impl PassageEntry {
    /// Parse a log line; lines without exactly three fields or with
    /// non-numeric counts yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.trim().split(FIELD_SEPARATOR).map(str::trim).collect();
        if fields.len() != 3 {
            return None;
        }
        Some(Self {
            datetime: fields[0].to_string(),
            daily: parse_count(fields[1]).ok()?,
            total: parse_count(fields[2]).ok()?,
        })
    }
}

impl From<&PassageRecord> for PassageEntry {
    fn from(record: &PassageRecord) -> Self {
        Self {
            datetime: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            daily: record.daily_count,
            total: record.total_count,
        }
    }
}

/// Parse every well-formed line of a log, in file order.
pub fn parse_entries(contents: &str) -> Vec<PassageEntry> {
    contents.lines().filter_map(PassageEntry::parse_line).collect()
}
