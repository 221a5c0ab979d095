//! The append-only passage log.
//!
//! Single writer (the counter process), any number of readers (the
//! dashboard). Records are written as one whole line per `write` call and
//! synced before the writer continues, so readers see at worst a shorter
//! file, never a torn line.

use super::counter::Tallies;
use super::record::{
    parse_count, parse_entries, PassageEntry, PassageRecord, FIELD_SEPARATOR, TIMESTAMP_FORMAT,
};
use crate::error::{BirdhouseError, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Bytes read per step when looking for the start of the last line.
const TAIL_CHUNK: u64 = 4096;

/// How to recover tallies when the last log line is not parseable.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    /// Only look at the last line; a malformed tail restarts from zero.
    #[default]
    LastLine,
    /// Walk backward to the last well-formed line.
    ScanBack,
}

/// Counters recovered from one log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResumePoint {
    daily_count: u64,
    total_count: u64,
    day: Option<NaiveDate>,
}

impl ResumePoint {
    /// Lines need at least three fields; the second and third are the daily
    /// and total counts. An unreadable timestamp does not prevent resuming.
    fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split(FIELD_SEPARATOR).collect();
        if fields.len() < 3 {
            return Err(BirdhouseError::log_format_error(format!(
                "expected 3 fields, found {} in {:?}",
                fields.len(),
                line.trim()
            )));
        }

        Ok(Self {
            daily_count: parse_count(fields[1])?,
            total_count: parse_count(fields[2])?,
            day: NaiveDateTime::parse_from_str(fields[0].trim(), TIMESTAMP_FORMAT)
                .ok()
                .map(|timestamp| timestamp.date()),
        })
    }

    fn into_tallies(self, today: NaiveDate) -> Tallies {
        Tallies {
            daily_count: self.daily_count,
            total_count: self.total_count,
            current_day: Some(self.day.unwrap_or(today)),
        }
    }
}

/// Handle on the passage log file.
#[derive(Debug, Clone)]
pub struct PassageLog {
    path: PathBuf,
}

impl PassageLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and make it durable before returning.
    ///
    /// Errors are returned as-is; the counter treats them as fatal.
    pub fn append(&self, record: &PassageRecord) -> Result<()> {
        let line = record.to_log_line();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        file.sync_data()?;
        debug!("Appended {:?} to {}", line.trim_end(), self.path.display());
        Ok(())
    }

    /// The last line of the log with surrounding whitespace removed.
    ///
    /// Only the tail of the file is read. `None` when the file does not exist
    /// or is empty. A file ending in a blank line yields `Some("")`.
    pub fn last_line(&self) -> Result<Option<String>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(read_last_line(&mut file)?.map(|line| line.trim().to_string()))
    }

    /// Recover tallies using today's local date for records whose timestamp
    /// cannot be read.
    pub fn resume(&self, policy: ResumePolicy) -> Result<Tallies> {
        self.resume_at(policy, Local::now().date_naive())
    }

    /// Recover the counters from the log without modifying it.
    ///
    /// A malformed line is logged and never fails the call; I/O errors do.
    pub fn resume_at(&self, policy: ResumePolicy, today: NaiveDate) -> Result<Tallies> {
        let point = match policy {
            ResumePolicy::LastLine => match self.last_line()? {
                None => None,
                Some(line) => match ResumePoint::parse(&line) {
                    Ok(point) => Some(point),
                    Err(e) => {
                        warn!(
                            "Could not resume from {}: {}; counters start at zero",
                            self.path.display(),
                            e
                        );
                        None
                    }
                },
            },
            ResumePolicy::ScanBack => self.scan_back()?,
        };

        let tallies = point
            .map(|point| point.into_tallies(today))
            .unwrap_or_default();
        info!(
            "Resuming with daily_count={}, total_count={}",
            tallies.daily_count, tallies.total_count
        );
        Ok(tallies)
    }

    fn scan_back(&self) -> Result<Option<ResumePoint>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let contents = String::from_utf8_lossy(&bytes);

        let mut skipped = 0usize;
        for line in contents.lines().rev() {
            match ResumePoint::parse(line) {
                Ok(point) => {
                    if skipped > 0 {
                        warn!(
                            "Skipped {} malformed line(s) at the end of {}",
                            skipped,
                            self.path.display()
                        );
                    }
                    return Ok(Some(point));
                }
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(
                "No well-formed line in {}; counters start at zero",
                self.path.display()
            );
        }
        Ok(None)
    }

    /// Every well-formed record, in file order.
    pub async fn read_entries(&self) -> Result<Vec<PassageEntry>> {
        let contents = self.read_raw().await?;
        Ok(parse_entries(&contents))
    }

    /// The unparsed log contents.
    pub async fn read_raw(&self) -> Result<String> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Read the last line of `file` by scanning backward from the end.
///
/// A single trailing newline terminates the last line rather than starting
/// an empty one.
fn read_last_line(file: &mut File) -> io::Result<Option<String>> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(None);
    }

    let mut last_byte = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last_byte)?;
    let end = if last_byte[0] == b'\n' { len - 1 } else { len };

    let mut line: Vec<u8> = Vec::new();
    let mut start = end;
    while start > 0 {
        let chunk_start = start.saturating_sub(TAIL_CHUNK);
        let mut chunk = vec![0u8; (start - chunk_start) as usize];
        file.seek(SeekFrom::Start(chunk_start))?;
        file.read_exact(&mut chunk)?;

        let newline = chunk.iter().rposition(|&b| b == b'\n');
        if let Some(index) = newline {
            chunk.drain(..=index);
        }
        chunk.extend_from_slice(&line);
        line = chunk;

        if newline.is_some() {
            break;
        }
        start = chunk_start;
    }

    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}
