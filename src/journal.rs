//! Command journal.
//!
//! Append-only record of every command sent to the engine, one JSON object
//! per line (NDJSON). Enabled by setting `journal_path` in the config.
//!
//! # Entry Format
//!
//! - `ts`: RFC3339 timestamp of when the command finished
//! - `actor`: `user@HOST`
//! - `command`: the command string
//! - `captured`: whether stdout was captured
//! - `bytes`: captured length (captured commands only)
//! - `duration_ms`: wall time of the call
//! - `matches`: match count right after the call
//! - `outcome`: `ok` or `error`
//! - `error`: error message (failed commands only)

use crate::error::{HostError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// How a journaled command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Error,
}

/// One journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub ts: DateTime<Utc>,
    pub actor: String,
    pub command: String,
    pub captured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    pub duration_ms: u64,
    pub matches: i64,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JournalEntry {
    /// Create an entry stamped with the current time and actor.
    pub fn new(command: &str, captured: bool) -> Self {
        Self {
            ts: Utc::now(),
            actor: get_actor_string(),
            command: command.to_string(),
            captured,
            bytes: None,
            duration_ms: 0,
            matches: 0,
            outcome: Outcome::Ok,
            error: None,
        }
    }

    /// Serialize the entry to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| HostError::Journal(format!("failed to serialize entry: {}", e)))
    }
}

/// Get the actor string for journal entries.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append-only journal file.
///
/// Appends from several threads are serialized so lines never interleave.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the file and its directory if needed.
    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        let line = entry.to_ndjson_line()?;
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                HostError::Journal(format!(
                    "failed to create journal directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                HostError::Journal(format!(
                    "failed to open journal '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", line).map_err(|e| {
            HostError::Journal(format!(
                "failed to write journal '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

/// Read all entries from a journal file.
///
/// Blank lines are skipped; a malformed line is an error naming its line number.
pub fn read_journal<P: AsRef<Path>>(path: P) -> Result<Vec<JournalEntry>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        HostError::Journal(format!("failed to read journal '{}': {}", path.display(), e))
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| {
                HostError::Journal(format!(
                    "failed to parse journal line {} in '{}': {}",
                    i + 1,
                    path.display(),
                    e
                ))
            })
        })
        .collect()
}
