//! JSONL journal: append-only line-delimited JSON record of queries served.
//!
//! Each line is a self-contained JSON object. Lines are assembled in memory and
//! written via a single `write_all` so a concurrent tail never sees a torn line.
//!
//! Four-level fallback chain:
//! 1. Primary file path
//! 2. Fallback path (optional, e.g. on another filesystem)
//! 3. stderr with `[SGQ-JOURNAL]` prefix
//! 4. Silent discard (a query must never fail because journaling failed)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SgqError};

/// Severity level for journal events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Journal event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Query answered from its sources.
    QueryServed,
    /// A malformed parameter was absorbed into an empty result.
    QueryDegraded,
    /// An infrastructure failure was reported to the caller.
    QueryFailed,
    ConfigLoaded,
}

/// A single journal line; all fields optional except `ts`, `event`, `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Facade operation name (`history`, `log_query`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<i64>,
    /// Number of items in the response (rows, entries, sensors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// SGQ error code if the query failed or degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Full operator-facing error text (may contain paths).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl JournalEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            operation: None,
            sensor_id: None,
            result_count: None,
            duration_ms: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Fallback,
    Stderr,
    Discard,
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Maximum file size before rotation (bytes).
    pub max_size_bytes: u64,
    /// Number of rotated files to keep.
    pub max_rotated_files: u32,
}

impl From<&crate::core::config::JournalConfig> for JsonlConfig {
    fn from(cfg: &crate::core::config::JournalConfig) -> Self {
        Self {
            path: cfg.path.clone(),
            fallback_path: cfg.fallback_path.clone(),
            max_size_bytes: cfg.max_size_bytes,
            max_rotated_files: cfg.max_rotated_files,
        }
    }
}

/// Append-only JSONL writer with rotation and multi-level fallback.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the journal file. Falls through the degradation chain on failure.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
        };
        w.try_open_primary();
        w
    }

    /// Write one entry as one JSONL line and flush it.
    pub fn write_entry(&mut self, entry: &JournalEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[SGQ-JOURNAL] serialize error: {e}");
                return;
            }
        };

        self.write_line(&line);
        self.flush();
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut()
            && w.flush().is_err()
        {
            self.degrade();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Fallback => "fallback",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    /// Number of bytes written to the current file.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        if self.bytes_written + line.len() as u64 > self.config.max_size_bytes
            && matches!(self.state, WriterState::Normal | WriterState::Fallback)
        {
            self.rotate();
        }

        match self.state {
            WriterState::Normal | WriterState::Fallback => {
                if let Some(w) = self.writer.as_mut() {
                    if w.write_all(line.as_bytes()).is_err() {
                        self.degrade();
                        self.write_line(line); // retry at next level
                        return;
                    }
                    self.bytes_written += line.len() as u64;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                let _ = write!(io::stderr(), "[SGQ-JOURNAL] {line}");
            }
            WriterState::Discard => {}
        }
    }

    fn try_open_primary(&mut self) {
        match open_append(&self.config.path) {
            Ok((file, size)) => {
                self.writer = Some(BufWriter::new(file));
                self.state = WriterState::Normal;
                self.bytes_written = size;
            }
            Err(_) => {
                self.try_open_fallback();
            }
        }
    }

    fn try_open_fallback(&mut self) {
        let Some(fb) = self.config.fallback_path.clone() else {
            self.state = WriterState::Stderr;
            let _ = writeln!(
                io::stderr(),
                "[SGQ-JOURNAL] primary path failed and no fallback configured, using stderr"
            );
            return;
        };
        match open_append(&fb) {
            Ok((file, size)) => {
                let _ = writeln!(
                    io::stderr(),
                    "[SGQ-JOURNAL] primary path failed, using fallback: {}",
                    fb.display()
                );
                self.writer = Some(BufWriter::new(file));
                self.state = WriterState::Fallback;
                self.bytes_written = size;
            }
            Err(_) => {
                self.state = WriterState::Stderr;
                let _ = writeln!(
                    io::stderr(),
                    "[SGQ-JOURNAL] both primary and fallback paths failed, using stderr"
                );
            }
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        match self.state {
            WriterState::Normal => self.try_open_fallback(),
            WriterState::Fallback => {
                self.state = WriterState::Stderr;
                let _ = writeln!(
                    io::stderr(),
                    "[SGQ-JOURNAL] fallback write failed, using stderr"
                );
            }
            WriterState::Stderr => self.state = WriterState::Discard,
            WriterState::Discard => {}
        }
    }

    fn rotate(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
        self.writer = None;

        let base = match self.state {
            WriterState::Normal => self.config.path.clone(),
            WriterState::Fallback => match &self.config.fallback_path {
                Some(p) => p.clone(),
                None => return,
            },
            _ => return,
        };

        // .N-1→.N, …, .1→.2, then current→.1
        for i in (1..self.config.max_rotated_files).rev() {
            let _ = rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        if self.config.max_rotated_files == 0 {
            let _ = fs::remove_file(&base);
        } else {
            let _ = rename(&base, rotated_name(&base, 1));
        }

        match open_append(&base) {
            Ok((file, _)) => {
                self.writer = Some(BufWriter::new(file));
                self.bytes_written = 0;
            }
            Err(_) => self.degrade(),
        }
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SgqError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SgqError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// Build a rotated filename: `queries.jsonl` → `queries.jsonl.3`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: PathBuf, max_size_bytes: u64) -> JsonlConfig {
        JsonlConfig {
            path,
            fallback_path: None,
            max_size_bytes,
            max_rotated_files: 3,
        }
    }

    #[test]
    fn write_entry_produces_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));

        let mut entry = JournalEntry::new(EventType::QueryServed, Severity::Info);
        entry.operation = Some("history".to_string());
        entry.sensor_id = Some(15);
        writer.write_entry(&entry);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "query_served");
        assert_eq!(parsed["severity"], "info");
        assert_eq!(parsed["operation"], "history");
        assert_eq!(parsed["sensor_id"], 15);
    }

    #[test]
    fn entries_are_visible_without_explicit_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));
        for _ in 0..5 {
            writer.write_entry(&JournalEntry::new(EventType::QueryServed, Severity::Info));
        }
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 5);
    }

    #[test]
    fn rotation_shifts_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 100));

        for _ in 0..10 {
            writer.write_entry(&JournalEntry::new(EventType::QueryServed, Severity::Info));
        }

        assert!(path.exists());
        assert!(rotated_name(&path, 1).exists());
        assert!(!rotated_name(&path, 4).exists());
    }

    #[test]
    fn fallback_when_primary_dir_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file, not directory").unwrap();
        let fallback = dir.path().join("fallback.jsonl");
        let cfg = JsonlConfig {
            path: blocker.join("primary.jsonl"),
            fallback_path: Some(fallback.clone()),
            max_size_bytes: 1024 * 1024,
            max_rotated_files: 3,
        };
        let mut writer = JsonlWriter::open(cfg);

        assert_eq!(writer.state(), "fallback");
        writer.write_entry(&JournalEntry::new(EventType::QueryFailed, Severity::Error));

        let contents = fs::read_to_string(&fallback).unwrap();
        assert!(!contents.is_empty());
    }

    #[test]
    fn stderr_when_no_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();
        let writer = JsonlWriter::open(config(blocker.join("q.jsonl"), 1024));
        assert_eq!(writer.state(), "stderr");
    }

    #[test]
    fn optional_fields_omitted_when_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));

        writer.write_entry(&JournalEntry::new(EventType::ConfigLoaded, Severity::Info));

        let line = fs::read_to_string(&path).unwrap();
        assert!(!line.contains("\"sensor_id\""));
        assert!(!line.contains("\"error_code\""));
        assert!(!line.contains("\"details\""));
    }

    #[test]
    fn reopening_appends_and_tracks_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.jsonl");
        {
            let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));
            writer.write_entry(&JournalEntry::new(EventType::QueryServed, Severity::Info));
        }
        let size = fs::metadata(&path).unwrap().len();
        let writer = JsonlWriter::open(config(path, 1024 * 1024));
        assert_eq!(writer.bytes_written(), size);
    }
}
