//! JSONL activity log: one self-contained JSON object per line.
//!
//! Lines are assembled in memory and written with a single `write_all` so a
//! tailing reader never sees a partial record.
//!
//! Degradation chain:
//! 1. Primary file path
//! 2. stderr with `[SAV-JSONL]` prefix
//! 3. Silent discard (the visualization must never fail because of logging)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SavError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// Analyzer lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AnalyzerInit,
    AnalyzerInert,
    GridRebuild,
    TraceStart,
    TraceSkip,
    TraceComplete,
    AnalyzerCleanup,
    ConfigWarning,
}

impl EventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AnalyzerInit => "analyzer_init",
            Self::AnalyzerInert => "analyzer_inert",
            Self::GridRebuild => "grid_rebuild",
            Self::TraceStart => "trace_start",
            Self::TraceSkip => "trace_skip",
            Self::TraceComplete => "trace_complete",
            Self::AnalyzerCleanup => "analyzer_cleanup",
            Self::ConfigWarning => "config_warning",
        }
    }
}

/// A single activity record. Everything past `severity` is optional and
/// omitted from the JSON when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC wall-clock timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Container id of the analyzer instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Virtual clock of the instance, in milliseconds since init.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<f64>,
    /// Bit string of the trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits: Option<String>,
    /// Decoded characters of the trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub looped: Option<bool>,
    /// Scheduled length of a trace, or delay until the next one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            instance: None,
            clock_ms: None,
            width: None,
            height: None,
            grid_size: None,
            bits: None,
            chunk: None,
            looped: None,
            duration_ms: None,
            config_hash: None,
            details: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Append-only JSONL writer with stderr fallback.
pub struct JsonlWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    lines_written: u64,
}

impl JsonlWriter {
    /// Open (or create) `path` for appending. Falls back to stderr on failure.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut writer = Self {
            path,
            writer: None,
            state: WriterState::Discard,
            lines_written: 0,
        };
        match open_append(&writer.path) {
            Ok(file) => {
                writer.writer = Some(BufWriter::new(file));
                writer.state = WriterState::Normal;
            }
            Err(e) => {
                let _ = writeln!(io::stderr(), "[SAV-JSONL] {e}; using stderr");
                writer.state = WriterState::Stderr;
            }
        }
        writer
    }

    /// Write one entry as a single line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[SAV-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state.
    #[must_use]
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    #[must_use]
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) {
        match self.state {
            WriterState::Normal => {
                let ok = self
                    .writer
                    .as_mut()
                    .is_some_and(|w| w.write_all(line.as_bytes()).is_ok());
                if ok {
                    self.lines_written += 1;
                } else {
                    self.writer = None;
                    self.state = WriterState::Stderr;
                    let _ = writeln!(
                        io::stderr(),
                        "[SAV-JSONL] write to {} failed, using stderr",
                        self.path.display()
                    );
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[SAV-JSONL] {line}").is_err() {
                    self.state = WriterState::Discard;
                }
            }
            WriterState::Discard => {}
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SavError::io(parent, source))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SavError::io(path, source))
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_separate_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let mut writer = JsonlWriter::open(&path);
        assert_eq!(writer.state(), "normal");

        let mut entry = LogEntry::new(EventType::TraceStart, Severity::Info);
        entry.bits = Some("0100100001000101".to_string());
        entry.chunk = Some("HE".to_string());
        writer.write_entry(&entry);
        writer.write_entry(&LogEntry::new(EventType::TraceComplete, Severity::Info));
        writer.flush();
        assert_eq!(writer.lines_written(), 2);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "trace_start");
        assert_eq!(first["severity"], "info");
        assert_eq!(first["chunk"], "HE");
    }

    #[test]
    fn unset_fields_are_omitted() {
        let entry = LogEntry::new(EventType::AnalyzerCleanup, Severity::Info);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("\"bits\""));
        assert!(!json.contains("\"width\""));
        assert!(json.contains("\"analyzer_cleanup\""));
    }

    #[test]
    fn parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/log.jsonl");
        let mut writer = JsonlWriter::open(&path);
        writer.write_entry(&LogEntry::new(EventType::AnalyzerInit, Severity::Info));
        drop(writer);
        assert!(fs::read_to_string(&path).unwrap().contains("analyzer_init"));
    }

    #[test]
    fn unwritable_path_degrades_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let writer = JsonlWriter::open(blocker.join("log.jsonl"));
        assert_eq!(writer.state(), "stderr");
    }

    #[test]
    fn entries_round_trip_through_json() {
        let mut entry = LogEntry::new(EventType::GridRebuild, Severity::Info);
        entry.width = Some(1600.0);
        entry.grid_size = Some(100.0);
        let json = serde_json::to_string(&entry).unwrap();
        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
