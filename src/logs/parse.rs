//! Gateway log line parser.
//!
//! The gateway writes `[YYYY-MM-DD HH:MM:SS.mmm] [LEVEL] [MODULE] text`.
//! Anything else that is not blank is kept as a `RAW` entry so no line is
//! silently lost from the operator view.

#![allow(missing_docs)]

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Timestamp placeholder for lines without a structured prefix.
pub const FALLBACK_TIMESTAMP: &str = "N/A";
/// Level assigned to unstructured lines.
pub const FALLBACK_LEVEL: &str = "RAW";
/// Component assigned to unstructured lines.
pub const FALLBACK_COMPONENT: &str = "System";

static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(.*?)\]\s*\[(.*?)\]\s*\[(.*?)\]\s*(.*)$")
        .unwrap_or_else(|err| unreachable!("log line pattern is a literal: {err}"))
});

/// One operator-visible log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub component: String,
    pub message: String,
}

impl LogEntry {
    pub fn is_fallback(&self) -> bool {
        self.level == FALLBACK_LEVEL && self.timestamp == FALLBACK_TIMESTAMP
    }
}

/// How a single line was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Structured(LogEntry),
    Fallback(LogEntry),
    Blank,
}

impl ParsedLine {
    pub fn into_entry(self) -> Option<LogEntry> {
        match self {
            Self::Structured(entry) | Self::Fallback(entry) => Some(entry),
            Self::Blank => None,
        }
    }
}

pub fn parse_line(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParsedLine::Blank;
    }
    match LINE_PATTERN.captures(trimmed) {
        Some(caps) => {
            let field = |i: usize| caps.get(i).map_or("", |m| m.as_str()).trim().to_string();
            ParsedLine::Structured(LogEntry {
                timestamp: field(1),
                level: field(2),
                component: field(3),
                message: field(4),
            })
        }
        None => ParsedLine::Fallback(LogEntry {
            timestamp: FALLBACK_TIMESTAMP.to_string(),
            level: FALLBACK_LEVEL.to_string(),
            component: FALLBACK_COMPONENT.to_string(),
            message: trimmed.to_string(),
        }),
    }
}
