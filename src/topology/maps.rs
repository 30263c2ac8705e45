//! Lenient parser for the gateway's two flat map files.
//!
//! Both files hold one whitespace-separated pair per line:
//! - `room_sensor.map`: `<room_id> <sensor_id>`
//! - `type.map`: `<sensor_id> <type>`
//!
//! Every line is classified (entry, blank, or skipped with a reason); a bad
//! line never fails the whole file.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::core::errors::{Result, SgqError};

/// Why a line was left out of a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not exactly two whitespace-separated tokens.
    FieldCount(usize),
    /// An id column did not parse as an integer.
    NotAnInteger(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldCount(n) => write!(f, "expected 2 fields, found {n}"),
            Self::NotAnInteger(tok) => write!(f, "{tok:?} is not an integer id"),
        }
    }
}

/// Classification of one map line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapLine<V> {
    Entry { sensor_id: i64, value: V },
    Blank,
    Skipped { reason: SkipReason },
}

/// A line that was skipped, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line_no: usize,
    pub reason: SkipReason,
}

/// Parsed map keyed by sensor id. Later lines override earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorMap<V> {
    pub entries: BTreeMap<i64, V>,
    pub skipped: Vec<SkippedLine>,
    /// `false` when the file was absent and the map is empty by default.
    pub source_present: bool,
}

impl<V> Default for SensorMap<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            skipped: Vec::new(),
            source_present: false,
        }
    }
}

impl<V> SensorMap<V> {
    fn from_lines<F>(text: &str, mut classify: F) -> Self
    where
        F: FnMut(&str) -> MapLine<V>,
    {
        let mut map = Self {
            source_present: true,
            ..Self::default()
        };
        for (idx, line) in text.lines().enumerate() {
            match classify(line) {
                MapLine::Entry { sensor_id, value } => {
                    map.entries.insert(sensor_id, value);
                }
                MapLine::Blank => {}
                MapLine::Skipped { reason } => map.skipped.push(SkippedLine {
                    line_no: idx + 1,
                    reason,
                }),
            }
        }
        map
    }
}

fn two_fields(line: &str) -> std::result::Result<Option<(&str, &str)>, SkipReason> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        [] => Ok(None),
        [a, b] => Ok(Some((a, b))),
        other => Err(SkipReason::FieldCount(other.len())),
    }
}

fn parse_id(tok: &str) -> std::result::Result<i64, SkipReason> {
    tok.parse::<i64>()
        .map_err(|_| SkipReason::NotAnInteger(tok.to_string()))
}

/// Classify a `room_sensor.map` line. The value is the room id.
pub fn classify_room_line(line: &str) -> MapLine<i64> {
    match two_fields(line) {
        Ok(None) => MapLine::Blank,
        Ok(Some((room, sensor))) => match (parse_id(room), parse_id(sensor)) {
            (Ok(room_id), Ok(sensor_id)) => MapLine::Entry {
                sensor_id,
                value: room_id,
            },
            (Err(reason), _) | (_, Err(reason)) => MapLine::Skipped { reason },
        },
        Err(reason) => MapLine::Skipped { reason },
    }
}

/// Classify a `type.map` line. The value is the sensor type label.
pub fn classify_type_line(line: &str) -> MapLine<String> {
    match two_fields(line) {
        Ok(None) => MapLine::Blank,
        Ok(Some((sensor, kind))) => match parse_id(sensor) {
            Ok(sensor_id) => MapLine::Entry {
                sensor_id,
                value: kind.to_string(),
            },
            Err(reason) => MapLine::Skipped { reason },
        },
        Err(reason) => MapLine::Skipped { reason },
    }
}

/// sensor → room, from `room_sensor.map` text.
pub fn parse_room_map(text: &str) -> SensorMap<i64> {
    SensorMap::from_lines(text, classify_room_line)
}

/// sensor → type, from `type.map` text.
pub fn parse_type_map(text: &str) -> SensorMap<String> {
    SensorMap::from_lines(text, classify_type_line)
}

/// Read a map file; an absent file is an empty map, other I/O errors surface.
pub fn read_map_source(path: &Path, source_kind: &'static str) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SgqError::ReadFailure {
            source_kind,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Load and parse `room_sensor.map`.
pub fn load_room_map(path: &Path) -> Result<SensorMap<i64>> {
    Ok(read_map_source(path, "room/sensor map")?
        .map_or_else(SensorMap::default, |text| parse_room_map(&text)))
}

/// Load and parse `type.map`.
pub fn load_type_map(path: &Path) -> Result<SensorMap<String>> {
    Ok(read_map_source(path, "sensor type map")?
        .map_or_else(SensorMap::default, |text| parse_type_map(&text)))
}
