//! Read-only accessor over the gateway's time-series table.
//!
//! The table is owned and appended to by the gateway's storage thread; this
//! module never writes. A connection is opened read-only per call and dropped
//! before returning, so concurrent callers never share a handle and the
//! producer is never blocked by a long-lived reader.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, params};
use serde::Serialize;

use crate::core::config::StoreConfig;
use crate::core::errors::{Result, SgqError};
use crate::store::window::TimeWindow;

/// Upper bound on waiting for the producer's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// One `(value, timestamp)` sample of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub value: f64,
    pub timestamp: i64,
}

/// First and last timestamp recorded for a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

/// Read-only view of the readings table.
#[derive(Debug, Clone)]
pub struct ReadingStore {
    db_path: PathBuf,
    table: String,
}

impl ReadingStore {
    /// The table name must already be validated as a plain identifier
    /// (`Config::validate` does this); it is interpolated into SQL.
    pub fn new(cfg: &StoreConfig) -> Self {
        Self {
            db_path: cfg.db_path.clone(),
            table: cfg.table.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub(crate) fn table(&self) -> &str {
        &self.table
    }

    /// Open a fresh read-only connection.
    pub(crate) fn connect(&self) -> Result<Connection> {
        if !self.db_path.is_file() {
            return Err(SgqError::StoreUnavailable {
                path: self.db_path.clone(),
                details: "database file does not exist".to_string(),
            });
        }
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| self.unavailable(&e))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| self.unavailable(&e))?;
        Ok(conn)
    }

    /// Distinct sensor ids with at least one row, ascending.
    pub fn sensor_ids(&self) -> Result<Vec<i64>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT DISTINCT sensor_id FROM {} WHERE sensor_id IS NOT NULL ORDER BY sensor_id ASC",
            self.table
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| self.classify(e))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(|e| self.classify(e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| self.classify(e))?;
        Ok(ids)
    }

    /// Reading with the greatest timestamp; among equal timestamps the most
    /// recently inserted row wins.
    pub fn latest(&self, sensor_id: i64) -> Result<Option<Sample>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT sensor_value, timestamp FROM {}
             WHERE sensor_id = ?1 AND sensor_value IS NOT NULL AND timestamp IS NOT NULL
             ORDER BY timestamp DESC, rowid DESC LIMIT 1",
            self.table
        );
        conn.query_row(&sql, params![sensor_id], |row| {
            Ok(Sample {
                value: row.get(0)?,
                timestamp: row.get(1)?,
            })
        })
        .optional()
        .map_err(|e| self.classify(e))
    }

    /// Samples inside the inclusive window, ascending by timestamp.
    ///
    /// Duplicate timestamps are all returned, in insertion order.
    pub fn history(&self, sensor_id: i64, window: TimeWindow) -> Result<Vec<Sample>> {
        if window.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let sql = format!(
            "SELECT sensor_value, timestamp FROM {}
             WHERE sensor_id = ?1 AND timestamp BETWEEN ?2 AND ?3
               AND sensor_value IS NOT NULL
             ORDER BY timestamp ASC, rowid ASC",
            self.table
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| self.classify(e))?;
        let rows = stmt
            .query_map(params![sensor_id, window.from, window.to], |row| {
                Ok(Sample {
                    value: row.get(0)?,
                    timestamp: row.get(1)?,
                })
            })
            .map_err(|e| self.classify(e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| self.classify(e))?;
        Ok(rows)
    }

    /// Min/max timestamp for the sensor, or `None` when it has no readings.
    pub fn range(&self, sensor_id: i64) -> Result<Option<TimeRange>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT MIN(timestamp), MAX(timestamp) FROM {}
             WHERE sensor_id = ?1 AND sensor_value IS NOT NULL",
            self.table
        );
        let (start, end): (Option<i64>, Option<i64>) = conn
            .query_row(&sql, params![sensor_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| self.classify(e))?;
        Ok(match (start, end) {
            (Some(start), Some(end)) => Some(TimeRange { start, end }),
            _ => None,
        })
    }

    /// Number of readings stored for the sensor.
    pub fn count(&self, sensor_id: i64) -> Result<u64> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT COUNT(*) FROM {}
             WHERE sensor_id = ?1 AND sensor_value IS NOT NULL AND timestamp IS NOT NULL",
            self.table
        );
        let count: i64 = conn
            .query_row(&sql, params![sensor_id], |row| row.get(0))
            .map_err(|e| self.classify(e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn unavailable(&self, err: &rusqlite::Error) -> SgqError {
        SgqError::StoreUnavailable {
            path: self.db_path.clone(),
            details: err.to_string(),
        }
    }

    /// Separate "the store itself is broken" from ordinary query failures.
    pub(crate) fn classify(&self, err: rusqlite::Error) -> SgqError {
        match err.sqlite_error_code() {
            Some(
                ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::CannotOpen
                | ErrorCode::PermissionDenied
                | ErrorCode::SystemIoFailure,
            ) => self.unavailable(&err),
            _ => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::store::test_support::{seed_readings, store_in};

    #[test]
    fn missing_database_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let err = store.sensor_ids().expect_err("no db");
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(err.code(), "SGQ-3001");
    }

    #[test]
    fn corrupt_database_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        std::fs::write(store.path(), vec![0x42_u8; 8192]).unwrap();
        let err = store.latest(1).expect_err("garbage file");
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }

    #[test]
    fn sensor_ids_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        seed_readings(store.path(), &[(3, 1.0, 10), (1, 2.0, 11), (3, 3.0, 12)]);
        assert_eq!(store.sensor_ids().unwrap(), vec![1, 3]);
    }

    #[test]
    fn empty_table_yields_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        seed_readings(store.path(), &[]);
        assert!(store.sensor_ids().unwrap().is_empty());
        assert_eq!(store.latest(1).unwrap(), None);
        assert_eq!(store.range(1).unwrap(), None);
        assert_eq!(store.count(1).unwrap(), 0);
        assert!(
            store
                .history(1, TimeWindow { from: 0, to: i64::MAX })
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn latest_picks_max_timestamp_then_last_inserted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        seed_readings(
            store.path(),
            &[(7, 20.0, 100), (7, 21.5, 300), (7, 19.0, 200), (7, 22.0, 300), (8, 99.0, 999)],
        );
        assert_eq!(
            store.latest(7).unwrap(),
            Some(Sample {
                value: 22.0,
                timestamp: 300
            })
        );
        assert_eq!(store.latest(9).unwrap(), None);
    }

    #[test]
    fn history_is_inclusive_ordered_and_keeps_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        seed_readings(
            store.path(),
            &[
                (1, 5.0, 150),
                (1, 1.0, 100),
                (1, 2.0, 200),
                (1, 2.5, 200),
                (1, 9.0, 201),
                (1, 0.5, 99),
                (2, 7.0, 150),
            ],
        );
        let got = store.history(1, TimeWindow { from: 100, to: 200 }).unwrap();
        let stamps: Vec<i64> = got.iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![100, 150, 200, 200]);
        assert_eq!(got[2].value, 2.0);
        assert_eq!(got[3].value, 2.5);
    }

    #[test]
    fn inverted_window_returns_nothing_without_touching_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        // No database on disk: an inverted window must not even try to open it.
        let got = store.history(1, TimeWindow { from: 10, to: 1 }).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn range_spans_min_to_max() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        seed_readings(store.path(), &[(4, 1.0, 500), (4, 1.0, 50), (4, 1.0, 5_000)]);
        assert_eq!(
            store.range(4).unwrap(),
            Some(TimeRange {
                start: 50,
                end: 5_000
            })
        );
        assert_eq!(store.count(4).unwrap(), 3);
    }

    #[test]
    fn null_values_are_not_readings() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        seed_readings(store.path(), &[(1, 3.0, 10)]);
        let conn = rusqlite::Connection::open(store.path()).unwrap();
        conn.execute(
            "INSERT INTO SensorData (sensor_id, sensor_value, timestamp) VALUES (1, NULL, 20)",
            [],
        )
        .unwrap();
        drop(conn);

        assert_eq!(store.latest(1).unwrap().map(|s| s.timestamp), Some(10));
        assert_eq!(store.count(1).unwrap(), 1);
        assert_eq!(store.range(1).unwrap(), Some(TimeRange { start: 10, end: 10 }));
    }

    #[test]
    fn integer_values_read_as_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        seed_readings(store.path(), &[]);
        let conn = rusqlite::Connection::open(store.path()).unwrap();
        conn.execute(
            "INSERT INTO SensorData (sensor_id, sensor_value, timestamp) VALUES (2, 21, 10)",
            [],
        )
        .unwrap();
        drop(conn);
        assert_eq!(
            store.latest(2).unwrap(),
            Some(Sample {
                value: 21.0,
                timestamp: 10
            })
        );
    }

    #[test]
    fn missing_table_is_sql_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        rusqlite::Connection::open(store.path())
            .unwrap()
            .execute_batch("CREATE TABLE other (x INTEGER);")
            .unwrap();
        let err = store.sensor_ids().expect_err("no table");
        assert_eq!(err.code(), "SGQ-3002");
    }
}
