//! Per-day / per-month min/max rollups for the dashboard's trend charts.

#![allow(missing_docs)]

use rusqlite::params;
use serde::Serialize;

use crate::core::errors::Result;
use crate::store::readings::ReadingStore;
use crate::store::window::TimeWindow;

/// Calendar bucket size (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregatePeriod {
    Daily,
    Monthly,
}

impl AggregatePeriod {
    /// Parse a caller-supplied period. Absent means daily; unknown is `None`.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            None | Some("" | "daily" | "day") => Some(Self::Daily),
            Some("monthly" | "month") => Some(Self::Monthly),
            Some(_) => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }

    const fn bucket_format(self) -> &'static str {
        match self {
            Self::Daily => "%Y-%m-%d",
            Self::Monthly => "%Y-%m",
        }
    }
}

/// Parallel arrays, one element per bucket, ascending by label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateSeries {
    pub labels: Vec<String>,
    pub min_values: Vec<f64>,
    pub max_values: Vec<f64>,
}

impl AggregateSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl ReadingStore {
    /// Min and max value per calendar bucket inside the inclusive window.
    pub fn aggregate(
        &self,
        sensor_id: i64,
        window: TimeWindow,
        period: AggregatePeriod,
    ) -> Result<AggregateSeries> {
        if window.is_empty() {
            return Ok(AggregateSeries::default());
        }
        let conn = self.connect()?;
        let sql = format!(
            "SELECT strftime(?1, timestamp, 'unixepoch') AS bucket,
                    MIN(sensor_value), MAX(sensor_value)
             FROM {}
             WHERE sensor_id = ?2 AND timestamp BETWEEN ?3 AND ?4
               AND sensor_value IS NOT NULL
             GROUP BY bucket
             ORDER BY bucket ASC",
            self.table()
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| self.classify(e))?;
        let rows = stmt
            .query_map(
                params![period.bucket_format(), sensor_id, window.from, window.to],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                    ))
                },
            )
            .map_err(|e| self.classify(e))?;

        let mut series = AggregateSeries::default();
        for row in rows {
            let (label, min, max) = row.map_err(|e| self.classify(e))?;
            // strftime yields NULL for timestamps outside its supported range.
            let Some(label) = label else { continue };
            series.labels.push(label);
            series.min_values.push(min);
            series.max_values.push(max);
        }
        Ok(series)
    }
}
