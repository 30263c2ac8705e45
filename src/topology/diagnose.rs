//! Cross-check of the map files against the reading store.
//!
//! Unlike [`join_maps`](super::resolver::join_maps), this walks the *union*
//! of both maps so operators can see sensors that fall out of the topology.

#![allow(missing_docs)]

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::errors::Result;
use crate::store::readings::ReadingStore;
use crate::topology::resolver::SourceMaps;

/// Something an operator should fix for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorIssue {
    MissingRoom,
    MissingType,
    NoReadings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorDiagnosis {
    pub sensor_id: i64,
    pub room_id: Option<i64>,
    #[serde(rename = "type")]
    pub sensor_type: Option<String>,
    pub reading_count: u64,
    pub issues: Vec<SensorIssue>,
}

impl SensorDiagnosis {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Diagnose every sensor named by either map, ascending by id.
pub fn diagnose(sources: &SourceMaps, store: &ReadingStore) -> Result<Vec<SensorDiagnosis>> {
    let sensors: BTreeSet<i64> = sources
        .rooms
        .entries
        .keys()
        .chain(sources.types.entries.keys())
        .copied()
        .collect();

    sensors
        .into_iter()
        .map(|sensor_id| {
            let room_id = sources.rooms.entries.get(&sensor_id).copied();
            let sensor_type = sources.types.entries.get(&sensor_id).cloned();
            let reading_count = store.count(sensor_id)?;

            let mut issues = Vec::new();
            if room_id.is_none() {
                issues.push(SensorIssue::MissingRoom);
            }
            if sensor_type.is_none() {
                issues.push(SensorIssue::MissingType);
            }
            if reading_count == 0 {
                issues.push(SensorIssue::NoReadings);
            }

            Ok(SensorDiagnosis {
                sensor_id,
                room_id,
                sensor_type,
                reading_count,
                issues,
            })
        })
        .collect()
}
