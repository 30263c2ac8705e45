//! Sensor → {room, type} resolution over the two map files.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::core::config::TopologyConfig;
use crate::core::errors::Result;
use crate::topology::maps::{SensorMap, load_room_map, load_type_map};

/// Where a sensor lives and what it measures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyEntry {
    pub room_id: i64,
    #[serde(rename = "type")]
    pub sensor_type: String,
}

/// Resolved topology keyed by sensor id.
pub type Topology = BTreeMap<i64, TopologyEntry>;

/// Both source maps as read for one request.
#[derive(Debug, Clone, Default)]
pub struct SourceMaps {
    pub rooms: SensorMap<i64>,
    pub types: SensorMap<String>,
}

impl SourceMaps {
    /// Total number of lines skipped across both files.
    pub fn skipped_lines(&self) -> usize {
        self.rooms.skipped.len() + self.types.skipped.len()
    }
}

/// Intersection of the two maps: a sensor needs both a room and a type.
pub fn join_maps(rooms: &SensorMap<i64>, types: &SensorMap<String>) -> Topology {
    rooms
        .entries
        .iter()
        .filter_map(|(sensor_id, room_id)| {
            types.entries.get(sensor_id).map(|sensor_type| {
                (
                    *sensor_id,
                    TopologyEntry {
                        room_id: *room_id,
                        sensor_type: sensor_type.clone(),
                    },
                )
            })
        })
        .collect()
}

/// Distinct room ids of a resolved topology, ascending.
pub fn rooms_of(topology: &Topology) -> Vec<i64> {
    topology
        .values()
        .map(|entry| entry.room_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Re-reads both map files on every call; nothing is cached.
#[derive(Debug, Clone)]
pub struct TopologyResolver {
    room_sensor_map: PathBuf,
    type_map: PathBuf,
}

impl TopologyResolver {
    pub fn new(cfg: &TopologyConfig) -> Self {
        Self {
            room_sensor_map: cfg.room_sensor_map.clone(),
            type_map: cfg.type_map.clone(),
        }
    }

    /// Read both sources as they are right now.
    pub fn load_sources(&self) -> Result<SourceMaps> {
        Ok(SourceMaps {
            rooms: load_room_map(&self.room_sensor_map)?,
            types: load_type_map(&self.type_map)?,
        })
    }

    pub fn resolve(&self) -> Result<Topology> {
        let sources = self.load_sources()?;
        Ok(join_maps(&sources.rooms, &sources.types))
    }

    pub fn rooms(&self) -> Result<Vec<i64>> {
        Ok(rooms_of(&self.resolve()?))
    }
}
