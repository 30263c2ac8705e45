//! Sensor topology: room and type per sensor, derived from two map files.

pub mod diagnose;
pub mod maps;
pub mod resolver;
