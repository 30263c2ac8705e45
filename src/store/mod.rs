//! Reading store accessor: read-only queries over the telemetry table.

pub mod aggregate;
pub mod readings;
pub mod window;
