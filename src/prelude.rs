//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use sensor_gateway_query::prelude::*;
//! ```

// Core
pub use crate::core::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::config::Config;
pub use crate::core::errors::{ErrorKind, Result, SgqError};

// Facade
pub use crate::facade::{Maybe, QueryFacade, QueryFailure, QueryResult};
pub use crate::logger::ActivityJournal;

// Readings
pub use crate::store::aggregate::{AggregatePeriod, AggregateSeries};
pub use crate::store::readings::{ReadingStore, Sample, TimeRange};
pub use crate::store::window::TimeWindow;

// Topology
pub use crate::topology::diagnose::{SensorDiagnosis, SensorIssue};
pub use crate::topology::resolver::{Topology, TopologyEntry, TopologyResolver};

// Gateway log
pub use crate::logs::engine::{LogAnalytics, LogPage, SearchFilter};
pub use crate::logs::parse::LogEntry;
