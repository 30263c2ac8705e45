#![forbid(unsafe_code)]

//! Sensor Gateway Query (sgq): read-only query engine over a sensor
//! gateway's telemetry.
//!
//! Three sources, one facade:
//! 1. **Reading store**: latest/history/range/aggregate over the gateway's SQLite table
//! 2. **Topology**: sensor → room/type, derived from two flat map files
//! 3. **Gateway log**: searchable, newest-first, paginated view of the text log
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use sensor_gateway_query::prelude::*;
//!
//! let facade = QueryFacade::from_config(Config::load(None)?)?;
//! let page = facade.log_query(Some("1"), Some("20"), Some("error"));
//! # Ok::<(), SgqError>(())
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use sensor_gateway_query::core::config::Config;
//! use sensor_gateway_query::store::readings::ReadingStore;
//! ```

pub mod prelude;

pub mod core;
pub mod facade;
pub mod logger;
pub mod logs;
pub mod store;
pub mod topology;
