//! Query facade: the contract surface presented to request routers and the CLI.
//!
//! Callers hand over parameters exactly as they arrived (sensor ids already
//! integer-typed, everything else as optional raw strings). The facade
//! coerces them, dispatches to the store, topology resolver, or log engine,
//! and records one journal entry per call. Malformed parameters are absorbed
//! into empty results; infrastructure failures become a [`QueryFailure`].
//!
//! Every source is re-read per call, so a facade can be shared freely across
//! threads.

#![allow(missing_docs)]

pub mod response;

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::Config;
use crate::core::errors::{Result, SgqError};
use crate::logger::ActivityJournal;
use crate::logger::jsonl::{EventType, JournalEntry, Severity};
use crate::logs::engine::{LogAnalytics, LogPage, SearchFilter};
use crate::logs::pagination::PageRequest;
use crate::store::aggregate::{AggregatePeriod, AggregateSeries};
use crate::store::readings::{ReadingStore, Sample, TimeRange};
use crate::store::window::{WindowResolution, resolve_window};
use crate::topology::diagnose::{SensorDiagnosis, diagnose};
use crate::topology::resolver::{Topology, TopologyResolver, join_maps, rooms_of};

pub use response::{Counted, Maybe, QueryFailure, QueryResult};

/// Stateless dispatcher over one gateway's data sources.
pub struct QueryFacade {
    config: Config,
    store: ReadingStore,
    topology: TopologyResolver,
    logs: LogAnalytics,
    clock: Arc<dyn Clock>,
    journal: ActivityJournal,
}

impl QueryFacade {
    /// Facade on the system clock with the journal the config describes.
    pub fn from_config(config: Config) -> Result<Self> {
        let journal = ActivityJournal::open(&config.journal);
        Self::new(config, Arc::new(SystemClock), journal)
    }

    /// Validate `config` and wire up every component.
    pub fn new(config: Config, clock: Arc<dyn Clock>, journal: ActivityJournal) -> Result<Self> {
        config.validate()?;
        let facade = Self {
            store: ReadingStore::new(&config.store),
            topology: TopologyResolver::new(&config.topology),
            logs: LogAnalytics::new(&config.logs),
            config,
            clock,
            journal,
        };

        let mut entry = JournalEntry::new(EventType::ConfigLoaded, Severity::Info);
        entry.details = Some(format!(
            "config_file={} config_hash={} journal_state={}",
            facade.config.paths.config_file.display(),
            facade.config.stable_hash()?,
            facade.journal.state(),
        ));
        facade.journal.record(&entry);
        Ok(facade)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn journal(&self) -> &ActivityJournal {
        &self.journal
    }

    // ──────────────────── readings ────────────────────

    /// Distinct sensor ids with at least one reading.
    pub fn list_sensor_ids(&self) -> QueryResult<Vec<i64>> {
        self.call("list_sensor_ids", None)
            .finish(self.store.sensor_ids())
    }

    pub fn latest(&self, sensor_id: i64) -> QueryResult<Maybe<Sample>> {
        self.call("latest", Some(sensor_id))
            .finish(self.store.latest(sensor_id).map(Maybe))
    }

    /// Readings inside `[from, to]`, or the trailing default window when
    /// either bound is missing. Unparseable bounds yield `[]`.
    pub fn history(
        &self,
        sensor_id: i64,
        from: Option<&str>,
        to: Option<&str>,
    ) -> QueryResult<Vec<Sample>> {
        let call = self.call("history", Some(sensor_id));
        let span = window_secs(self.config.query.history_window_secs);
        match resolve_window(from, to, self.clock.now_epoch_secs(), span) {
            WindowResolution::Explicit(window) | WindowResolution::Default(window) => {
                call.finish(self.store.history(sensor_id, window))
            }
            WindowResolution::Malformed { details } => {
                Ok(call.degraded(Vec::new(), &SgqError::invalid_parameter("time bounds", details)))
            }
        }
    }

    pub fn range(&self, sensor_id: i64) -> QueryResult<Maybe<TimeRange>> {
        self.call("range", Some(sensor_id))
            .finish(self.store.range(sensor_id).map(Maybe))
    }

    /// Per-day or per-month min/max. Unknown periods and unparseable bounds
    /// yield an empty series.
    pub fn aggregate(
        &self,
        sensor_id: i64,
        period: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> QueryResult<AggregateSeries> {
        let call = self.call("aggregate", Some(sensor_id));
        let Some(period) = AggregatePeriod::parse(period) else {
            let err = SgqError::invalid_parameter(
                "period",
                format!("{:?} is not daily or monthly", period.unwrap_or_default()),
            );
            return Ok(call.degraded(AggregateSeries::default(), &err));
        };
        let span = window_secs(self.config.query.aggregate_window_secs);
        match resolve_window(from, to, self.clock.now_epoch_secs(), span) {
            WindowResolution::Explicit(window) | WindowResolution::Default(window) => {
                call.finish(self.store.aggregate(sensor_id, window, period))
            }
            WindowResolution::Malformed { details } => Ok(call.degraded(
                AggregateSeries::default(),
                &SgqError::invalid_parameter("time bounds", details),
            )),
        }
    }

    // ──────────────────── topology ────────────────────

    /// sensor id → {room, type} for sensors present in both map files.
    pub fn topology(&self) -> QueryResult<Topology> {
        let call = self.call("topology", None);
        match self.topology.load_sources() {
            Ok(sources) => {
                let skipped = sources.skipped_lines();
                let call = call.with_details((skipped > 0).then(|| format!("skipped_lines={skipped}")));
                Ok(call.served(join_maps(&sources.rooms, &sources.types)))
            }
            Err(err) => Err(call.failed(&err)),
        }
    }

    pub fn rooms(&self) -> QueryResult<Vec<i64>> {
        self.call("rooms", None)
            .finish(self.topology.resolve().map(|topology| rooms_of(&topology)))
    }

    /// Map/store consistency report over the union of both map files.
    pub fn diagnose(&self) -> QueryResult<Vec<SensorDiagnosis>> {
        let call = self.call("diagnose", None);
        let report = self
            .topology
            .load_sources()
            .and_then(|sources| diagnose(&sources, &self.store));
        call.finish(report)
    }

    // ──────────────────── gateway log ────────────────────

    /// One page of the gateway log, newest first.
    ///
    /// Malformed `page`/`limit` give an empty first page without reading the
    /// log at all.
    pub fn log_query(
        &self,
        page: Option<&str>,
        limit: Option<&str>,
        search: Option<&str>,
    ) -> QueryResult<LogPage> {
        let call = self.call("log_query", None);
        let cfg = &self.config.logs;
        let request =
            match PageRequest::parse(page, limit, cfg.default_page_limit, cfg.max_page_limit) {
                Ok(request) => request,
                Err(err) => {
                    let fallback =
                        PageRequest::new(1, cfg.default_page_limit, cfg.max_page_limit);
                    return Ok(call.degraded(LogPage::empty(fallback), &err));
                }
            };
        let filter = SearchFilter::new(search);
        let call = call.with_details(filter.as_ref().map(|f| format!("search={:?}", f.needle())));
        call.finish(self.logs.query(filter.as_ref(), request))
    }

    /// The whole gateway log, verbatim.
    pub fn log_raw(&self) -> QueryResult<Vec<u8>> {
        let call = self.call("log_raw", None);
        match self.logs.raw_bytes() {
            Ok(bytes) => {
                let len = bytes.result_count();
                Ok(call.with_details(Some(format!("bytes={len}"))).served(bytes))
            }
            Err(err) => Err(call.failed(&err)),
        }
    }

    /// Stream the whole gateway log into `out`; returns the bytes copied.
    pub fn log_raw_to<W: Write>(&self, out: &mut W) -> QueryResult<u64> {
        self.call("log_raw", None).finish(self.logs.copy_raw_to(out))
    }

    fn call(&self, operation: &'static str, sensor_id: Option<i64>) -> Call<'_> {
        Call {
            journal: &self.journal,
            operation,
            sensor_id,
            details: None,
            started: Instant::now(),
        }
    }
}

impl std::fmt::Debug for QueryFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryFacade")
            .field("config", &self.config)
            .field("now", &self.clock.now_epoch_secs())
            .field("journal", &self.journal)
            .finish_non_exhaustive()
    }
}

fn window_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// One in-flight facade call; consumed by exactly one journal entry.
struct Call<'a> {
    journal: &'a ActivityJournal,
    operation: &'static str,
    sensor_id: Option<i64>,
    details: Option<String>,
    started: Instant,
}

impl Call<'_> {
    fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }

    fn finish<T: Counted>(self, result: Result<T>) -> QueryResult<T> {
        match result {
            Ok(value) => Ok(self.served(value)),
            Err(err) => Err(self.failed(&err)),
        }
    }

    fn served<T: Counted>(self, value: T) -> T {
        let mut entry = self.entry(EventType::QueryServed, Severity::Info);
        entry.ok = Some(true);
        entry.result_count = Some(value.result_count());
        self.journal.record(&entry);
        value
    }

    fn degraded<T: Counted>(self, value: T, err: &SgqError) -> T {
        let mut entry = self.entry(EventType::QueryDegraded, Severity::Warning);
        entry.ok = Some(true);
        entry.result_count = Some(value.result_count());
        entry.error_code = Some(err.code().to_string());
        entry.error_message = Some(err.to_string());
        self.journal.record(&entry);
        value
    }

    fn failed(self, err: &SgqError) -> QueryFailure {
        let mut entry = self.entry(EventType::QueryFailed, Severity::Error);
        entry.ok = Some(false);
        entry.error_code = Some(err.code().to_string());
        entry.error_message = Some(err.to_string());
        self.journal.record(&entry);
        QueryFailure::from(err)
    }

    fn entry(&self, event: EventType, severity: Severity) -> JournalEntry {
        let mut entry = JournalEntry::new(event, severity);
        entry.operation = Some(self.operation.to_string());
        entry.sensor_id = self.sensor_id;
        entry.duration_ms = Some(
            u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        );
        entry.details.clone_from(&self.details);
        entry
    }
}
