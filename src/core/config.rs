//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SgqError};
use crate::core::paths::{config_base_dir, resolve_against};

/// Full SGQ configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub topology: TopologyConfig,
    pub logs: LogsConfig,
    pub query: QueryConfig,
    pub journal: JournalConfig,
    pub paths: PathsConfig,
}

/// Reading store location and table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    /// Table written by the gateway's storage thread.
    pub table: String,
}

/// The two flat map files the topology is derived from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TopologyConfig {
    /// `room_id sensor_id` per line.
    pub room_sensor_map: PathBuf,
    /// `sensor_id type` per line.
    pub type_map: PathBuf,
}

/// Gateway log source and pagination bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogsConfig {
    pub log_file: PathBuf,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
}

/// Default windows applied when callers omit time bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueryConfig {
    pub history_window_secs: u64,
    pub aggregate_window_secs: u64,
}

/// JSONL activity journal settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

/// Filesystem paths recorded at load time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("Sensor.db"),
            table: "SensorData".to_string(),
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            room_sensor_map: PathBuf::from("room_sensor.map"),
            type_map: PathBuf::from("type.map"),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("gateway.log"),
            default_page_limit: 50,
            max_page_limit: 1_000,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            history_window_secs: 10 * 60,
            aggregate_window_secs: 30 * 24 * 60 * 60,
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            enabled: true,
            path: data.join("queries.jsonl"),
            fallback_path: None,
            max_size_bytes: 16 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = home_dir("config paths");
        Self {
            config_file: home_dir.join(".config").join("sgq").join("config.toml"),
        }
    }
}

fn home_dir(purpose: &str) -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[SGQ-CONFIG] WARNING: HOME not set, falling back to /tmp for {purpose}");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir("journal paths")
        .join(".local")
        .join("share")
        .join("sgq")
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let (mut cfg, from_file) = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SgqError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            (parsed, true)
        } else if is_explicit_path {
            return Err(SgqError::MissingConfig { path: path_buf });
        } else {
            (Self::default(), false)
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        let base = if from_file {
            config_base_dir(&cfg.paths.config_file)
        } else {
            None
        };
        cfg.normalize_paths(base.as_deref());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Config rooted at `dir`: every data source and the journal live inside it.
    ///
    /// Used by tests and by tooling that points the engine at an export directory.
    #[must_use]
    pub fn rooted_at(dir: &Path) -> Self {
        let mut cfg = Self::default();
        cfg.store.db_path = dir.join("Sensor.db");
        cfg.topology.room_sensor_map = dir.join("room_sensor.map");
        cfg.topology.type_map = dir.join("type.map");
        cfg.logs.log_file = dir.join("gateway.log");
        cfg.journal.path = dir.join("queries.jsonl");
        cfg.paths.config_file = dir.join("config.toml");
        cfg
    }

    /// Deterministic hash of the effective config for logging/telemetry.
    ///
    /// FNV-1a, so the value is stable across processes and toolchains.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // store
        if let Some(raw) = lookup("SGQ_STORE_DB_PATH") {
            self.store.db_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("SGQ_STORE_TABLE") {
            self.store.table = raw.trim().to_string();
        }

        // topology
        if let Some(raw) = lookup("SGQ_TOPOLOGY_ROOM_SENSOR_MAP") {
            self.topology.room_sensor_map = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("SGQ_TOPOLOGY_TYPE_MAP") {
            self.topology.type_map = PathBuf::from(raw);
        }

        // logs
        if let Some(raw) = lookup("SGQ_LOGS_LOG_FILE") {
            self.logs.log_file = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("SGQ_LOGS_DEFAULT_PAGE_LIMIT") {
            self.logs.default_page_limit = parse_env_usize("SGQ_LOGS_DEFAULT_PAGE_LIMIT", &raw)?;
        }
        if let Some(raw) = lookup("SGQ_LOGS_MAX_PAGE_LIMIT") {
            self.logs.max_page_limit = parse_env_usize("SGQ_LOGS_MAX_PAGE_LIMIT", &raw)?;
        }

        // query
        if let Some(raw) = lookup("SGQ_QUERY_HISTORY_WINDOW_SECS") {
            self.query.history_window_secs = parse_env_u64("SGQ_QUERY_HISTORY_WINDOW_SECS", &raw)?;
        }
        if let Some(raw) = lookup("SGQ_QUERY_AGGREGATE_WINDOW_SECS") {
            self.query.aggregate_window_secs =
                parse_env_u64("SGQ_QUERY_AGGREGATE_WINDOW_SECS", &raw)?;
        }

        // journal
        if let Some(raw) = lookup("SGQ_JOURNAL_ENABLED") {
            self.journal.enabled = parse_env_bool("SGQ_JOURNAL_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("SGQ_JOURNAL_PATH") {
            self.journal.path = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Anchor relative data-source paths so every request reads the same files
    /// regardless of the caller's working directory.
    fn normalize_paths(&mut self, base: Option<&Path>) {
        for path in [
            &mut self.store.db_path,
            &mut self.topology.room_sensor_map,
            &mut self.topology.type_map,
            &mut self.logs.log_file,
            &mut self.journal.path,
        ] {
            *path = resolve_against(base, path);
        }
        if let Some(fallback) = self.journal.fallback_path.as_mut() {
            *fallback = resolve_against(base, fallback);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_sql_identifier(&self.store.table) {
            return Err(SgqError::InvalidConfig {
                details: format!(
                    "store.table must be a plain identifier ([A-Za-z_][A-Za-z0-9_]*), got {:?}",
                    self.store.table
                ),
            });
        }

        if self.logs.default_page_limit == 0 {
            return Err(SgqError::InvalidConfig {
                details: "logs.default_page_limit must be >= 1".to_string(),
            });
        }
        if self.logs.default_page_limit > self.logs.max_page_limit {
            return Err(SgqError::InvalidConfig {
                details: format!(
                    "logs.default_page_limit ({}) must be <= logs.max_page_limit ({})",
                    self.logs.default_page_limit, self.logs.max_page_limit
                ),
            });
        }

        for (name, val) in [
            ("history_window_secs", self.query.history_window_secs),
            ("aggregate_window_secs", self.query.aggregate_window_secs),
        ] {
            if val == 0 {
                return Err(SgqError::InvalidConfig {
                    details: format!("query.{name} must be > 0"),
                });
            }
            if i64::try_from(val).is_err() {
                return Err(SgqError::InvalidConfig {
                    details: format!("query.{name} is out of range: {val}"),
                });
            }
        }

        if self.journal.enabled && self.journal.max_size_bytes == 0 {
            return Err(SgqError::InvalidConfig {
                details: "journal.max_size_bytes must be > 0 when the journal is enabled"
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| SgqError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_usize(name: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|error| SgqError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| SgqError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
