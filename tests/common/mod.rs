#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::TempDir;

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    /// Parse the single JSON line the CLI prints in JSON mode.
    pub fn json(&self) -> serde_json::Value {
        let line = self.stdout.lines().last().unwrap_or_else(|| {
            panic!("no stdout; log: {}", self.log_path.display());
        });
        serde_json::from_str(line).unwrap_or_else(|err| {
            panic!("stdout is not JSON ({err}); log: {}", self.log_path.display())
        })
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_sgq") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "sgq.exe" } else { "sgq" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve sgq binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

pub fn run_cli_case_with_env(case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
    let root = std::env::temp_dir().join("sgq-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env_remove("SGQ_OUTPUT_FORMAT")
        .env("RUST_BACKTRACE", "1");
    for (key, value) in env {
        command.env(key, value);
    }
    let output = command.output().expect("execute sgq command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    let _ = writeln!(log_content, "case={case_name}");
    let _ = writeln!(log_content, "bin={}", bin_path.display());
    let _ = writeln!(log_content, "args={args:?}");
    let _ = writeln!(log_content, "env={env:?}");
    let _ = writeln!(log_content, "status={}", output.status);
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

// ──────────────────── gateway fixture ────────────────────

/// A throwaway gateway directory: config, database, map files, and log.
///
/// Nothing exists until the matching `with_*` call; a missing source is a
/// valid scenario on its own.
pub struct Gateway {
    dir: TempDir,
}

impl Gateway {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create gateway dir");
        let config = "[store]\ndb_path = \"Sensor.db\"\n\n\
                      [topology]\nroom_sensor_map = \"room_sensor.map\"\ntype_map = \"type.map\"\n\n\
                      [logs]\nlog_file = \"gateway.log\"\n\n\
                      [journal]\npath = \"queries.jsonl\"\n";
        fs::write(dir.path().join("config.toml"), config).expect("write config");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    pub fn db_path(&self) -> PathBuf {
        self.path().join("Sensor.db")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.path().join("queries.jsonl")
    }

    /// Create the gateway table and append `(sensor, value, ts)` rows.
    pub fn with_readings(self, rows: &[(i64, f64, i64)]) -> Self {
        let mut conn = rusqlite::Connection::open(self.db_path()).expect("open db");
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS SensorData (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sensor_id INTEGER NULL,
                sensor_value DECIMAL(4,2) NULL,
                timestamp TIMESTAMP NULL
            );",
        )
        .expect("create table");
        let tx = conn.transaction().expect("begin");
        for (sensor, value, ts) in rows {
            tx.execute(
                "INSERT INTO SensorData (sensor_id, sensor_value, timestamp) VALUES (?1, ?2, ?3)",
                rusqlite::params![sensor, value, ts],
            )
            .expect("insert reading");
        }
        tx.commit().expect("commit");
        self
    }

    pub fn with_room_map(self, text: &str) -> Self {
        fs::write(self.path().join("room_sensor.map"), text).expect("write room map");
        self
    }

    pub fn with_type_map(self, text: &str) -> Self {
        fs::write(self.path().join("type.map"), text).expect("write type map");
        self
    }

    pub fn with_log(self, text: &str) -> Self {
        fs::write(self.path().join("gateway.log"), text).expect("write gateway log");
        self
    }

    /// `count` structured lines, oldest first, numbered from 0.
    pub fn with_generated_log(self, count: usize) -> Self {
        let mut text = String::new();
        for i in 0..count {
            let level = if i % 10 == 0 { "ERROR" } else { "INFO" };
            let _ = writeln!(
                text,
                "[2024-03-01 10:{:02}:{:02}.000] [{level}] [GEN] message {i}",
                (i / 60) % 60,
                i % 60
            );
        }
        self.with_log(&text)
    }

    /// Run the CLI against this gateway's config.
    pub fn run(&self, case_name: &str, args: &[&str]) -> CmdResult {
        let config = self.config_path();
        let config = config.to_string_lossy();
        let mut full = vec!["--config", config.as_ref()];
        full.extend_from_slice(args);
        run_cli_case(case_name, &full)
    }

    pub fn journal_events(&self) -> Vec<serde_json::Value> {
        fs::read_to_string(self.journal_path())
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).expect("journal line is JSON"))
            .collect()
    }
}
