//! Top-level CLI definition and dispatch.

use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{ColoredString, Colorize, control};
use serde::Serialize;
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use thiserror::Error;

use sensor_gateway_query::core::config::Config;
use sensor_gateway_query::core::errors::{ErrorKind, SgqError};
use sensor_gateway_query::facade::{QueryFacade, QueryFailure, QueryResult};
use sensor_gateway_query::logs::engine::LogPage;
use sensor_gateway_query::store::aggregate::AggregateSeries;
use sensor_gateway_query::topology::diagnose::{SensorDiagnosis, SensorIssue};

/// Sensor Gateway Query: read-only access to gateway telemetry, topology, and logs.
#[derive(Debug, Parser)]
#[command(
    name = "sgq",
    author,
    version,
    about = "Sensor Gateway Query - telemetry, topology, and gateway log analytics",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (results only, no summaries).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List sensor ids that have readings.
    Sensors,
    /// Show the most recent reading of a sensor.
    Latest(SensorArgs),
    /// Show readings inside a time window (default: the trailing window).
    History(HistoryArgs),
    /// Show the first and last reading timestamps of a sensor.
    Range(SensorArgs),
    /// Show sensor → room/type topology.
    Topology,
    /// List rooms that have at least one fully mapped sensor.
    Rooms,
    /// Search and page through the gateway log, newest first.
    Logs(LogsArgs),
    /// Dump the gateway log verbatim.
    LogsRaw(LogsRawArgs),
    /// Per-day or per-month min/max of a sensor's values.
    Aggregate(AggregateArgs),
    /// Cross-check the map files against stored readings.
    Diagnose,
    /// View configuration state.
    Config(ConfigArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct SensorArgs {
    /// Sensor id.
    #[arg(value_name = "ID", allow_negative_numbers = true)]
    sensor_id: i64,
}

#[derive(Debug, Clone, Args)]
struct HistoryArgs {
    /// Sensor id.
    #[arg(value_name = "ID", allow_negative_numbers = true)]
    sensor_id: i64,
    /// Window start, epoch seconds (needs --to).
    #[arg(long, value_name = "EPOCH", allow_hyphen_values = true)]
    from: Option<String>,
    /// Window end, epoch seconds (needs --from).
    #[arg(long, value_name = "EPOCH", allow_hyphen_values = true)]
    to: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct LogsArgs {
    /// Page number, starting at 1.
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    page: Option<String>,
    /// Entries per page.
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    limit: Option<String>,
    /// Case-insensitive substring filter.
    #[arg(long, value_name = "TEXT")]
    search: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct LogsRawArgs {
    /// Write to a file instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct AggregateArgs {
    /// Sensor id.
    #[arg(value_name = "ID", allow_negative_numbers = true)]
    sensor_id: i64,
    /// Bucket size: daily or monthly.
    #[arg(long, value_name = "PERIOD")]
    period: Option<String>,
    /// Window start, epoch seconds (needs --to).
    #[arg(long, value_name = "EPOCH", allow_hyphen_values = true)]
    from: Option<String>,
    /// Window end, epoch seconds (needs --from).
    #[arg(long, value_name = "EPOCH", allow_hyphen_values = true)]
    to: Option<String>,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include additional build metadata fields.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure (store, log, or map unavailable).
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }

    fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::InvalidParameter | ErrorKind::Config => Self::User(message),
            ErrorKind::NotFound | ErrorKind::StoreUnavailable | ErrorKind::ReadFailure => {
                Self::Runtime(message)
            }
            ErrorKind::Internal => Self::Internal(message),
        }
    }
}

impl From<SgqError> for CliError {
    fn from(err: SgqError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<QueryFailure> for CliError {
    fn from(failure: QueryFailure) -> Self {
        Self::from_kind(failure.kind, failure.to_string())
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Sensors => {
            let facade = open_facade(cli)?;
            emit(cli, "sensors", facade.list_sensor_ids(), |ids| {
                print_ids(cli, ids, "No sensors have readings.");
            })
        }
        Command::Latest(args) => {
            let facade = open_facade(cli)?;
            emit(cli, "latest", facade.latest(args.sensor_id), |found| {
                match found.as_ref() {
                    Some(sample) => println!(
                        "{}  {}",
                        format_ts(sample.timestamp),
                        format_value(sample.value)
                    ),
                    None => hint(cli, &format!("Sensor {} has no readings.", args.sensor_id)),
                }
            })
        }
        Command::History(args) => {
            let facade = open_facade(cli)?;
            let result =
                facade.history(args.sensor_id, args.from.as_deref(), args.to.as_deref());
            emit(cli, "history", result, |samples| {
                for sample in samples {
                    println!(
                        "{}  {}",
                        format_ts(sample.timestamp),
                        format_value(sample.value)
                    );
                }
                hint(cli, &format!("{} reading(s)", samples.len()));
            })
        }
        Command::Range(args) => {
            let facade = open_facade(cli)?;
            emit(cli, "range", facade.range(args.sensor_id), |found| {
                match found.as_ref() {
                    Some(range) => {
                        println!("start: {}", format_ts(range.start));
                        println!("end:   {}", format_ts(range.end));
                    }
                    None => hint(cli, &format!("Sensor {} has no readings.", args.sensor_id)),
                }
            })
        }
        Command::Topology => {
            let facade = open_facade(cli)?;
            emit(cli, "topology", facade.topology(), |topology| {
                if topology.is_empty() {
                    hint(cli, "No sensor appears in both map files.");
                    return;
                }
                println!("{:>10}  {:>8}  {}", "SENSOR", "ROOM", "TYPE");
                for (sensor_id, entry) in topology {
                    println!(
                        "{sensor_id:>10}  {:>8}  {}",
                        entry.room_id, entry.sensor_type
                    );
                }
            })
        }
        Command::Rooms => {
            let facade = open_facade(cli)?;
            emit(cli, "rooms", facade.rooms(), |rooms| {
                print_ids(cli, rooms, "No rooms have fully mapped sensors.");
            })
        }
        Command::Logs(args) => {
            let facade = open_facade(cli)?;
            let result = facade.log_query(
                args.page.as_deref(),
                args.limit.as_deref(),
                args.search.as_deref(),
            );
            emit(cli, "logs", result, |page| print_log_page(cli, page))
        }
        Command::LogsRaw(args) => run_logs_raw(cli, args),
        Command::Aggregate(args) => {
            let facade = open_facade(cli)?;
            let result = facade.aggregate(
                args.sensor_id,
                args.period.as_deref(),
                args.from.as_deref(),
                args.to.as_deref(),
            );
            emit(cli, "aggregate", result, |series| print_series(cli, series))
        }
        Command::Diagnose => {
            let facade = open_facade(cli)?;
            emit(cli, "diagnose", facade.diagnose(), |report| {
                print_diagnosis(cli, report);
            })
        }
        Command::Config(args) => run_config(cli, args),
        Command::Version(args) => emit_version(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn open_facade(cli: &Cli) -> Result<QueryFacade, CliError> {
    let config = Config::load(cli.config.as_deref())?;
    if cli.verbose {
        eprintln!(
            "sgq: config {} (hash {})",
            config.paths.config_file.display(),
            config.stable_hash()?
        );
    }
    let facade = QueryFacade::from_config(config)?;
    if cli.verbose {
        eprintln!("sgq: journal {}", facade.journal().state());
    }
    Ok(facade)
}

/// Print a facade result in the selected mode; failures are also echoed as
/// JSON so scripted callers always get one line per invocation.
fn emit<T, F>(cli: &Cli, command: &str, result: QueryResult<T>, human: F) -> Result<(), CliError>
where
    T: Serialize,
    F: FnOnce(&T),
{
    let mode = output_mode(cli);
    match result {
        Ok(value) => {
            match mode {
                OutputMode::Human => human(&value),
                OutputMode::Json => {
                    let payload = json!({
                        "command": command,
                        "result": serde_json::to_value(&value)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Err(failure) => Err(fail(cli, command, failure)),
    }
}

/// Echo `failure` as the command's JSON error line (in JSON mode) and turn it
/// into the process-level error.
fn fail(cli: &Cli, command: &str, failure: QueryFailure) -> CliError {
    if output_mode(cli) == OutputMode::Json {
        let echoed = serde_json::to_value(&failure)
            .map_err(CliError::from)
            .and_then(|error| write_json_line(&json!({ "command": command, "error": error })));
        if let Err(err) = echoed {
            return err;
        }
    }
    failure.into()
}

fn run_logs_raw(cli: &Cli, args: &LogsRawArgs) -> Result<(), CliError> {
    let facade = open_facade(cli)?;
    let Some(path) = &args.output else {
        let mut stdout = io::stdout().lock();
        return facade
            .log_raw_to(&mut stdout)
            .map(drop)
            .map_err(|failure| fail(cli, "logs-raw", failure));
    };

    let bytes = export_raw(&facade, path).map_err(|failure| fail(cli, "logs-raw", failure))?;
    match output_mode(cli) {
        OutputMode::Human => hint(cli, &format!("Wrote {bytes} bytes to {}", path.display())),
        OutputMode::Json => {
            let payload = json!({
                "command": "logs-raw",
                "output": path.to_string_lossy(),
                "bytes": bytes,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

/// Copy the gateway log into a temp file beside `path`, then rename it into
/// place. `path` is left untouched unless the whole copy succeeded.
fn export_raw(facade: &QueryFacade, path: &Path) -> QueryResult<u64> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staging_failure = |err: io::Error| QueryFailure::from(&SgqError::io(path, err));

    let mut staged = NamedTempFile::new_in(dir).map_err(staging_failure)?;
    let bytes = facade.log_raw_to(&mut BufWriter::new(staged.as_file_mut()))?;
    staged
        .persist(path)
        .map_err(|err| staging_failure(err.error))?;
    Ok(bytes)
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Internal(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("Configuration is INVALID: {e}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "code": e.code(),
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("sgq {version}");
            if args.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "binary": "sgq",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                }
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── human rendering ────────────────────

fn hint(cli: &Cli, message: &str) {
    if !cli.quiet {
        println!("{}", message.dimmed());
    }
}

fn print_ids(cli: &Cli, ids: &[i64], empty: &str) {
    if ids.is_empty() {
        hint(cli, empty);
    }
    for id in ids {
        println!("{id}");
    }
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0).map_or_else(
        || ts.to_string(),
        |dt| format!("{} ({ts})", dt.format("%Y-%m-%d %H:%M:%S UTC")),
    )
}

fn format_value(value: f64) -> String {
    format!("{value:.2}")
}

fn paint_level(level: &str) -> ColoredString {
    match level.to_ascii_uppercase().as_str() {
        "ERROR" => level.red().bold(),
        "WARN" | "WARNING" => level.yellow(),
        "INFO" => level.green(),
        "DEBUG" => level.dimmed(),
        _ => level.normal(),
    }
}

fn print_log_page(cli: &Cli, page: &LogPage) {
    for entry in &page.logs {
        println!(
            "[{}] [{}] [{}] {}",
            entry.timestamp,
            paint_level(&entry.level),
            entry.component,
            entry.message
        );
    }
    let p = &page.pagination;
    hint(
        cli,
        &format!(
            "page {}/{} ({} entries, {} per page)",
            p.page, p.total_pages, p.total_logs, p.limit
        ),
    );
}

fn print_series(cli: &Cli, series: &AggregateSeries) {
    if series.is_empty() {
        hint(cli, "No readings in the requested window.");
        return;
    }
    println!("{:<10}  {:>10}  {:>10}", "BUCKET", "MIN", "MAX");
    for ((label, min), max) in series
        .labels
        .iter()
        .zip(&series.min_values)
        .zip(&series.max_values)
    {
        println!(
            "{label:<10}  {:>10}  {:>10}",
            format_value(*min),
            format_value(*max)
        );
    }
}

fn issue_label(issue: SensorIssue) -> &'static str {
    match issue {
        SensorIssue::MissingRoom => "missing room",
        SensorIssue::MissingType => "missing type",
        SensorIssue::NoReadings => "no readings",
    }
}

fn print_diagnosis(cli: &Cli, report: &[SensorDiagnosis]) {
    if report.is_empty() {
        hint(cli, "Both map files are empty or absent.");
        return;
    }
    for d in report {
        let room = d.room_id.map_or_else(|| "-".to_string(), |r| r.to_string());
        let kind = d.sensor_type.as_deref().unwrap_or("-");
        let status = if d.is_healthy() {
            "ok".green()
        } else {
            d.issues
                .iter()
                .map(|i| issue_label(*i))
                .collect::<Vec<_>>()
                .join(", ")
                .yellow()
        };
        println!(
            "sensor {:>6}  room {room:>6}  type {kind:<12}  readings {:>8}  {status}",
            d.sensor_id, d.reading_count
        );
    }
    let unhealthy = report.iter().filter(|d| !d.is_healthy()).count();
    hint(
        cli,
        &format!("{} sensor(s), {unhealthy} with issues", report.len()),
    );
}

// ──────────────────── output plumbing ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SGQ_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
