//! Command-line argument definitions for `logload`.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Parse nginx access logs and export them to CSV or ClickHouse.
///
/// Every run is all-or-nothing: on the first malformed line nothing is
/// written, unless `--skip-invalid` is given.
#[derive(Debug, Parser)]
#[command(name = "logload", version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file [default: ./logload.toml if present].
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log format template, e.g. '$remote_addr [$time_local] "$request"'.
    ///
    /// Defaults to the nginx `combined` format.
    #[arg(short = 'f', long, global = true, value_name = "TEMPLATE")]
    pub format: Option<String>,

    /// Read the log format from this nginx configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub nginx_config: Option<PathBuf>,

    /// Name of the `log_format` directive to use with `--nginx-config`.
    #[arg(long, global = true, value_name = "NAME")]
    pub log_format: Option<String>,

    /// Skip lines that fail to parse instead of aborting the run.
    #[arg(long, global = true)]
    pub skip_invalid: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert an access log to CSV.
    Csv(CsvArgs),
    /// Load an access log into a ClickHouse table.
    Load(LoadArgs),
    /// Strip syslog-style `<tag>: ` prefixes from a raw log.
    Clean(CleanArgs),
}

#[derive(Debug, Args)]
pub struct CsvArgs {
    /// Access log to read.
    pub input: PathBuf,

    /// CSV file to write [default: <INPUT>.csv].
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Access log to read.
    pub input: PathBuf,

    /// ClickHouse HTTP interface URL [default: http://127.0.0.1:8123].
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub database: Option<String>,

    /// Target table [default: access_logs].
    #[arg(long)]
    pub table: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long, env = "LOGLOAD_CLICKHOUSE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Raw log to read.
    pub input: PathBuf,

    /// Cleaned log to write [default: <INPUT>.clean].
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Tracing filter directive derived from `-v`/`-q`.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

impl CsvArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| with_suffix(&self.input, "csv"))
    }
}

impl CleanArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| with_suffix(&self.input, "clean"))
    }
}

/// `access.log` → `access.log.<suffix>`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
