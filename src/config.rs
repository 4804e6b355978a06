//! Configuration management with TOML file support.
//!
//! Merges settings from three sources (highest precedence first):
//! 1. CLI flags
//! 2. Config file (`--config PATH`, or `logload.toml` in the working directory)
//! 3. Built-in defaults

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::{Error, Result};
use crate::nginx::extract_nginx_format;
use crate::pipeline::ErrorPolicy;
use crate::row::COMBINED_FORMAT;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "logload.toml";

/// nginx `log_format` name used when only a config path is given.
pub const DEFAULT_LOG_FORMAT_NAME: &str = "main";

/// Connection settings for the ClickHouse HTTP interface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClickHouseSettings {
    /// Base URL of the HTTP interface.
    pub url: String,
    pub database: Option<String>,
    pub table: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout. The final insert carries the whole run.
    pub timeout_secs: u64,
}

impl Default for ClickHouseSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8123".to_string(),
            database: None,
            table: "access_logs".to_string(),
            user: None,
            password: None,
            timeout_secs: 300,
        }
    }
}

/// Runtime configuration merged from defaults, config file, and CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Resolved log format template.
    pub format: String,
    pub error_policy: ErrorPolicy,
    pub clickhouse: ClickHouseSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: COMBINED_FORMAT.to_string(),
            error_policy: ErrorPolicy::FailFast,
            clickhouse: ClickHouseSettings::default(),
        }
    }
}

/// Where the log format template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FormatSource {
    Literal(String),
    Nginx { config: PathBuf, name: String },
}

impl FormatSource {
    fn resolve(self) -> Result<String> {
        match self {
            Self::Literal(format) => Ok(format),
            Self::Nginx { config, name } => {
                debug!(config = %config.display(), name = %name, "reading log_format from nginx config");
                extract_nginx_format(File::open(&config)?, &name)
            }
        }
    }
}

impl Config {
    /// Build a [`Config`] from CLI arguments, loading the config file if present.
    ///
    /// Merge precedence: CLI flags > config file > defaults. An explicit
    /// `--config` path must exist; the default file is optional.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file_config = match &cli.config {
            Some(path) => Some(FileConfig::load(path)?),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Some(FileConfig::load(path)?)
                } else {
                    None
                }
            }
        };
        Self::merge(cli, file_config.unwrap_or_default())
    }

    fn merge(cli: &Cli, file: FileConfig) -> Result<Self> {
        let mut config = Self::default();

        let source = format_source(
            cli.format.clone(),
            cli.nginx_config.clone(),
            cli.log_format.clone(),
        )
        .or_else(|| format_source(file.format, file.nginx_config, file.log_format));
        if let Some(source) = source {
            config.format = source.resolve()?;
        }

        if cli.skip_invalid || file.skip_invalid.unwrap_or(false) {
            config.error_policy = ErrorPolicy::Skip;
        }

        if let Some(clickhouse) = file.clickhouse {
            config.clickhouse = clickhouse;
        }

        if let Command::Load(args) = &cli.command {
            let settings = &mut config.clickhouse;
            if let Some(url) = &args.url {
                settings.url.clone_from(url);
            }
            if args.database.is_some() {
                settings.database.clone_from(&args.database);
            }
            if let Some(table) = &args.table {
                settings.table.clone_from(table);
            }
            if args.user.is_some() {
                settings.user.clone_from(&args.user);
            }
            if args.password.is_some() {
                settings.password.clone_from(&args.password);
            }
        }

        Ok(config)
    }
}

fn format_source(
    format: Option<String>,
    nginx_config: Option<PathBuf>,
    log_format: Option<String>,
) -> Option<FormatSource> {
    match (format, nginx_config) {
        (Some(format), _) => Some(FormatSource::Literal(format)),
        (None, Some(config)) => Some(FormatSource::Nginx {
            config,
            name: log_format.unwrap_or_else(|| DEFAULT_LOG_FORMAT_NAME.to_string()),
        }),
        (None, None) => None,
    }
}

/// Config file structure (TOML deserialization).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    format: Option<String>,
    nginx_config: Option<PathBuf>,
    log_format: Option<String>,
    skip_invalid: Option<bool>,
    clickhouse: Option<ClickHouseSettings>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }
}
