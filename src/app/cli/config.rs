//! TOML configuration file parsing and effective settings
//!
//! Settings are resolved in three layers: built-in defaults, then the TOML
//! file, then the command line. The file is organised in sections:
//!
//! ```toml
//! [reader]
//! queue-size = 10000
//! queue-timeout = "250ms"
//! purge-time = "50ms"
//!
//! [writer]
//! threads = 8
//! poll-timeout = "250ms"
//!
//! [processor]
//! base-uri = "http://localhost:8080"
//! request-timeout = "5s"
//! retry-attempts = 3
//! retry-delay = "500ms"
//!
//! [dead-letter]
//! file = "dlq.jsonl"
//!
//! [log]
//! level = "info"
//! format = "text"
//! file = "relay.log"
//! ```

use crate::core::error_handling::ContextualError;
use crate::core::logging::LogFormat;
use crate::core::retry::RetryPolicy;
use crate::core::validation::{parse_duration, parse_positive_duration, validate_base_uri};
use crate::relay::ReaderSettings;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::args::Args;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{message}")]
    File { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::File { message, .. } | ConfigError::InvalidValue { message, .. } => {
                Some(message)
            }
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Effective relay settings
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub input: String,
    pub reader: ReaderSettings,
    pub threads: usize,
    pub poll_timeout: Duration,
    pub base_uri: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub dlq_file: Option<PathBuf>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_file: Option<String>,
    pub color: Option<bool>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            input: "-".to_string(),
            reader: ReaderSettings::default(),
            threads: 8,
            poll_timeout: Duration::from_millis(250),
            base_uri: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            dlq_file: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            log_file: None,
            color: None,
        }
    }
}

/// `<config_dir>/auditrelay/auditrelay.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("auditrelay").join("auditrelay.toml"))
}

/// Read and parse a configuration file
///
/// An explicitly named file must exist; the default location is optional.
pub fn load_config_file(explicit: Option<&Path>) -> ConfigResult<Option<(PathBuf, toml::Table)>> {
    let path = match explicit {
        Some(path) if !path.exists() => {
            return Err(ConfigError::File {
                path: path.to_path_buf(),
                message: format!(
                    "The specified configuration file does not exist: {}",
                    path.display()
                ),
            });
        }
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::File {
        path: path.clone(),
        message: format!("Error reading configuration file {}: {e}", path.display()),
    })?;
    let table = toml::from_str::<toml::Table>(&contents).map_err(|e| ConfigError::File {
        path: path.clone(),
        message: format!("Error parsing configuration file {}: {e}", path.display()),
    })?;
    Ok(Some((path, table)))
}

impl RelayConfig {
    /// Resolve defaults, the configuration file and the command line
    pub fn load(args: &Args) -> ConfigResult<(Self, Option<PathBuf>)> {
        let mut config = Self::default();
        let source = match load_config_file(args.config_file.as_deref())? {
            Some((path, table)) => {
                config.apply_toml_values(&table)?;
                Some(path)
            }
            None => None,
        };
        config.apply_args(args);
        config.validate()?;
        Ok((config, source))
    }

    /// Apply TOML configuration values
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> ConfigResult<()> {
        if let Some(reader) = section(config, "reader")? {
            if let Some(size) = positive_int(reader, "reader", "queue-size")? {
                self.reader.queue_size = size;
            }
            if let Some(timeout) = duration(reader, "reader", "queue-timeout", true)? {
                self.reader.queue_timeout = timeout;
            }
            if let Some(budget) = duration(reader, "reader", "purge-time", true)? {
                self.reader.purge_time = budget;
            }
        }

        if let Some(writer) = section(config, "writer")? {
            if let Some(threads) = positive_int(writer, "writer", "threads")? {
                self.threads = threads;
            }
            if let Some(timeout) = duration(writer, "writer", "poll-timeout", true)? {
                self.poll_timeout = timeout;
            }
        }

        if let Some(processor) = section(config, "processor")? {
            if let Some(uri) = string(processor, "processor", "base-uri")? {
                self.base_uri =
                    validate_base_uri(uri).map_err(|e| invalid("processor.base-uri", e))?;
            }
            if let Some(timeout) = duration(processor, "processor", "request-timeout", true)? {
                self.request_timeout = timeout;
            }
            if let Some(attempts) = positive_int(processor, "processor", "retry-attempts")? {
                self.retry.max_attempts = attempts;
            }
            if let Some(delay) = duration(processor, "processor", "retry-delay", false)? {
                self.retry.delay = delay;
            }
        }

        if let Some(dead_letter) = section(config, "dead-letter")? {
            if let Some(file) = string(dead_letter, "dead-letter", "file")? {
                self.dlq_file = disabled_or(file).map(PathBuf::from);
            }
        }

        if let Some(log) = section(config, "log")? {
            if let Some(level) = string(log, "log", "level")? {
                self.log_level = log_level(level).map_err(|e| invalid("log.level", e))?;
            }
            if let Some(format) = string(log, "log", "format")? {
                self.log_format =
                    LogFormat::parse(format).map_err(|e| invalid("log.format", e.to_string()))?;
            }
            if let Some(file) = string(log, "log", "file")? {
                self.log_file = disabled_or(file).map(str::to_string);
            }
            if let Some(value) = log.get("color") {
                let color = value
                    .as_bool()
                    .ok_or_else(|| invalid("log.color", "expected true or false"))?;
                self.color = Some(color);
            }
        }

        Ok(())
    }

    /// Apply command line values; clap has already validated them
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(input) = &args.input {
            self.input = input.clone();
        }
        if let Some(uri) = &args.base_uri {
            self.base_uri = uri.clone();
        }
        if let Some(threads) = args.threads {
            self.threads = threads;
        }
        if let Some(size) = args.queue_size {
            self.reader.queue_size = size;
        }
        if let Some(timeout) = args.queue_timeout {
            self.reader.queue_timeout = timeout;
        }
        if let Some(budget) = args.purge_time {
            self.reader.purge_time = budget;
        }
        if let Some(timeout) = args.poll_timeout {
            self.poll_timeout = timeout;
        }
        if let Some(file) = &args.dlq_file {
            self.dlq_file = Some(file.clone());
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if let Some(format) = args.log_format.as_deref() {
            if let Ok(format) = LogFormat::parse(format) {
                self.log_format = format;
            }
        }
        if let Some(file) = args.log_file.as_deref() {
            self.log_file = disabled_or(file).map(str::to_string);
        }
        if let Some(color) = args.color_override() {
            self.color = Some(color);
        }
        self.log_level = shift_level(&self.log_level, args.verbosity());
    }

    /// Cross-field checks that apply whatever the source of a value
    pub fn validate(&self) -> ConfigResult<()> {
        // The shared cursor always pins one record, so a single slot could never be freed
        if self.reader.queue_size < 2 {
            return Err(invalid(
                "reader.queue-size",
                format!("must be at least 2, got {}", self.reader.queue_size),
            ));
        }
        if self.threads == 0 {
            return Err(invalid("writer.threads", "Value must be greater than 0"));
        }
        if self.input.trim().is_empty() {
            return Err(invalid("input", "must name a file or '-' for stdin"));
        }
        Ok(())
    }

    /// Explicit setting, else `NO_COLOR`, else whether stdout is a terminal
    pub fn use_color(&self) -> bool {
        match self.color {
            Some(color) => color,
            None => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
        }
    }
}

fn section<'a>(config: &'a toml::Table, name: &str) -> ConfigResult<Option<&'a toml::Table>> {
    match config.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_table()
            .map(Some)
            .ok_or_else(|| invalid(name, "expected a [section]")),
    }
}

fn string<'a>(table: &'a toml::Table, section: &str, key: &str) -> ConfigResult<Option<&'a str>> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| invalid(&format!("{section}.{key}"), "expected a string")),
    }
}

fn positive_int(table: &toml::Table, section: &str, key: &str) -> ConfigResult<Option<usize>> {
    let Some(value) = table.get(key) else {
        return Ok(None);
    };
    match value.as_integer() {
        Some(n) if n > 0 => Ok(Some(n as usize)),
        Some(_) => Err(invalid(
            &format!("{section}.{key}"),
            "Value must be greater than 0",
        )),
        None => Err(invalid(&format!("{section}.{key}"), "expected an integer")),
    }
}

/// Durations are strings with a unit, or integers in milliseconds
fn duration(
    table: &toml::Table,
    section: &str,
    key: &str,
    positive: bool,
) -> ConfigResult<Option<Duration>> {
    let Some(value) = table.get(key) else {
        return Ok(None);
    };
    let text = match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(n) if *n >= 0 => n.to_string(),
        _ => {
            return Err(invalid(
                &format!("{section}.{key}"),
                "expected a duration such as \"250ms\"",
            ))
        }
    };
    let parsed = if positive {
        parse_positive_duration(&text)
    } else {
        parse_duration(&text)
    };
    parsed
        .map(Some)
        .map_err(|e| invalid(&format!("{section}.{key}"), e))
}

/// `none` and `-` switch a file setting off
fn disabled_or(value: &str) -> Option<&str> {
    if value.eq_ignore_ascii_case("none") || value == "-" {
        None
    } else {
        Some(value)
    }
}

fn log_level(value: &str) -> Result<String, String> {
    let lowered = value.to_ascii_lowercase();
    if LOG_LEVELS.contains(&lowered.as_str()) {
        Ok(lowered)
    } else {
        Err(format!(
            "'{value}' is not a log level (expected one of {})",
            LOG_LEVELS.join(", ")
        ))
    }
}

/// Move `level` by `verbosity` steps, clamped to `off` and `trace`
pub fn shift_level(level: &str, verbosity: i8) -> String {
    let Some(index) = LOG_LEVELS.iter().position(|l| *l == level) else {
        return level.to_string();
    };
    let shifted = (index as i64 + verbosity as i64).clamp(0, LOG_LEVELS.len() as i64 - 1);
    LOG_LEVELS[shifted as usize].to_string()
}
