//! Command line arguments
//!
//! Every option is optional so that unset flags fall through to the
//! configuration file and then to the built-in defaults.

use crate::core::validation::{parse_positive_duration, validate_base_uri, validate_positive_int};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "auditrelay")]
#[command(about = "Relay audit records to the consumer API with ordered acknowledgment")]
#[command(version, long_version = crate::core::version::long_version())]
#[command(after_help = "Durations accept ms, s, m or h suffixes; bare numbers are milliseconds")]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Record input, a JSON-lines file or '-' for stdin
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<String>,

    /// Base URI of the consumer API
    #[arg(short = 'b', long = "base-uri", value_name = "URI", value_parser = validate_base_uri)]
    pub base_uri: Option<String>,

    /// Number of writer threads
    #[arg(short = 't', long = "threads", value_name = "COUNT", value_parser = validate_positive_int)]
    pub threads: Option<usize>,

    /// Maximum number of records held in memory
    #[arg(long = "queue-size", value_name = "COUNT", value_parser = validate_positive_int)]
    pub queue_size: Option<usize>,

    /// How long one insertion attempt waits for space
    #[arg(long = "queue-timeout", value_name = "DURATION", value_parser = parse_positive_duration)]
    pub queue_timeout: Option<Duration>,

    /// Time budget for purging acknowledged records from a full queue
    #[arg(long = "purge-time", value_name = "DURATION", value_parser = parse_positive_duration)]
    pub purge_time: Option<Duration>,

    /// How long a writer waits for the next record
    #[arg(long = "poll-timeout", value_name = "DURATION", value_parser = parse_positive_duration)]
    pub poll_timeout: Option<Duration>,

    /// Append dead letters to this JSON-lines file instead of the log
    #[arg(short = 'd', long = "dlq-file", value_name = "FILE")]
    pub dlq_file: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<String>,

    /// Force colored output
    #[arg(long = "color", action = ArgAction::SetTrue, conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", action = ArgAction::SetTrue)]
    pub no_color: bool,

    /// More output (repeat for more)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Less output (repeat for less)
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,
}

impl Args {
    /// Parse from the process arguments, exiting with usage on error
    pub fn parse_from_env() -> Self {
        Self::parse()
    }

    /// `Some(true)` for `--color`, `Some(false)` for `--no-color`, otherwise `None`
    pub fn color_override(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// Net verbosity: each `-v` raises the level by one, each `-q` lowers it
    pub fn verbosity(&self) -> i8 {
        self.verbose.min(8) as i8 - self.quiet.min(8) as i8
    }
}
