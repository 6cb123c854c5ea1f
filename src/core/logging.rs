//! Logging setup on top of flexi_logger
//!
//! Every line carries the emitting thread's name so that work done by
//! individual writer threads can be followed through the log.

use flexi_logger::{DeferredNow, FileSpec, Logger, LoggerHandle};
use std::io::Write;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

static LOGGER_HANDLE: OnceLock<Mutex<LoggerHandle>> = OnceLock::new();

/// Output layout for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// `timestamp LVL [thread] message`
    #[default]
    Text,
    /// Text plus the source location
    Ext,
    /// One compact JSON object per line
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Unknown log format '{format}' (expected text, ext or json)")]
    UnknownFormat { format: String },

    #[error("Invalid log level '{level}': {message}")]
    InvalidLevel { level: String, message: String },

    #[error("Cannot write log file '{path}': {message}")]
    LogFile { path: String, message: String },

    #[error("Logger initialisation failed: {message}")]
    Start { message: String },

    #[error("Logger has not been initialised")]
    NotInitialised,
}

impl LogFormat {
    pub fn parse(format: &str) -> Result<Self, LoggingError> {
        Self::from_str(format).map_err(|_| LoggingError::UnknownFormat {
            format: format.to_string(),
        })
    }
}

/// Install the global logger
///
/// Later calls keep the first logger; the level can still be changed through
/// [`set_log_level`].
pub fn init_logging(
    log_level: &str,
    log_format: LogFormat,
    log_file: Option<&str>,
    color_enabled: bool,
) -> Result<(), LoggingError> {
    let mut logger = Logger::try_with_str(log_level).map_err(|e| LoggingError::InvalidLevel {
        level: log_level.to_string(),
        message: e.to_string(),
    })?;

    // Files never get escape sequences
    let colored = color_enabled && log_file.is_none();
    logger = match (log_format, colored) {
        (LogFormat::Json, _) => logger.format(json_format),
        (LogFormat::Ext, true) => logger.format(extended_color_format),
        (LogFormat::Ext, false) => logger.format(extended_format),
        (LogFormat::Text, true) => logger.format(simple_color_format),
        (LogFormat::Text, false) => logger.format(simple_format),
    };

    if let Some(file_path) = log_file {
        let file_spec = FileSpec::try_from(std::path::Path::new(file_path)).map_err(|e| {
            LoggingError::LogFile {
                path: file_path.to_string(),
                message: e.to_string(),
            }
        })?;
        logger = logger.log_to_file(file_spec);
    }

    let handle = logger.start().map_err(|e| LoggingError::Start {
        message: e.to_string(),
    })?;
    let _ = LOGGER_HANDLE.set(Mutex::new(handle));

    Ok(())
}

/// Change the active log level at runtime
pub fn set_log_level(log_level: &str) -> Result<(), LoggingError> {
    let handle_mutex = LOGGER_HANDLE.get().ok_or(LoggingError::NotInitialised)?;
    let mut handle = handle_mutex
        .lock()
        .map_err(|_| LoggingError::NotInitialised)?;
    handle
        .parse_and_push_temp_spec(log_level)
        .map_err(|e| LoggingError::InvalidLevel {
            level: log_level.to_string(),
            message: e.to_string(),
        })
}

fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERR",
        log::Level::Warn => "WRN",
        log::Level::Info => "INF",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRC",
    }
}

fn colored_level_tag(level: log::Level) -> colored::ColoredString {
    use colored::Colorize;

    match level {
        log::Level::Error => "ERR".red().bold(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Info => "INF".green(),
        log::Level::Debug => "DBG".blue(),
        log::Level::Trace => "TRC".magenta(),
    }
}

fn thread_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or("unnamed")
        .to_string()
}

// "YYYY-MM-DD HH:mm:ss.fff INF [writer-1] message"
fn simple_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_tag(record.level()),
        thread_name(),
        record.args()
    )
}

fn simple_color_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    use colored::Colorize;

    write!(
        w,
        "{} {} {} {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
        colored_level_tag(record.level()),
        format!("[{}]", thread_name()).cyan(),
        record.args()
    )
}

// "YYYY-MM-DD HH:mm:ss.fff INF [writer-1] message (relay/writer.rs:42)"
fn extended_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} [{}] {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_tag(record.level()),
        thread_name(),
        record.args(),
        format_target_as_path(record.target(), record.line())
    )
}

fn extended_color_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    use colored::Colorize;

    write!(
        w,
        "{} {} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
        colored_level_tag(record.level()),
        format!("[{}]", thread_name()).cyan(),
        record.args(),
        format_target_as_path(record.target(), record.line()).dimmed()
    )
}

fn json_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    let json_obj = serde_json::json!({
        "timestamp": now.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
        "level": level_tag(record.level()),
        "thread": thread_name(),
        "message": record.args().to_string(),
        "target": format_target_as_path(record.target(), record.line()),
    });

    match serde_json::to_string(&json_obj) {
        Ok(json_string) => w.write_all(json_string.as_bytes()),
        Err(_) => w.write_all(b"{\"error\":\"Failed to serialize log message\"}"),
    }
}

/// `auditrelay::relay::writer` + line 42 -> `relay/writer.rs:42`
fn format_target_as_path(target: &str, line: Option<u32>) -> String {
    let path_like = match target.strip_prefix("auditrelay::") {
        Some(without_prefix) => without_prefix.replace("::", "/") + ".rs",
        None => target.replace("::", "/"),
    };

    match line {
        Some(line_num) => format!("{path_like}:{line_num}"),
        None => path_like,
    }
}
