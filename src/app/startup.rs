//! Application startup and orchestration

use crate::app::cli::{Args, RelayConfig};
use crate::app::pipeline::{run_pipeline, RelaySummary};
use crate::core::error_handling::{log_error_with_context, ContextualError};
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version::long_version;
use crate::relay::{
    DeadLetterSink, JsonlDeadLetterSink, LogDeadLetterSink, RecordSource, RelayError,
    RestApiCaller,
};
use std::path::Path;
use std::sync::Arc;

/// Errors that stop the relay before or while it runs
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{message}")]
    Input { message: String },

    #[error("{message}")]
    DeadLetter { message: String },

    #[error("{message}")]
    Processor { message: String },

    #[error("Cannot install signal handlers: {message}")]
    Signals { message: String },

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl ContextualError for StartupError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            StartupError::Input { .. }
                | StartupError::DeadLetter { .. }
                | StartupError::Processor { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            StartupError::Input { message }
            | StartupError::DeadLetter { message }
            | StartupError::Processor { message } => Some(message),
            _ => None,
        }
    }
}

/// Initialize application startup
pub fn startup() {
    let args = Args::parse_from_env();

    // Logging comes first so configuration errors are reported through it
    let loaded = RelayConfig::load(&args);
    let log_settings = match &loaded {
        Ok((config, _)) => config.clone(),
        Err(_) => {
            let mut fallback = RelayConfig::default();
            fallback.apply_args(&args);
            fallback
        }
    };
    if let Err(e) = init_logging(
        &log_settings.log_level,
        log_settings.log_format,
        log_settings.log_file.as_deref(),
        log_settings.use_color(),
    ) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let (config, config_path) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            log_error_with_context(&e, "Configuration loading");
            std::process::exit(1);
        }
    };

    log_banner(&config, config_path.as_deref());

    match run(&config) {
        Ok(summary) if summary.interrupted => {
            log::warn!(
                "Stopped early: {} of {} record(s) acknowledged",
                summary.acknowledged,
                summary.ingested
            );
        }
        Ok(_) => {}
        Err(e) => {
            log_error_with_context(&e, "Relay run");
            std::process::exit(1);
        }
    }
}

/// Build the collaborators from `config` and relay its input
pub fn run(config: &RelayConfig) -> Result<RelaySummary, StartupError> {
    let shutdown = ShutdownCoordinator::new();
    shutdown
        .install_signal_handlers()
        .map_err(|e| StartupError::Signals {
            message: e.to_string(),
        })?;

    let source = RecordSource::open(&config.input).map_err(|e| StartupError::Input {
        message: e.to_string(),
    })?;
    let processor = RestApiCaller::new(&config.base_uri, config.request_timeout, config.retry.clone())
        .map_err(|e| StartupError::Processor {
            message: format!("Cannot create the consumer API client: {e}"),
        })?;
    let dead_letter: Arc<dyn DeadLetterSink> = match &config.dlq_file {
        Some(path) => Arc::new(JsonlDeadLetterSink::open(path).map_err(|e| {
            StartupError::DeadLetter {
                message: e.to_string(),
            }
        })?),
        None => Arc::new(LogDeadLetterSink),
    };

    Ok(run_pipeline(
        config,
        source,
        Arc::new(processor),
        dead_letter,
        shutdown,
    )?)
}

fn log_banner(config: &RelayConfig, config_path: Option<&Path>) {
    log::info!("auditrelay {}", long_version());
    match config_path {
        Some(path) => log::info!("  config file     : {}", path.display()),
        None => log::info!("  config file     : (none)"),
    }
    log::info!("  input           : {}", config.input);
    log::info!("  consumer API    : {}", config.base_uri);
    log::info!(
        "  request timeout : {:?} ({} attempt(s), {:?} apart)",
        config.request_timeout,
        config.retry.max_attempts,
        config.retry.delay
    );
    log::info!("  writer threads  : {}", config.threads);
    log::info!("  poll timeout    : {:?}", config.poll_timeout);
    log::info!("  queue size      : {}", config.reader.queue_size);
    log::info!("  queue timeout   : {:?}", config.reader.queue_timeout);
    log::info!("  purge budget    : {:?}", config.reader.purge_time);
    match &config.dlq_file {
        Some(path) => log::info!("  dead letters    : {}", path.display()),
        None => log::info!("  dead letters    : log"),
    }
}
