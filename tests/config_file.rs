//! Configuration file discovery and layering through the command line

use auditrelay::app::cli::{Args, ConfigError, RelayConfig};
use auditrelay::core::error_handling::ContextualError;
use auditrelay::core::logging::LogFormat;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

fn load(file: &tempfile::NamedTempFile, extra: &[&str]) -> Result<RelayConfig, ConfigError> {
    let path = file.path().to_str().unwrap();
    let argv = ["auditrelay", "--config-file", path]
        .into_iter()
        .chain(extra.iter().copied());
    RelayConfig::load(&Args::try_parse_from(argv).unwrap()).map(|(config, _)| config)
}

fn config_file(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_configuration_file() {
    let file = config_file(
        r#"
[reader]
queue-size = 256
queue-timeout = "100ms"
purge-time = "10ms"

[writer]
threads = 2
poll-timeout = "1s"

[processor]
base-uri = "https://consumer.example.com/"
request-timeout = "30s"
retry-attempts = 1
retry-delay = "2s"

[dead-letter]
file = "/var/lib/auditrelay/dlq.jsonl"

[log]
level = "warn"
format = "ext"
"#,
    );

    let config = load(&file, &[]).unwrap();
    assert_eq!(config.reader.queue_size, 256);
    assert_eq!(config.reader.queue_timeout, Duration::from_millis(100));
    assert_eq!(config.reader.purge_time, Duration::from_millis(10));
    assert_eq!(config.threads, 2);
    assert_eq!(config.poll_timeout, Duration::from_secs(1));
    assert_eq!(config.base_uri, "https://consumer.example.com");
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.retry.max_attempts, 1);
    assert_eq!(config.retry.delay, Duration::from_secs(2));
    assert_eq!(
        config.dlq_file,
        Some(PathBuf::from("/var/lib/auditrelay/dlq.jsonl"))
    );
    assert_eq!(config.log_level, "warn");
    assert_eq!(config.log_format, LogFormat::Ext);
}

#[test]
fn test_command_line_wins() {
    let file = config_file("[writer]\nthreads = 2\n[log]\nformat = \"json\"\nfile = \"relay.log\"\n");
    let config = load(
        &file,
        &["--threads", "6", "--log-format", "text", "--log-file", "none", "-qq"],
    )
    .unwrap();

    assert_eq!(config.threads, 6);
    assert_eq!(config.log_format, LogFormat::Text);
    assert_eq!(config.log_file, None);
    assert_eq!(config.log_level, "error");
}

#[test]
fn test_command_line_cannot_shrink_queue_below_two() {
    let file = config_file("");
    let error = load(&file, &["--queue-size", "1"]).unwrap_err();
    assert!(error.is_user_actionable());
    assert!(matches!(
        error,
        ConfigError::InvalidValue { ref key, .. } if key == "reader.queue-size"
    ));
}
