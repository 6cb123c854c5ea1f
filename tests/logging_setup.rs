//! Global logger setup; the logger can only be installed once per process

use auditrelay::core::logging::{init_logging, set_log_level, LogFormat, LoggingError};
use serial_test::serial;

#[test]
#[serial]
fn test_logger_lifecycle() {
    assert!(matches!(
        set_log_level("debug"),
        Err(LoggingError::NotInitialised)
    ));

    init_logging("warn", LogFormat::Json, None, false).unwrap();
    assert_eq!(log::max_level(), log::LevelFilter::Warn);

    set_log_level("debug").unwrap();
    assert_eq!(log::max_level(), log::LevelFilter::Debug);
    log::debug!("level raised at runtime");

    // The first logger stays installed
    assert!(init_logging("info", LogFormat::Text, None, false).is_err());
    assert_eq!(log::max_level(), log::LevelFilter::Debug);
}
