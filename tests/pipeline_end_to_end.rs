//! End-to-end relay runs through the public library API

mod common;

use auditrelay::app::cli::RelayConfig;
use auditrelay::app::pipeline::run_pipeline;
use auditrelay::core::shutdown::ShutdownCoordinator;
use auditrelay::relay::{JsonlDeadLetterSink, LogDeadLetterSink, ReaderSettings};
use common::{jsonl_records, source_from, RecordingProcessor};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn config(queue_size: usize, threads: usize) -> RelayConfig {
    RelayConfig {
        reader: ReaderSettings {
            queue_size,
            queue_timeout: Duration::from_millis(10),
            purge_time: Duration::from_millis(50),
        },
        threads,
        poll_timeout: Duration::from_millis(20),
        ..RelayConfig::default()
    }
}

#[test]
fn test_relay_delivers_everything_and_commits_every_partition() {
    let dir = tempfile::tempdir().unwrap();
    let dlq_path = dir.path().join("dlq.jsonl");
    let processor = Arc::new(RecordingProcessor::new(10));
    let sink = Arc::new(JsonlDeadLetterSink::open(&dlq_path).unwrap());

    // Far more records than slots, so the run depends on purging
    let summary = run_pipeline(
        &config(16, 4),
        source_from(jsonl_records(3, 50)),
        processor.clone(),
        sink,
        ShutdownCoordinator::new(),
    )
    .unwrap();

    assert!(!summary.interrupted);
    assert_eq!(summary.ingested, 150);
    assert_eq!(summary.processed, 150);
    assert_eq!(summary.acknowledged, 150);
    assert_eq!(summary.dead_lettered, 15);
    assert_eq!(
        summary.committed,
        vec![
            ("audit".to_string(), 0, 50),
            ("audit".to_string(), 1, 50),
            ("audit".to_string(), 2, 50),
        ]
    );
    assert_eq!(processor.calls.load(Ordering::Acquire), 150);

    let letters: Vec<Value> = std::fs::read_to_string(&dlq_path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(letters.len(), 15);
    for letter in &letters {
        assert_eq!(letter["data"]["offset"].as_i64().unwrap() % 10, 0);
        assert_eq!(letter["error"], "422 Unprocessable Entity");
        assert!(letter["key"].as_str().unwrap().starts_with("k-"));
    }
}

#[test]
fn test_smallest_queue_still_drains() {
    let processor = Arc::new(RecordingProcessor::new(0));
    let summary = run_pipeline(
        &config(2, 1),
        source_from(jsonl_records(1, 40)),
        processor.clone(),
        Arc::new(LogDeadLetterSink),
        ShutdownCoordinator::new(),
    )
    .unwrap();

    assert_eq!(summary.acknowledged, 40);
    assert_eq!(summary.committed, vec![("audit".to_string(), 0, 40)]);

    let offsets: Vec<i64> = processor
        .seen
        .lock()
        .unwrap()
        .iter()
        .map(|payload| payload["offset"].as_i64().unwrap())
        .collect();
    assert_eq!(offsets, (0..40).collect::<Vec<_>>());
}

#[test]
fn test_malformed_lines_are_skipped() {
    let mut input = String::from("not json\n\n");
    input.push_str("{\"value\":{\"offset\":1}}\n");
    input.push_str("{\"partition\":1}\n");
    input.push_str("{\"topic\":\"other\",\"value\":{\"offset\":2}}\n");

    let summary = run_pipeline(
        &config(8, 2),
        source_from(input),
        Arc::new(RecordingProcessor::new(0)),
        Arc::new(LogDeadLetterSink),
        ShutdownCoordinator::new(),
    )
    .unwrap();

    assert_eq!(summary.ingested, 2);
    assert_eq!(summary.acknowledged, 2);
    assert_eq!(
        summary.committed,
        vec![("audit".to_string(), 0, 1), ("other".to_string(), 0, 1)]
    );
}

#[test]
fn test_requested_shutdown_interrupts_the_run() {
    let shutdown = ShutdownCoordinator::new();
    shutdown.trigger_shutdown();

    let summary = run_pipeline(
        &config(4, 2),
        source_from(jsonl_records(1, 100)),
        Arc::new(RecordingProcessor::new(0)),
        Arc::new(LogDeadLetterSink),
        shutdown,
    )
    .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.processed, 0);
    assert!(summary.ingested <= 4);
}
