//! Writer pool: delivery, dead-lettering and ordered acknowledgment

#[cfg(test)]
mod tests {
    use crate::core::shutdown::ShutdownCoordinator;
    use crate::relay::api::{
        MessageReader, ProcessError, ReaderSettings, WriterPool, WriterStats,
    };
    use crate::relay::tests::{ack_into, record, AckLog, FnProcessor, MemorySink};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn settings(queue_size: usize) -> ReaderSettings {
        ReaderSettings {
            queue_size,
            queue_timeout: Duration::from_millis(20),
            purge_time: Duration::from_millis(50),
        }
    }

    fn wait_for_acks(stats: &WriterStats, expected: u64) {
        let deadline = Instant::now() + Duration::from_secs(20);
        while stats.acknowledged() < expected {
            assert!(Instant::now() < deadline, "timed out waiting for acknowledgments");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_pool_processes_everything_and_acknowledges_in_order() {
        let partitions = 3;
        let per_partition = 60;
        let total = (partitions * per_partition) as u64;

        let reader = Arc::new(MessageReader::new(&settings(32)).unwrap());
        let sink = Arc::new(MemorySink::default());
        let processor = Arc::new(FnProcessor(|payload: &serde_json::Value| {
            let offset = payload["offset"].as_i64().unwrap_or(0);
            // Uneven work so writers finish out of order
            thread::sleep(Duration::from_micros((offset as u64 * 37) % 400));
            match offset % 10 {
                3 => Err(ProcessError::Client {
                    status: 400,
                    message: "Bad Request".to_string(),
                }),
                7 => Err(ProcessError::Server {
                    status: 503,
                    message: "Service Unavailable".to_string(),
                }),
                _ => Ok(()),
            }
        }));
        let shutdown = ShutdownCoordinator::new();
        let pool = WriterPool::start(
            4,
            Arc::clone(&reader),
            processor,
            sink.clone(),
            Duration::from_millis(20),
            shutdown.clone(),
        )
        .unwrap();
        assert_eq!(pool.size(), 4);
        let stats = pool.stats();

        let log = AckLog::default();
        for offset in 0..per_partition as i64 {
            for partition in 0..partitions as i32 {
                let r = record(partition, offset);
                reader.queue(r.clone(), ack_into(&log, &r)).unwrap();
            }
        }

        wait_for_acks(&stats, total);
        reader.close();
        let stats = pool.join().unwrap();

        assert_eq!(stats.processed(), total);
        assert_eq!(stats.acknowledged(), total);
        // Offsets ending in 3 or 7 fail
        assert_eq!(stats.dead_lettered(), total / 5);
        assert_eq!(sink.letters.lock().unwrap().len() as u64, total / 5);

        let mut per_partition_acks: BTreeMap<i32, Vec<i64>> = BTreeMap::new();
        for (partition, offset) in log.lock().unwrap().iter() {
            per_partition_acks.entry(*partition).or_default().push(*offset);
        }
        for offsets in per_partition_acks.values() {
            assert_eq!(*offsets, (0..per_partition as i64).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_panicking_processor_is_dead_lettered() {
        let reader = Arc::new(MessageReader::new(&settings(8)).unwrap());
        let sink = Arc::new(MemorySink::default());
        let processor = Arc::new(FnProcessor(|payload: &serde_json::Value| {
            if payload["offset"] == 1 {
                panic!("boom");
            }
            Ok(())
        }));
        let pool = WriterPool::start(
            1,
            Arc::clone(&reader),
            processor,
            sink.clone(),
            Duration::from_millis(20),
            ShutdownCoordinator::new(),
        )
        .unwrap();
        let stats = pool.stats();

        let log = AckLog::default();
        for offset in 0..3 {
            let r = record(0, offset);
            reader.queue(r.clone(), ack_into(&log, &r)).unwrap();
        }

        wait_for_acks(&stats, 3);
        reader.close();
        pool.join().unwrap();

        let letters = sink.letters.lock().unwrap();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].0.as_deref(), Some("key-0-1"));
        assert!(letters[0].1.error.contains("boom"));
        assert_eq!(*log.lock().unwrap(), vec![(0, 0), (0, 1), (0, 2)]);
    }

    #[test]
    fn test_shutdown_stops_idle_writers() {
        let reader = Arc::new(MessageReader::new(&settings(8)).unwrap());
        let shutdown = ShutdownCoordinator::new();
        let pool = WriterPool::start(
            3,
            reader,
            Arc::new(FnProcessor(|_: &serde_json::Value| Ok(()))),
            Arc::new(MemorySink::default()),
            Duration::from_millis(20),
            shutdown.clone(),
        )
        .unwrap();

        shutdown.trigger_shutdown();
        let stats = pool.join().unwrap();
        assert_eq!(stats.processed(), 0);
    }

    #[test]
    fn test_zero_writers_is_rejected() {
        let reader = Arc::new(MessageReader::new(&settings(8)).unwrap());
        let result = WriterPool::start(
            0,
            reader,
            Arc::new(FnProcessor(|_: &serde_json::Value| Ok(()))),
            Arc::new(MemorySink::default()),
            Duration::from_millis(20),
            ShutdownCoordinator::new(),
        );
        assert!(result.is_err());
    }
}
