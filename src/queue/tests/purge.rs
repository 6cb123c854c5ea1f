//! Purge pass: reclamation, cursor protection and time budgets

#[cfg(test)]
mod tests {
    use crate::core::time::MockTimeProvider;
    use crate::queue::api::{PendingQueue, PurgeHalt};
    use std::sync::Arc;
    use std::time::Duration;

    const CAPACITY: usize = 5000;

    fn queue_of(items: impl IntoIterator<Item = u32>) -> Arc<PendingQueue<u32>> {
        let queue = Arc::new(PendingQueue::new(CAPACITY).unwrap());
        for item in items {
            queue.add(item).unwrap();
        }
        queue
    }

    #[test]
    fn test_purge_without_cursors_empties_queue() {
        let queue = queue_of(0..200);
        assert_eq!(queue.remaining_capacity(), 4800);

        let report = queue.purge(|_| true).unwrap();

        assert_eq!(report.reclaimed, 200);
        assert_eq!(report.halt, PurgeHalt::Exhausted);
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.remaining_capacity(), CAPACITY);
    }

    #[test]
    fn test_fresh_cursor_blocks_purge() {
        let queue = queue_of(0..200);
        let _cursor = queue.cursor().unwrap();

        let report = queue.purge(|_| true).unwrap();

        assert_eq!(report.reclaimed, 0);
        assert_eq!(report.halt, PurgeHalt::Pinned);
        assert_eq!(queue.size(), 200);
    }

    #[test]
    fn test_purge_stops_before_cursor_position() {
        let queue = queue_of(0..200);
        let cursor = queue.cursor().unwrap();
        for expected in 0..3 {
            assert_eq!(cursor.next().unwrap(), expected);
        }

        // Elements 0 and 1 are behind the cursor; 2 is pinned
        let report = queue.purge(|_| true).unwrap();
        assert_eq!(report.reclaimed, 2);
        assert_eq!(queue.size(), 198);

        let late = queue.cursor().unwrap();
        assert_eq!(late.next().unwrap(), 2);
        assert_eq!(cursor.next().unwrap(), 3);
    }

    #[test]
    fn test_released_cursor_no_longer_blocks_purge() {
        let queue = queue_of(0..10);
        let cursor = queue.cursor().unwrap();
        assert_eq!(queue.purge(|_| true).unwrap().reclaimed, 0);

        drop(cursor);

        assert_eq!(queue.purge(|_| true).unwrap().reclaimed, 10);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_purge_keeps_unreclaimable_elements_in_order() {
        let queue = queue_of(0..20);

        let report = queue.purge(|n| n % 2 == 0).unwrap();

        assert_eq!(report.reclaimed, 10);
        assert_eq!(
            queue.to_vec().unwrap(),
            (0..20).filter(|n| n % 2 == 1).collect::<Vec<_>>()
        );
        // The tail is still usable after reclaiming the last element
        queue.add(100).unwrap();
        assert_eq!(queue.to_vec().unwrap().last(), Some(&100));
    }

    #[test]
    fn test_purge_frees_space_for_blocked_producer() {
        let queue = Arc::new(PendingQueue::new(2).unwrap());
        queue.add(1u32).unwrap();
        queue.add(2).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.try_insert(3, Duration::from_secs(5)))
        };
        std::thread::sleep(Duration::from_millis(20));
        queue.purge(|n| *n == 1).unwrap();

        assert!(producer.join().unwrap().unwrap());
        assert_eq!(queue.to_vec().unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_budgeted_purge_reclaims_prefix_deterministically() {
        let queue = queue_of(0..2000);
        let clock = MockTimeProvider::new();

        // Each predicate call costs 5ms; the 12th check finds 55ms > 50ms
        let report = queue
            .purge_with_clock(
                |_| {
                    clock.advance_time(Duration::from_millis(5));
                    true
                },
                Duration::from_millis(50),
                &clock,
            )
            .unwrap();

        assert_eq!(report.reclaimed, 11);
        assert_eq!(report.halt, PurgeHalt::Budget);
        assert_eq!(queue.size(), 1989);
        assert_eq!(queue.peek(), Some(11));
    }

    #[test]
    fn test_budgeted_purge_with_real_clock_reclaims_strict_prefix() {
        let queue = queue_of(0..2000);

        let report = queue
            .purge_within(
                |_| {
                    std::thread::sleep(Duration::from_millis(5));
                    true
                },
                Duration::from_millis(50),
            )
            .unwrap();

        assert!(report.reclaimed > 0);
        assert!(report.reclaimed < 2000);
        assert_eq!(report.halt, PurgeHalt::Budget);
        assert_eq!(queue.size(), 2000 - report.reclaimed);
        assert_eq!(queue.peek(), Some(report.reclaimed as u32));
    }

    #[test]
    fn test_halt_reason_display() {
        assert_eq!(PurgeHalt::Exhausted.to_string(), "exhausted");
        assert_eq!(PurgeHalt::Pinned.to_string(), "pinned");
        assert_eq!(PurgeHalt::Budget.to_string(), "budget");
    }
}
