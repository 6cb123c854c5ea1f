//! Tests for concurrent queue operations

#[cfg(test)]
mod tests {
    use crate::queue::api::{PendingQueue, QueueError};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_shared_cursor_delivers_each_element_once_in_order() {
        let total = 2000u32;
        let workers = 4;
        let queue = Arc::new(PendingQueue::new(5000).unwrap());
        for n in 0..total {
            queue.add(n).unwrap();
        }
        let cursor = Arc::new(queue.cursor().unwrap());

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let cursor = Arc::clone(&cursor);
                thread::spawn(move || {
                    let mut received = Vec::new();
                    while let Ok(Some(item)) = cursor.next_timeout(Duration::from_millis(50)) {
                        received.push(item);
                    }
                    received
                })
            })
            .collect();

        let mut union = HashSet::new();
        let mut delivered = 0;
        for handle in handles {
            let received = handle.join().unwrap();
            assert!(
                received.windows(2).all(|pair| pair[0] < pair[1]),
                "each worker sees an increasing subsequence"
            );
            delivered += received.len();
            union.extend(received);
        }

        assert_eq!(delivered, total as usize);
        assert_eq!(union, (0..total).collect::<HashSet<_>>());
    }

    #[test]
    fn test_concurrent_producers_and_shared_cursor() {
        let producers = 4u32;
        let per_producer = 500u32;
        let queue = Arc::new(PendingQueue::new(64).unwrap());
        let cursor = Arc::new(queue.cursor().unwrap());

        let producer_handles: Vec<_> = (0..producers)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for n in 0..per_producer {
                        let item = p * per_producer + n;
                        // Keep room by purging what the cursor has already passed
                        while !queue.try_insert(item, Duration::from_millis(5)).unwrap() {
                            queue.purge(|_| true).unwrap();
                        }
                    }
                })
            })
            .collect();

        let reader = {
            let cursor = Arc::clone(&cursor);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Ok(Some(item)) = cursor.next_timeout(Duration::from_millis(200)) {
                    seen.push(item);
                }
                seen
            })
        };

        for handle in producer_handles {
            handle.join().unwrap();
        }
        let seen = reader.join().unwrap();

        assert_eq!(seen.len(), (producers * per_producer) as usize);
        let unique: HashSet<_> = seen.iter().copied().collect();
        assert_eq!(unique.len(), seen.len());
    }

    #[test]
    fn test_blocking_take_receives_later_insert() {
        let queue = Arc::new(PendingQueue::new(4).unwrap());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take())
        };

        thread::sleep(Duration::from_millis(20));
        queue.put(5u32).unwrap();

        assert_eq!(consumer.join().unwrap(), Ok(5));
    }

    #[test]
    fn test_close_releases_blocked_producer_and_consumer() {
        let full = Arc::new(PendingQueue::new(1).unwrap());
        full.add(1u32).unwrap();
        let empty = Arc::new(PendingQueue::<u32>::new(1).unwrap());

        let producer = {
            let full = Arc::clone(&full);
            thread::spawn(move || full.try_insert(2, Duration::from_secs(30)))
        };
        let consumer = {
            let empty = Arc::clone(&empty);
            thread::spawn(move || empty.take())
        };

        thread::sleep(Duration::from_millis(20));
        full.close();
        empty.close();

        assert_eq!(producer.join().unwrap(), Err(QueueError::Closed));
        assert_eq!(consumer.join().unwrap(), Err(QueueError::Closed));
        // Nothing partial was inserted
        assert_eq!(full.to_vec().unwrap(), vec![1]);
    }
}
