use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mutex-protected FIFO shared between the control and render contexts.
///
/// Producers `push` from any thread. The render context calls `drain`, which
/// swaps the pending items out under the lock and hands them back, so the
/// batch executes without holding the lock and concurrent pushes simply land
/// in the next batch.
#[derive(Debug)]
pub struct CommandQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> Default for CommandQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CommandQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Takes every pending item, oldest first.
    pub fn drain(&self) -> VecDeque<T> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a VecDeque half-updated,
    // so a poisoned queue is still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn drain_is_fifo_and_clears() {
        let q = CommandQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.drain().into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(q.is_empty());
        assert!(q.drain().is_empty());
    }

    #[test]
    fn items_pushed_while_processing_land_in_next_batch() {
        let q = CommandQueue::new();
        q.push(1);
        q.push(2);
        let mut seen = Vec::new();
        for item in q.drain() {
            seen.push(item);
            q.push(item * 10);
        }
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(q.drain().into_iter().collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let q = Arc::new(CommandQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|t| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..250 {
                        q.push(t * 1000 + i);
                    }
                })
            })
            .collect();

        let mut total = 0;
        while total < 1000 {
            total += q.drain().len();
            thread::yield_now();
        }
        for p in producers {
            p.join().unwrap();
        }
        assert_eq!(total, 1000);
        assert!(q.is_empty());
    }

    #[test]
    fn per_producer_order_is_preserved() {
        let q = Arc::new(CommandQueue::new());
        let q2 = Arc::clone(&q);
        let producer = thread::spawn(move || {
            for i in 0..500 {
                q2.push(i);
            }
        });
        producer.join().unwrap();
        let all: Vec<_> = q.drain().into_iter().collect();
        assert_eq!(all, (0..500).collect::<Vec<_>>());
    }
}
