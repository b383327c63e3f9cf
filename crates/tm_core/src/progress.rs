//! Bounded progress-reporting channel for bulk match generation.
//!
//! A producer (the generation loop) publishes 0..=100 percentages, a
//! consumer (typically a progress bar) blocks until the next value.
//! `reset` and `step` are mutually exclusive through the inner mutex, so
//! the queue can be re-armed for the next bulk operation while a consumer
//! is still attached. Cancellation is an explicit flag: producers check
//! it between generation steps and abort their batch.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

#[derive(Debug)]
struct ProgressInner {
    queue: VecDeque<i32>,
    counter: u32,
    max_steps: u32,
    cancelled: bool,
}

#[derive(Debug)]
pub struct ProgressQueue {
    inner: Mutex<ProgressInner>,
    not_empty: Condvar,
}

impl ProgressQueue {
    /// Panics if `max_steps` is zero; a progress range needs at least one
    /// step.
    pub fn new(max_steps: u32) -> Self {
        assert!(max_steps > 0, "max_steps must be positive");
        ProgressQueue {
            inner: Mutex::new(ProgressInner {
                queue: VecDeque::new(),
                counter: 0,
                max_steps,
                cancelled: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Re-arms the queue for a new operation: clears buffered values,
    /// resets the counter and sets a new step total. Safe to call while
    /// a producer is active; it serializes against `step`.
    pub fn reset(&self, max_steps: u32) {
        assert!(max_steps > 0, "max_steps must be positive");
        let mut inner = self.inner.lock().expect("progress queue poisoned");
        inner.queue.clear();
        inner.counter = 0;
        inner.max_steps = max_steps;
        inner.cancelled = false;
    }

    /// Advances the counter by `num_steps` (clamped to the total), maps
    /// it to 0..=100 and publishes the value to one waiting consumer.
    pub fn step(&self, num_steps: u32) {
        if num_steps == 0 {
            return;
        }
        let mut inner = self.inner.lock().expect("progress queue poisoned");
        inner.counter = (inner.counter + num_steps).min(inner.max_steps);
        let percent = (inner.counter as f64 * 100.0 / inner.max_steps as f64) as i32;
        inner.queue.push_back(percent);
        drop(inner);
        self.not_empty.notify_one();
    }

    /// Blocks until a value is available or the queue is cancelled;
    /// `None` signals cancellation.
    pub fn recv(&self) -> Option<i32> {
        let mut inner = self.inner.lock().expect("progress queue poisoned");
        loop {
            if let Some(v) = inner.queue.pop_front() {
                return Some(v);
            }
            if inner.cancelled {
                return None;
            }
            inner = self
                .not_empty
                .wait(inner)
                .expect("progress queue poisoned");
        }
    }

    pub fn try_recv(&self) -> Option<i32> {
        self.inner
            .lock()
            .expect("progress queue poisoned")
            .queue
            .pop_front()
    }

    /// Requests the producer to stop and wakes all blocked consumers.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().expect("progress queue poisoned");
        inner.cancelled = true;
        drop(inner);
        self.not_empty.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner
            .lock()
            .expect("progress queue poisoned")
            .cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_scaling_and_clamping() {
        let q = ProgressQueue::new(100);
        q.reset(100);
        q.step(50);
        q.step(60); // counter clamps at 100

        assert_eq!(q.try_recv(), Some(50));
        assert_eq!(q.try_recv(), Some(100));
        assert_eq!(q.try_recv(), None);

        // further steps stay pinned at 100
        q.step(1);
        assert_eq!(q.try_recv(), Some(100));
    }

    #[test]
    fn test_zero_steps_publish_nothing() {
        let q = ProgressQueue::new(10);
        q.step(0);
        assert_eq!(q.try_recv(), None);
    }

    #[test]
    fn test_reset_clears_buffered_values() {
        let q = ProgressQueue::new(4);
        q.step(1);
        q.step(1);
        q.reset(8);
        assert_eq!(q.try_recv(), None);
        q.step(2);
        assert_eq!(q.try_recv(), Some(25));
    }

    #[test]
    fn test_concurrent_producers_lose_no_update() {
        let q = Arc::new(ProgressQueue::new(400));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let q = Arc::clone(&q);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    q.step(1);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut count = 0;
        let mut last = 0;
        while let Some(v) = q.try_recv() {
            count += 1;
            last = v;
        }
        // one published value per step, final value exactly 100
        assert_eq!(count, 400);
        assert_eq!(last, 100);
    }

    #[test]
    fn test_recv_blocks_until_step() {
        let q = Arc::new(ProgressQueue::new(2));
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.recv())
        };
        q.step(1);
        assert_eq!(consumer.join().unwrap(), Some(50));
    }

    #[test]
    fn test_cancel_wakes_blocked_consumer() {
        let q = Arc::new(ProgressQueue::new(2));
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.recv())
        };
        q.cancel();
        assert_eq!(consumer.join().unwrap(), None);
        assert!(q.is_cancelled());

        // reset re-arms the queue after a cancellation
        q.reset(2);
        assert!(!q.is_cancelled());
    }
}
