// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{disposed, Disposable, FlagDisposable};
use rill_scheduler::{Scheduler, Task, Worker};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A virtual-time scheduler for deterministic timing tests.
///
/// Nothing runs until the test advances the clock; `advance_by` /
/// `advance_to` execute every task due up to the target, on the calling
/// thread and in due-time order (submission order for equal times).
/// Tasks scheduled while advancing — periodic re-arms in particular —
/// participate in the same advance when they fall inside the target.
///
/// # Example
///
/// ```
/// use rill_scheduler::{Scheduler, Worker};
/// use rill_test_utils::TestScheduler;
/// use std::time::Duration;
///
/// let scheduler = TestScheduler::new();
/// let worker = scheduler.create_worker();
/// worker.schedule_after(Duration::from_millis(10), Box::new(|| println!("due")));
/// scheduler.advance_by(Duration::from_millis(10));
/// ```
pub struct TestScheduler {
    state: Arc<Mutex<VirtualState>>,
}

impl Clone for TestScheduler {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

struct VirtualState {
    now: Duration,
    queue: BinaryHeap<VirtualEntry>,
    next_seq: u64,
}

struct VirtualEntry {
    due: Duration,
    seq: u64,
    cancelled: Arc<FlagDisposable>,
    worker_disposed: Arc<AtomicBool>,
    task: Task,
}

impl PartialEq for VirtualEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for VirtualEntry {}

impl PartialOrd for VirtualEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualEntry {
    // Inverted for earliest-first popping
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

impl Default for TestScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TestScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(VirtualState {
                now: Duration::ZERO,
                queue: BinaryHeap::new(),
                next_seq: 0,
            })),
        }
    }

    /// The virtual clock reading.
    #[must_use]
    pub fn virtual_now(&self) -> Duration {
        self.state.lock().now
    }

    /// Advances the clock by `delta`, running everything due.
    pub fn advance_by(&self, delta: Duration) {
        let target = self.state.lock().now + delta;
        self.advance_to(target);
    }

    /// Advances the clock to `target`, running everything due.
    pub fn advance_to(&self, target: Duration) {
        loop {
            let entry = {
                let mut state = self.state.lock();
                match state.queue.peek() {
                    Some(entry) if entry.due <= target => {
                        let entry = state.queue.pop();
                        if let Some(entry) = &entry {
                            state.now = state.now.max(entry.due);
                        }
                        entry
                    }
                    _ => {
                        state.now = state.now.max(target);
                        return;
                    }
                }
            };
            if let Some(entry) = entry {
                if !entry.cancelled.is_disposed() && !entry.worker_disposed.load(Ordering::Acquire)
                {
                    (entry.task)();
                }
            }
        }
    }

    /// Runs tasks already due at the current clock without advancing.
    pub fn trigger_actions(&self) {
        let now = self.state.lock().now;
        self.advance_to(now);
    }
}

impl Scheduler for TestScheduler {
    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(TestWorker {
            state: Arc::clone(&self.state),
            disposed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn now(&self) -> Duration {
        self.state.lock().now
    }
}

struct TestWorker {
    state: Arc<Mutex<VirtualState>>,
    disposed: Arc<AtomicBool>,
}

impl Worker for TestWorker {
    fn schedule_after(&self, delay: Duration, task: Task) -> Arc<dyn Disposable> {
        if self.disposed.load(Ordering::Acquire) {
            return disposed();
        }
        let cancelled = Arc::new(FlagDisposable::new());
        let mut state = self.state.lock();
        let due = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(VirtualEntry {
            due,
            seq,
            cancelled: cancelled.clone(),
            worker_disposed: Arc::clone(&self.disposed),
            task,
        });
        cancelled
    }

    fn now(&self) -> Duration {
        self.state.lock().now
    }
}

impl Disposable for TestWorker {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
