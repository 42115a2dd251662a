// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The timed event loop backing the thread-based schedulers.
//!
//! One OS thread drains a delay queue ordered by due time, then by
//! submission sequence for equal times. Cancellation is cooperative: a
//! cancelled entry stays queued but is skipped when it comes due.

use crate::scheduler::Task;
use parking_lot::{Condvar, Mutex};
use rill_core::Disposable;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation flag for one queued task.
#[derive(Default)]
pub(crate) struct TaskHandle {
    cancelled: AtomicBool,
}

impl TaskHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl Disposable for TaskHandle {
    fn dispose(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

struct Entry {
    due: Instant,
    seq: u64,
    handle: Arc<TaskHandle>,
    task: Task,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Inverted so the BinaryHeap pops the earliest entry first
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

struct TimerQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    shutdown: bool,
}

struct LoopShared {
    queue: Mutex<TimerQueue>,
    available: Condvar,
}

/// One scheduler thread with its delay queue.
pub(crate) struct EventLoop {
    shared: Arc<LoopShared>,
}

impl EventLoop {
    pub(crate) fn spawn(name: &str) -> Arc<Self> {
        let shared = Arc::new(LoopShared {
            queue: Mutex::new(TimerQueue {
                heap: BinaryHeap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            available: Condvar::new(),
        });
        let thread_shared = Arc::clone(&shared);
        let thread_name = format!("rill-{name}");
        tracing::trace!(thread = %thread_name, "spawning scheduler thread");
        std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || run(&thread_shared))
            .expect("failed to spawn scheduler thread");
        Arc::new(Self { shared })
    }

    /// Queues `task` to run after `delay` under the given handle.
    pub(crate) fn submit(&self, delay: Duration, handle: Arc<TaskHandle>, task: Task) {
        let mut queue = self.shared.queue.lock();
        if queue.shutdown {
            handle.dispose();
            return;
        }
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.heap.push(Entry {
            due: Instant::now() + delay,
            seq,
            handle,
            task,
        });
        drop(queue);
        self.shared.available.notify_one();
    }

    /// Stops the loop thread; pending tasks are discarded.
    pub(crate) fn shutdown(&self) {
        let mut queue = self.shared.queue.lock();
        queue.shutdown = true;
        queue.heap.clear();
        drop(queue);
        self.shared.available.notify_all();
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: &Arc<LoopShared>) {
    let mut queue = shared.queue.lock();
    loop {
        if queue.shutdown {
            return;
        }
        let due = match queue.heap.peek() {
            None => {
                shared.available.wait(&mut queue);
                continue;
            }
            Some(entry) => entry.due,
        };
        let now = Instant::now();
        if due > now {
            shared.available.wait_until(&mut queue, due);
            continue;
        }
        if let Some(entry) = queue.heap.pop() {
            drop(queue);
            if !entry.handle.is_disposed() {
                (entry.task)();
                entry.handle.dispose();
            }
            queue = shared.queue.lock();
        }
    }
}
