// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::scheduler::{monotonic_now, Scheduler, Task, Worker};
use rill_core::{disposed, Disposable, FlagDisposable};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Runs tasks on the calling thread through an outer drain queue.
///
/// A task scheduled while another is running is queued and executed
/// when the running one returns, which turns unbounded recursion into
/// iteration. Delays sleep the caller before enqueueing.
#[derive(Default)]
pub struct TrampolineScheduler;

impl TrampolineScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for TrampolineScheduler {
    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(TrampolineWorker {
            disposed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}

struct QueuedTask {
    cancelled: Arc<FlagDisposable>,
    worker_disposed: Arc<AtomicBool>,
    task: Task,
}

thread_local! {
    static QUEUE: RefCell<VecDeque<QueuedTask>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

struct TrampolineWorker {
    disposed: Arc<AtomicBool>,
}

impl Worker for TrampolineWorker {
    fn schedule_after(&self, delay: Duration, task: Task) -> Arc<dyn Disposable> {
        if self.disposed.load(Ordering::Acquire) {
            return disposed();
        }
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let cancelled = Arc::new(FlagDisposable::new());
        QUEUE.with(|queue| {
            queue.borrow_mut().push_back(QueuedTask {
                cancelled: cancelled.clone(),
                worker_disposed: Arc::clone(&self.disposed),
                task,
            });
        });
        let already_draining = DRAINING.with(|draining| draining.replace(true));
        if !already_draining {
            loop {
                let next = QUEUE.with(|queue| queue.borrow_mut().pop_front());
                match next {
                    Some(queued) => {
                        if !queued.cancelled.is_disposed()
                            && !queued.worker_disposed.load(Ordering::Acquire)
                        {
                            (queued.task)();
                        }
                    }
                    None => break,
                }
            }
            DRAINING.with(|draining| draining.set(false));
        }
        cancelled
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}

impl Disposable for TrampolineWorker {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
