// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::scheduler::{monotonic_now, Scheduler, Task, Worker};
use rill_core::{disposed, Disposable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Runs tasks on the calling thread, recursively and immediately.
///
/// A delayed schedule sleeps the caller. Unsuitable for periodic work;
/// meant for tests and for operators that only need "some" scheduler.
#[derive(Default)]
pub struct ImmediateScheduler;

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for ImmediateScheduler {
    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(ImmediateWorker {
            disposed: AtomicBool::new(false),
        })
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}

struct ImmediateWorker {
    disposed: AtomicBool,
}

impl Worker for ImmediateWorker {
    fn schedule_after(&self, delay: Duration, task: Task) -> Arc<dyn Disposable> {
        if self.disposed.load(Ordering::Acquire) {
            return disposed();
        }
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.disposed.load(Ordering::Acquire) {
            return disposed();
        }
        task();
        disposed()
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}

impl Disposable for ImmediateWorker {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
