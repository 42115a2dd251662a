// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::event_loop::EventLoop;
use crate::loop_worker::LoopWorker;
use crate::scheduler::{monotonic_now, Scheduler, Worker};
use std::sync::Arc;
use std::time::Duration;

/// One shared background thread for all workers.
///
/// Per-worker serialization holds trivially (everything runs on the one
/// thread); disposing a worker cancels only its own tasks.
pub struct SingleScheduler {
    event_loop: Arc<EventLoop>,
}

impl Default for SingleScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleScheduler {
    pub fn new() -> Self {
        Self {
            event_loop: EventLoop::spawn("single"),
        }
    }
}

impl Scheduler for SingleScheduler {
    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(LoopWorker::shared(Arc::clone(&self.event_loop)))
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}
