// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::event_loop::EventLoop;
use crate::loop_worker::LoopWorker;
use crate::scheduler::{monotonic_now, Scheduler, Worker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One dedicated thread per worker.
///
/// Disposing the worker shuts its thread down.
#[derive(Default)]
pub struct NewThreadScheduler {
    counter: AtomicUsize,
}

impl NewThreadScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for NewThreadScheduler {
    fn create_worker(&self) -> Arc<dyn Worker> {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        let event_loop = EventLoop::spawn(&format!("thread-{id}"));
        Arc::new(LoopWorker::owning(event_loop))
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}
