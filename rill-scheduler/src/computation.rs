// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::event_loop::EventLoop;
use crate::loop_worker::LoopWorker;
use crate::scheduler::{monotonic_now, Scheduler, Worker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A fixed pool of event loops sized by the machine's parallelism.
///
/// Workers are pinned round-robin onto the loops; tasks of one worker
/// stay serialized on its loop while distinct workers run in parallel.
pub struct ComputationScheduler {
    loops: Vec<Arc<EventLoop>>,
    next: AtomicUsize,
}

impl Default for ComputationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputationScheduler {
    pub fn new() -> Self {
        let size = std::thread::available_parallelism().map_or(1, usize::from);
        Self::with_size(size)
    }

    pub fn with_size(size: usize) -> Self {
        let size = size.max(1);
        let loops = (0..size)
            .map(|i| EventLoop::spawn(&format!("computation-{i}")))
            .collect();
        Self {
            loops,
            next: AtomicUsize::new(0),
        }
    }
}

impl Scheduler for ComputationScheduler {
    fn create_worker(&self) -> Arc<dyn Worker> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.loops.len();
        Arc::new(LoopWorker::shared(Arc::clone(&self.loops[index])))
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}
