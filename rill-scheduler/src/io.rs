// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::event_loop::EventLoop;
use crate::loop_worker::LoopWorker;
use crate::scheduler::{monotonic_now, Scheduler, Worker};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// An elastic pool of cached event loops.
///
/// Acquiring a worker reuses an idle loop when one is available and
/// spawns a fresh thread otherwise; disposing the worker returns its
/// loop to the cache with a keep-alive. Expired idle loops are pruned
/// lazily on the next acquire.
pub struct IoScheduler {
    pool: Arc<IoPool>,
}

struct IoPool {
    idle: Mutex<Vec<IdleLoop>>,
    keep_alive: Duration,
    counter: AtomicUsize,
}

struct IdleLoop {
    expires_at: Instant,
    event_loop: Arc<EventLoop>,
}

impl Default for IoScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl IoScheduler {
    pub fn new() -> Self {
        Self::with_keep_alive(DEFAULT_KEEP_ALIVE)
    }

    pub fn with_keep_alive(keep_alive: Duration) -> Self {
        Self {
            pool: Arc::new(IoPool {
                idle: Mutex::new(Vec::new()),
                keep_alive,
                counter: AtomicUsize::new(0),
            }),
        }
    }
}

impl IoPool {
    fn acquire(self: &Arc<Self>) -> Arc<EventLoop> {
        let mut idle = self.idle.lock();
        let now = Instant::now();
        idle.retain(|cached| {
            if cached.expires_at > now {
                true
            } else {
                cached.event_loop.shutdown();
                false
            }
        });
        if let Some(cached) = idle.pop() {
            return cached.event_loop;
        }
        drop(idle);
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        EventLoop::spawn(&format!("io-{id}"))
    }

    fn release(&self, event_loop: Arc<EventLoop>) {
        self.idle.lock().push(IdleLoop {
            expires_at: Instant::now() + self.keep_alive,
            event_loop,
        });
    }
}

impl Scheduler for IoScheduler {
    fn create_worker(&self) -> Arc<dyn Worker> {
        let event_loop = self.pool.acquire();
        let pool = Arc::clone(&self.pool);
        Arc::new(LoopWorker::recycled(event_loop, move |released| {
            pool.release(released);
        }))
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}
