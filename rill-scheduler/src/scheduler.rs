// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{Disposable, SerialDisposable};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A sequential executor for scheduled tasks.
///
/// Tasks scheduled on one worker run in submission order for equal-time
/// schedules and never concurrently with each other. A worker is itself
/// a [`Disposable`]: disposing it cancels every task it scheduled.
pub trait Worker: Disposable {
    /// Runs the task as soon as possible.
    fn schedule(&self, task: Task) -> Arc<dyn Disposable> {
        self.schedule_after(Duration::ZERO, task)
    }

    /// Runs the task once, after at least `delay` of elapsed time.
    fn schedule_after(&self, delay: Duration, task: Task) -> Arc<dyn Disposable>;

    /// Monotonic time reading, in this worker's clock.
    fn now(&self) -> Duration;
}

/// A factory for [`Worker`]s.
///
/// Workers of one scheduler may run in parallel with each other; the
/// per-worker serialization guarantee is the only ordering a scheduler
/// promises.
pub trait Scheduler: Send + Sync {
    /// Creates a fresh worker.
    fn create_worker(&self) -> Arc<dyn Worker>;

    /// Monotonic time reading.
    fn now(&self) -> Duration;

    /// Runs a one-off task on a throwaway worker.
    fn schedule_direct(&self, task: Task) -> Arc<dyn Disposable> {
        self.schedule_direct_after(Duration::ZERO, task)
    }

    /// Runs a one-off task after a delay on a throwaway worker.
    fn schedule_direct_after(&self, delay: Duration, task: Task) -> Arc<dyn Disposable> {
        let worker = self.create_worker();
        let worker_after = worker.clone();
        worker.schedule_after(
            delay,
            Box::new(move || {
                task();
                worker_after.dispose();
            }),
        );
        worker
    }
}

/// Periodic scheduling over any worker.
///
/// Implemented as drift-corrected rescheduling: each round computes the
/// next absolute due time from the first one, so long-running ticks do
/// not accumulate lag.
pub trait PeriodicWorker {
    /// Runs `task` after `initial`, then every `period`, until the
    /// returned handle (or the worker) is disposed.
    fn schedule_periodic(
        &self,
        initial: Duration,
        period: Duration,
        task: impl FnMut() + Send + 'static,
    ) -> Arc<dyn Disposable>;
}

impl PeriodicWorker for Arc<dyn Worker> {
    fn schedule_periodic(
        &self,
        initial: Duration,
        period: Duration,
        task: impl FnMut() + Send + 'static,
    ) -> Arc<dyn Disposable> {
        let state = Arc::new(PeriodicState {
            worker: self.clone(),
            period,
            task: Mutex::new(Box::new(task)),
            handle: SerialDisposable::new(),
        });
        arm(&state, self.now() + initial);
        Arc::new(PeriodicHandle { state })
    }
}

struct PeriodicState {
    worker: Arc<dyn Worker>,
    period: Duration,
    task: Mutex<Box<dyn FnMut() + Send>>,
    handle: SerialDisposable,
}

// `due` is the ideal absolute time of this round; the next round aims
// at `due + period` regardless of how late this one ran.
fn arm(state: &Arc<PeriodicState>, due: Duration) {
    let delay = due.saturating_sub(state.worker.now());
    let next = Arc::clone(state);
    let scheduled = state.worker.schedule_after(
        delay,
        Box::new(move || {
            {
                let mut task = next.task.lock();
                (*task)();
            }
            let following = due + next.period;
            arm(&next, following);
        }),
    );
    // A disposed serial rejects the new round, ending the chain
    state.handle.set(scheduled);
}

struct PeriodicHandle {
    state: Arc<PeriodicState>,
}

impl Disposable for PeriodicHandle {
    fn dispose(&self) {
        self.state.handle.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.state.handle.is_disposed()
    }
}

/// Monotonic reading against the process-wide epoch.
///
/// The epoch is pinned lazily on first use; all built-in schedulers
/// share it so readings are comparable across workers.
pub(crate) fn monotonic_now() -> Duration {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed()
}
