// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::event_loop::{EventLoop, TaskHandle};
use crate::scheduler::{monotonic_now, Scheduler, Task, Worker};
use parking_lot::Mutex;
use rill_core::{disposed, Disposable, DrainGate, FlagDisposable};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A sink for plain run-now tasks, typically a user's thread pool.
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

impl<F> Executor for F
where
    F: Fn(Task) + Send + Sync,
{
    fn execute(&self, task: Task) {
        self(task);
    }
}

/// Adapts an arbitrary [`Executor`] into a scheduler.
///
/// The executor promises nothing about ordering, so each worker
/// serializes through its own work queue: whoever transitions the queue
/// from empty submits one drain job to the executor. Delays run through
/// a shared helper loop that re-enqueues the task when it comes due.
pub struct ExecutorScheduler {
    executor: Arc<dyn Executor>,
    timer: Arc<EventLoop>,
}

impl ExecutorScheduler {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            timer: EventLoop::spawn("executor-timer"),
        }
    }
}

impl Scheduler for ExecutorScheduler {
    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(ExecutorWorker {
            state: Arc::new(ExecutorWorkerState {
                executor: Arc::clone(&self.executor),
                queue: Mutex::new(VecDeque::new()),
                gate: DrainGate::new(),
                disposed: AtomicBool::new(false),
            }),
            timer: Arc::clone(&self.timer),
        })
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}

struct ExecutorWorkerState {
    executor: Arc<dyn Executor>,
    queue: Mutex<VecDeque<(Arc<FlagDisposable>, Task)>>,
    gate: DrainGate,
    disposed: AtomicBool,
}

struct ExecutorWorker {
    state: Arc<ExecutorWorkerState>,
    timer: Arc<EventLoop>,
}

fn enqueue(state: &Arc<ExecutorWorkerState>, cancelled: Arc<FlagDisposable>, task: Task) {
    if state.disposed.load(Ordering::Acquire) {
        return;
    }
    state.queue.lock().push_back((cancelled, task));
    if state.gate.enter() {
        let drain_state = Arc::clone(state);
        state.executor.execute(Box::new(move || drain(&drain_state)));
    }
}

fn drain(state: &Arc<ExecutorWorkerState>) {
    let mut missed = 1;
    loop {
        loop {
            let next = state.queue.lock().pop_front();
            match next {
                Some((cancelled, task)) => {
                    if !cancelled.is_disposed() && !state.disposed.load(Ordering::Acquire) {
                        task();
                    }
                }
                None => break,
            }
        }
        missed = state.gate.leave(missed);
        if missed == 0 {
            return;
        }
    }
}

impl Worker for ExecutorWorker {
    fn schedule_after(&self, delay: Duration, task: Task) -> Arc<dyn Disposable> {
        if self.state.disposed.load(Ordering::Acquire) {
            return disposed();
        }
        let cancelled = Arc::new(FlagDisposable::new());
        if delay.is_zero() {
            enqueue(&self.state, cancelled.clone(), task);
        } else {
            let state = Arc::clone(&self.state);
            let queued = cancelled.clone();
            self.timer.submit(
                delay,
                Arc::new(TaskHandle::new()),
                Box::new(move || {
                    if !queued.is_disposed() {
                        enqueue(&state, queued.clone(), task);
                    }
                }),
            );
        }
        cancelled
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}

impl Disposable for ExecutorWorker {
    fn dispose(&self) {
        if self.state.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.queue.lock().clear();
    }

    fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Acquire)
    }
}
