// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::event_loop::{EventLoop, TaskHandle};
use crate::scheduler::{monotonic_now, Task, Worker};
use parking_lot::Mutex;
use rill_core::{disposed, CompositeDisposable, Disposable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

type ReleaseFn = Box<dyn FnOnce(Arc<EventLoop>) + Send>;

/// A worker bound to one event loop.
///
/// Serialization comes from the loop thread itself; the worker's job is
/// to track its own tasks so disposing it cancels exactly those, and to
/// release the loop according to the owning scheduler's policy
/// (keep it shared, shut it down, or recycle it into a pool).
pub(crate) struct LoopWorker {
    event_loop: Arc<EventLoop>,
    tracked: Arc<CompositeDisposable>,
    disposed: AtomicBool,
    on_release: Mutex<Option<ReleaseFn>>,
}

impl LoopWorker {
    pub(crate) fn shared(event_loop: Arc<EventLoop>) -> Self {
        Self::with_release(event_loop, None)
    }

    pub(crate) fn owning(event_loop: Arc<EventLoop>) -> Self {
        Self::with_release(event_loop, Some(Box::new(|l: Arc<EventLoop>| l.shutdown())))
    }

    pub(crate) fn recycled(
        event_loop: Arc<EventLoop>,
        release: impl FnOnce(Arc<EventLoop>) + Send + 'static,
    ) -> Self {
        Self::with_release(event_loop, Some(Box::new(release)))
    }

    fn with_release(event_loop: Arc<EventLoop>, on_release: Option<ReleaseFn>) -> Self {
        Self {
            event_loop,
            tracked: Arc::new(CompositeDisposable::new()),
            disposed: AtomicBool::new(false),
            on_release: Mutex::new(on_release),
        }
    }
}

impl Worker for LoopWorker {
    fn schedule_after(&self, delay: Duration, task: Task) -> Arc<dyn Disposable> {
        if self.disposed.load(Ordering::Acquire) {
            return disposed();
        }
        let handle = Arc::new(TaskHandle::new());
        let handle_dyn: Arc<dyn Disposable> = handle.clone();
        if !self.tracked.add(handle_dyn.clone()) {
            return disposed();
        }
        let tracked = Arc::clone(&self.tracked);
        let untrack = handle_dyn.clone();
        self.event_loop.submit(
            delay,
            handle,
            Box::new(move || {
                task();
                tracked.delete(&untrack);
            }),
        );
        handle_dyn
    }

    fn now(&self) -> Duration {
        monotonic_now()
    }
}

impl Disposable for LoopWorker {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.tracked.dispose();
        let release = self.on_release.lock().take();
        if let Some(release) = release {
            release(Arc::clone(&self.event_loop));
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
