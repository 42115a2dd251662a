// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{Disposable, Observable, Observer, RillError};
use rill_scheduler::Scheduler;
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing `throttle_first`.
pub trait ThrottleExt<T> {
    /// Emits the first value of each `window`, suppressing the rest.
    /// The window is measured on the scheduler's monotonic clock.
    fn throttle_first(self, window: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> ThrottleExt<T> for Observable<T> {
    fn throttle_first(self, window: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let scheduler = scheduler.clone();
        self.lift(move |downstream| {
            Arc::new(ThrottleFirstObserver {
                downstream,
                scheduler: scheduler.clone(),
                window,
                open_at: Mutex::new(None),
            })
        })
    }
}

struct ThrottleFirstObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    scheduler: Arc<dyn Scheduler>,
    window: Duration,
    open_at: Mutex<Option<Duration>>,
}

impl<T: Send> Observer<T> for ThrottleFirstObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_next(&self, value: T) {
        let now = self.scheduler.now();
        let pass = {
            let mut open_at = self.open_at.lock();
            if open_at.is_none_or(|at| now >= at) {
                *open_at = Some(now + self.window);
                true
            } else {
                false
            }
        };
        if pass {
            self.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RillError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}
