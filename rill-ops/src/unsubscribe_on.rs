// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{Disposable, Observable, Observer, RillError};
use rill_scheduler::Scheduler;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `unsubscribe_on` operator.
pub trait UnsubscribeOnExt<T> {
    /// Moves upstream disposal onto a worker of `scheduler`; everything
    /// else is forwarded untouched.
    fn unsubscribe_on(self, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> UnsubscribeOnExt<T> for Observable<T> {
    fn unsubscribe_on(self, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let scheduler = scheduler.clone();
        self.lift(move |downstream| {
            Arc::new(UnsubscribeOnObserver {
                downstream,
                scheduler: scheduler.clone(),
            })
        })
    }
}

struct UnsubscribeOnObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    scheduler: Arc<dyn Scheduler>,
}

impl<T: Send> Observer<T> for UnsubscribeOnObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.downstream.on_subscribe(Arc::new(ScheduledDisposable {
            upstream: disposable,
            scheduler: self.scheduler.clone(),
            disposed: AtomicBool::new(false),
        }));
    }

    fn on_next(&self, value: T) {
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: RillError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

struct ScheduledDisposable {
    upstream: Arc<dyn Disposable>,
    scheduler: Arc<dyn Scheduler>,
    disposed: AtomicBool,
}

impl Disposable for ScheduledDisposable {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let upstream = self.upstream.clone();
        self.scheduler
            .schedule_direct(Box::new(move || upstream.dispose()));
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
