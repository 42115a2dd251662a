// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{pair, Disposable, Observable, Observer, RillError, SerialDisposable};
use rill_scheduler::{Scheduler, Worker};
use std::sync::Arc;

/// Extension trait providing the `subscribe_on` operator.
pub trait SubscribeOnExt<T> {
    /// Performs the act of subscribing to the upstream on a worker of
    /// `scheduler` — exactly once. Emissions stay on whatever thread
    /// the upstream emits from; pair with `observe_on` to move those.
    fn subscribe_on(self, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> SubscribeOnExt<T> for Observable<T> {
    fn subscribe_on(self, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |downstream| {
            let upstream = Arc::new(SerialDisposable::new());
            let worker = scheduler.create_worker();
            downstream.on_subscribe(pair(upstream.clone(), worker.clone()));
            let task_source = source.clone();
            let task_observer: Arc<dyn Observer<T>> = Arc::new(SubscribeOnObserver {
                downstream,
                upstream,
            });
            let task_worker = worker.clone();
            worker.schedule(Box::new(move || {
                task_source.subscribe_observer(task_observer);
                // The worker's only job was this one subscribe call
                task_worker.dispose();
            }));
        })
    }
}

struct SubscribeOnObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    upstream: Arc<SerialDisposable>,
}

impl<T: Send> Observer<T> for SubscribeOnObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        // The downstream already holds its handle; only wire the chain
        self.upstream.set(disposable);
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
