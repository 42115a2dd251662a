// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{pair, Disposable, FlagDisposable, Observable};
use rill_scheduler::{PeriodicWorker, Scheduler, Schedulers, Worker};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Emits an ascending counter every `period` on the computation
/// scheduler, starting one period after subscription.
pub fn interval(period: Duration) -> Observable<u64> {
    interval_on(period, Schedulers::computation())
}

/// [`interval`] on an explicit scheduler.
pub fn interval_on(period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<u64> {
    interval_from(period, period, scheduler)
}

/// Emits an ascending counter, first after `initial`, then every
/// `period`.
pub fn interval_from(
    initial: Duration,
    period: Duration,
    scheduler: Arc<dyn Scheduler>,
) -> Observable<u64> {
    Observable::new(move |downstream| {
        let worker = scheduler.create_worker();
        // Disposing the worker cancels the whole periodic chain
        downstream.on_subscribe(worker.clone());
        let counter = Arc::new(AtomicU64::new(0));
        let emitting = downstream.clone();
        worker.schedule_periodic(initial, period, move || {
            let tick = counter.fetch_add(1, Ordering::AcqRel);
            emitting.on_next(tick);
        });
    })
}

/// Emits a single `0` after `delay`, then completes, on the computation
/// scheduler.
pub fn timer(delay: Duration) -> Observable<u64> {
    timer_on(delay, Schedulers::computation())
}

/// [`timer`] on an explicit scheduler.
pub fn timer_on(delay: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<u64> {
    Observable::new(move |downstream| {
        let worker = scheduler.create_worker();
        let cancelled = Arc::new(FlagDisposable::new());
        downstream.on_subscribe(pair(cancelled.clone(), worker.clone()));
        let emitting = downstream.clone();
        let fired_worker = worker.clone();
        worker.schedule_after(
            delay,
            Box::new(move || {
                if !cancelled.is_disposed() {
                    emitting.on_next(0);
                    emitting.on_complete();
                }
                fired_worker.dispose();
            }),
        );
    })
}
