// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{
    pair, Disposable, Observable, Observer, RillError, SerialDisposable, SerializedObserver,
};
use rill_scheduler::{Scheduler, Worker};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Terminal sentinel for the arrival counter
const FINISHED: u64 = u64::MAX;

/// Extension trait providing per-item deadlines.
pub trait TimeoutExt<T> {
    /// Fails with a timeout error when the next value (including the
    /// first) does not arrive within `each`.
    fn timeout(self, each: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T>;

    /// Switches to `fallback` instead of failing when a deadline
    /// expires.
    fn timeout_with_fallback(
        self,
        each: Duration,
        scheduler: Arc<dyn Scheduler>,
        fallback: Observable<T>,
    ) -> Observable<T>;

    /// A distinct deadline for the first value, then `each` per
    /// successor.
    fn timeout_first(
        self,
        first: Duration,
        each: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> Observable<T>;
}

impl<T: Send + 'static> TimeoutExt<T> for Observable<T> {
    fn timeout(self, each: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        timeout_impl(self, each, each, scheduler, None)
    }

    fn timeout_with_fallback(
        self,
        each: Duration,
        scheduler: Arc<dyn Scheduler>,
        fallback: Observable<T>,
    ) -> Observable<T> {
        timeout_impl(self, each, each, scheduler, Some(fallback))
    }

    fn timeout_first(
        self,
        first: Duration,
        each: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> Observable<T> {
        timeout_impl(self, first, each, scheduler, None)
    }
}

fn timeout_impl<T: Send + 'static>(
    source: Observable<T>,
    first: Duration,
    each: Duration,
    scheduler: Arc<dyn Scheduler>,
    fallback: Option<Observable<T>>,
) -> Observable<T> {
    let fallback = Arc::new(fallback);
    Observable::new(move |downstream| {
        let state = Arc::new(TimeoutState {
            downstream: Arc::new(SerializedObserver::new(downstream.clone())),
            each,
            worker: scheduler.create_worker(),
            arrivals: AtomicU64::new(0),
            timer: SerialDisposable::new(),
            upstream: Arc::new(SerialDisposable::new()),
            fallback: Arc::clone(&fallback),
        });
        downstream.on_subscribe(pair(state.upstream.clone(), state.worker.clone()));
        arm(&state, 0, first);
        source.subscribe_observer(Arc::new(TimeoutObserver {
            state,
        }));
    })
}

struct TimeoutState<T> {
    downstream: Arc<SerializedObserver<T>>,
    each: Duration,
    worker: Arc<dyn rill_scheduler::Worker>,
    // Number of values seen; FINISHED once terminated or timed out
    arrivals: AtomicU64,
    timer: SerialDisposable,
    upstream: Arc<SerialDisposable>,
    fallback: Arc<Option<Observable<T>>>,
}

fn arm<T: Send + 'static>(state: &Arc<TimeoutState<T>>, expected: u64, deadline: Duration) {
    let fire_state = Arc::clone(state);
    state.timer.set(state.worker.schedule_after(
        deadline,
        Box::new(move || {
            if fire_state
                .arrivals
                .compare_exchange(expected, FINISHED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            fire_state.upstream.dispose();
            match fire_state.fallback.as_ref() {
                Some(fallback) => {
                    fallback.subscribe_observer(Arc::new(FallbackObserver {
                        state: Arc::clone(&fire_state),
                    }));
                }
                None => {
                    fire_state.downstream.on_error(RillError::timeout_error(
                        format!("no value within {:?}", fire_state.each),
                    ));
                    fire_state.worker.dispose();
                }
            }
        }),
    ));
}

struct TimeoutObserver<T> {
    state: Arc<TimeoutState<T>>,
}

impl<T: Send + 'static> Observer<T> for TimeoutObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.upstream.set(disposable);
    }

    fn on_next(&self, value: T) {
        let state = &self.state;
        loop {
            let seen = state.arrivals.load(Ordering::Acquire);
            if seen == FINISHED {
                return;
            }
            if state
                .arrivals
                .compare_exchange(seen, seen + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                state.downstream.on_next(value);
                arm(state, seen + 1, state.each);
                return;
            }
        }
    }

    fn on_error(&self, error: RillError) {
        if self.state.arrivals.swap(FINISHED, Ordering::AcqRel) == FINISHED {
            rill_core::hooks::undeliverable(error);
            return;
        }
        self.state.timer.dispose();
        self.state.downstream.on_error(error);
        self.state.worker.dispose();
    }

    fn on_complete(&self) {
        if self.state.arrivals.swap(FINISHED, Ordering::AcqRel) == FINISHED {
            return;
        }
        self.state.timer.dispose();
        self.state.downstream.on_complete();
        self.state.worker.dispose();
    }
}

// After the switch the deadline discipline no longer applies; the
// fallback just forwards.
struct FallbackObserver<T> {
    state: Arc<TimeoutState<T>>,
}

impl<T: Send + 'static> Observer<T> for FallbackObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.upstream.set(disposable);
    }

    fn on_next(&self, value: T) {
        self.state.downstream.on_next(value);
    }

    fn on_error(&self, error: RillError) {
        self.state.downstream.on_error(error);
        self.state.worker.dispose();
    }

    fn on_complete(&self) {
        self.state.downstream.on_complete();
        self.state.worker.dispose();
    }
}
