// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{
    pair, Disposable, Observable, Observer, RillError, SerialDisposable, SerializedObserver,
    SubscriptionSlot,
};
use rill_scheduler::{Scheduler, Worker};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing the `debounce` operator.
pub trait DebounceExt<T> {
    /// Emits a value only after `quiet` elapsed with no successor.
    ///
    /// Trailing semantics: every arrival replaces the pending value and
    /// restarts the timer; completion flushes the pending value first;
    /// an error discards it.
    fn debounce(self, quiet: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> DebounceExt<T> for Observable<T> {
    fn debounce(self, quiet: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |downstream| {
            let state = Arc::new(DebounceState {
                downstream: Arc::new(SerializedObserver::new(downstream.clone())),
                quiet,
                worker: scheduler.create_worker(),
                generation: AtomicU64::new(0),
                pending: Mutex::new(None),
                timer: SerialDisposable::new(),
                upstream: SubscriptionSlot::new(),
            });
            downstream.on_subscribe(pair(
                Arc::new(DebounceHandle(state.clone())),
                state.worker.clone(),
            ));
            source.subscribe_observer(Arc::new(DebounceObserver { state }));
        })
    }
}

struct DebounceState<T> {
    downstream: Arc<SerializedObserver<T>>,
    quiet: Duration,
    worker: Arc<dyn rill_scheduler::Worker>,
    generation: AtomicU64,
    pending: Mutex<Option<(u64, T)>>,
    timer: SerialDisposable,
    upstream: SubscriptionSlot,
}

struct DebounceHandle<T>(Arc<DebounceState<T>>);

impl<T: Send + 'static> Disposable for DebounceHandle<T> {
    fn dispose(&self) {
        self.0.upstream.dispose();
        self.0.timer.dispose();
        self.0.pending.lock().take();
    }

    fn is_disposed(&self) -> bool {
        self.0.upstream.is_disposed()
    }
}

struct DebounceObserver<T> {
    state: Arc<DebounceState<T>>,
}

impl<T: Send + 'static> Observer<T> for DebounceObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        let state = &self.state;
        let generation = state.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *state.pending.lock() = Some((generation, value));
        let fire_state = Arc::clone(state);
        state.timer.set(state.worker.schedule_after(
            state.quiet,
            Box::new(move || {
                let due = {
                    let mut pending = fire_state.pending.lock();
                    match pending.take() {
                        Some((held, value)) if held == generation => Some(value),
                        other => {
                            *pending = other;
                            None
                        }
                    }
                };
                if let Some(value) = due {
                    fire_state.downstream.on_next(value);
                }
            }),
        ));
    }

    fn on_error(&self, error: RillError) {
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        self.state.timer.dispose();
        self.state.pending.lock().take();
        self.state.downstream.on_error(error);
        self.state.worker.dispose();
    }

    fn on_complete(&self) {
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        self.state.timer.dispose();
        let last = self.state.pending.lock().take();
        if let Some((_, value)) = last {
            self.state.downstream.on_next(value);
        }
        self.state.downstream.on_complete();
        self.state.worker.dispose();
    }
}
