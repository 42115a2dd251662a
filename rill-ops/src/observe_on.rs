// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{
    Disposable, DrainGate, Observable, Observer, RillError, SubscriptionSlot, Terminal,
};
use rill_scheduler::{Scheduler, Worker};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `observe_on` operator.
pub trait ObserveOnExt<T> {
    /// Re-delivers every notification on a worker of `scheduler`.
    ///
    /// Notifications are queued as they arrive and drained by a single
    /// scheduled job at a time, preserving upstream order; the terminal
    /// is flushed after all buffered values. Disposing the subscription
    /// disposes the worker and clears the queue.
    fn observe_on(self, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> ObserveOnExt<T> for Observable<T> {
    fn observe_on(self, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |downstream| {
            let state = Arc::new(ObserveOnState {
                downstream,
                worker: scheduler.create_worker(),
                queue: Mutex::new(VecDeque::new()),
                terminal: Mutex::new(None),
                gate: DrainGate::new(),
                cancelled: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
                upstream: SubscriptionSlot::new(),
            });
            state
                .downstream
                .on_subscribe(Arc::new(ObserveOnDisposable(state.clone())));
            source.subscribe_observer(Arc::new(ObserveOnObserver { state }));
        })
    }
}

struct ObserveOnState<T> {
    downstream: Arc<dyn Observer<T>>,
    worker: Arc<dyn Worker>,
    queue: Mutex<VecDeque<T>>,
    terminal: Mutex<Option<Terminal>>,
    gate: DrainGate,
    cancelled: AtomicBool,
    terminated: AtomicBool,
    upstream: SubscriptionSlot,
}

struct ObserveOnDisposable<T>(Arc<ObserveOnState<T>>);

impl<T: Send + 'static> Disposable for ObserveOnDisposable<T> {
    fn dispose(&self) {
        if self.0.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.0.upstream.dispose();
        self.0.worker.dispose();
        self.0.queue.lock().clear();
    }

    fn is_disposed(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }
}

struct ObserveOnObserver<T> {
    state: Arc<ObserveOnState<T>>,
}

impl<T: Send + 'static> Observer<T> for ObserveOnObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        if self.state.cancelled.load(Ordering::Acquire) {
            return;
        }
        self.state.queue.lock().push_back(value);
        schedule_drain(&self.state);
    }

    fn on_error(&self, error: RillError) {
        *self.state.terminal.lock() = Some(Terminal::Error(error));
        schedule_drain(&self.state);
    }

    fn on_complete(&self) {
        *self.state.terminal.lock() = Some(Terminal::Complete);
        schedule_drain(&self.state);
    }
}

fn schedule_drain<T: Send + 'static>(state: &Arc<ObserveOnState<T>>) {
    if state.gate.enter() {
        let task_state = Arc::clone(state);
        state.worker.schedule(Box::new(move || drain(&task_state)));
    }
}

fn drain<T: Send + 'static>(state: &Arc<ObserveOnState<T>>) {
    let mut missed = 1;
    loop {
        loop {
            if state.cancelled.load(Ordering::Acquire) {
                state.queue.lock().clear();
                break;
            }
            if state.terminated.load(Ordering::Acquire) {
                break;
            }
            let next = state.queue.lock().pop_front();
            match next {
                Some(value) => state.downstream.on_next(value),
                None => {
                    let terminal = state.terminal.lock().take();
                    if let Some(terminal) = terminal {
                        if !state.terminated.swap(true, Ordering::AcqRel) {
                            match terminal {
                                Terminal::Complete => state.downstream.on_complete(),
                                Terminal::Error(e) => state.downstream.on_error(e),
                            }
                            state.worker.dispose();
                        }
                    }
                    break;
                }
            }
        }
        missed = state.gate.leave(missed);
        if missed == 0 {
            return;
        }
    }
}
