// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{
    pair, Disposable, Observable, Observer, RillError, SerializedObserver, SubscriptionSlot,
    UnicastSubject,
};
use rill_scheduler::{PeriodicWorker, Scheduler, Worker};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing time-based windowing.
pub trait WindowTimeExt<T> {
    /// Splits the stream into consecutive windows of `period` length.
    /// The first window opens at subscription; each tick completes the
    /// current window and opens the next.
    fn window_time(
        self,
        period: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> Observable<Observable<T>>;
}

impl<T: Send + 'static> WindowTimeExt<T> for Observable<T> {
    fn window_time(
        self,
        period: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> Observable<Observable<T>> {
        let source = self.clone();
        Observable::new(move |downstream| {
            let state = Arc::new(WindowTimeState {
                downstream: Arc::new(SerializedObserver::new(downstream.clone())),
                worker: scheduler.create_worker(),
                current: Mutex::new(Some(UnicastSubject::new())),
                upstream: SubscriptionSlot::new(),
            });
            downstream.on_subscribe(pair(
                Arc::new(WindowTimeHandle(state.clone())),
                state.worker.clone(),
            ));
            // Announce the initial window
            let opening = state.current.lock().clone();
            if let Some(window) = opening {
                state.downstream.on_next(window.observable());
            }
            let tick_state = Arc::clone(&state);
            state.worker.schedule_periodic(period, period, move || {
                let rotated = {
                    let mut current = tick_state.current.lock();
                    match current.as_mut() {
                        Some(window) => {
                            let fresh = UnicastSubject::new();
                            Some(std::mem::replace(window, fresh))
                        }
                        None => None,
                    }
                };
                if let Some(closed) = rotated {
                    closed.complete();
                    let opened = tick_state.current.lock().clone();
                    if let Some(window) = opened {
                        tick_state.downstream.on_next(window.observable());
                    }
                }
            });
            source.subscribe_observer(Arc::new(WindowTimeObserver { state }));
        })
    }
}

struct WindowTimeState<T> {
    downstream: Arc<SerializedObserver<Observable<T>>>,
    worker: Arc<dyn Worker>,
    // None once terminated or disposed
    current: Mutex<Option<UnicastSubject<T>>>,
    upstream: SubscriptionSlot,
}

struct WindowTimeHandle<T>(Arc<WindowTimeState<T>>);

impl<T: Send + 'static> Disposable for WindowTimeHandle<T> {
    fn dispose(&self) {
        self.0.upstream.dispose();
        let window = self.0.current.lock().take();
        if let Some(window) = window {
            window.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.0.upstream.is_disposed()
    }
}

struct WindowTimeObserver<T> {
    state: Arc<WindowTimeState<T>>,
}

impl<T: Send + 'static> Observer<T> for WindowTimeObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        let window = self.state.current.lock().clone();
        if let Some(window) = window {
            window.push(value);
        }
    }

    fn on_error(&self, error: RillError) {
        let window = self.state.current.lock().take();
        if let Some(window) = window {
            window.error(error.clone());
        }
        self.state.downstream.on_error(error);
        self.state.worker.dispose();
    }

    fn on_complete(&self) {
        let window = self.state.current.lock().take();
        if let Some(window) = window {
            window.complete();
        }
        self.state.downstream.on_complete();
        self.state.worker.dispose();
    }
}
