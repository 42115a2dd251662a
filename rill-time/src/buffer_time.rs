// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{
    pair, Disposable, Observable, Observer, RillError, SerialDisposable, SerializedObserver,
    SubscriptionSlot,
};
use rill_scheduler::{PeriodicWorker, Scheduler, Worker};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing time-bounded buffering.
pub trait BufferTimeExt<T> {
    /// Emits the values collected in every `period`, empty chunks
    /// included.
    fn buffer_time(self, period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<Vec<T>>;

    /// Like [`buffer_time`](Self::buffer_time), but also flushes when a
    /// chunk reaches `max_size`. With `restart_timer` the period starts
    /// over on a size-based flush; otherwise the timer keeps its
    /// cadence.
    fn buffer_time_count(
        self,
        period: Duration,
        max_size: usize,
        restart_timer: bool,
        scheduler: Arc<dyn Scheduler>,
    ) -> Observable<Vec<T>>;
}

impl<T: Send + 'static> BufferTimeExt<T> for Observable<T> {
    fn buffer_time(self, period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<Vec<T>> {
        self.buffer_time_count(period, usize::MAX, false, scheduler)
    }

    fn buffer_time_count(
        self,
        period: Duration,
        max_size: usize,
        restart_timer: bool,
        scheduler: Arc<dyn Scheduler>,
    ) -> Observable<Vec<T>> {
        let source = self.clone();
        let max_size = max_size.max(1);
        Observable::new(move |downstream| {
            let state = Arc::new(BufferTimeState {
                downstream: Arc::new(SerializedObserver::new(downstream.clone())),
                period,
                max_size,
                restart_timer,
                worker: scheduler.create_worker(),
                chunk: Mutex::new(Some(Vec::new())),
                timer: SerialDisposable::new(),
                upstream: SubscriptionSlot::new(),
            });
            downstream.on_subscribe(pair(
                Arc::new(BufferTimeHandle(state.clone())),
                state.worker.clone(),
            ));
            start_timer(&state);
            source.subscribe_observer(Arc::new(BufferTimeObserver { state }));
        })
    }
}

struct BufferTimeState<T> {
    downstream: Arc<SerializedObserver<Vec<T>>>,
    period: Duration,
    max_size: usize,
    restart_timer: bool,
    worker: Arc<dyn Worker>,
    // None once the subscription terminated
    chunk: Mutex<Option<Vec<T>>>,
    timer: SerialDisposable,
    upstream: SubscriptionSlot,
}

fn flush<T: Send + 'static>(state: &Arc<BufferTimeState<T>>) {
    let flushed = {
        let mut chunk = state.chunk.lock();
        chunk.as_mut().map(std::mem::take)
    };
    if let Some(values) = flushed {
        state.downstream.on_next(values);
    }
}

fn start_timer<T: Send + 'static>(state: &Arc<BufferTimeState<T>>) {
    let tick_state = Arc::clone(state);
    if state.restart_timer {
        // Size flushes re-arm; keep each round a one-shot
        let worker = state.worker.clone();
        state.timer.set(worker.schedule_after(
            state.period,
            Box::new(move || {
                flush(&tick_state);
                start_timer(&tick_state);
            }),
        ));
    } else {
        state.timer.set(
            state
                .worker
                .schedule_periodic(state.period, state.period, move || flush(&tick_state)),
        );
    }
}

struct BufferTimeHandle<T>(Arc<BufferTimeState<T>>);

impl<T: Send + 'static> Disposable for BufferTimeHandle<T> {
    fn dispose(&self) {
        self.0.upstream.dispose();
        self.0.timer.dispose();
        self.0.chunk.lock().take();
    }

    fn is_disposed(&self) -> bool {
        self.0.upstream.is_disposed()
    }
}

struct BufferTimeObserver<T> {
    state: Arc<BufferTimeState<T>>,
}

impl<T: Send + 'static> Observer<T> for BufferTimeObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        let full = {
            let mut chunk = self.state.chunk.lock();
            match chunk.as_mut() {
                Some(values) => {
                    values.push(value);
                    values.len() >= self.state.max_size
                }
                None => return,
            }
        };
        if full {
            flush(&self.state);
            if self.state.restart_timer {
                start_timer(&self.state);
            }
        }
    }

    fn on_error(&self, error: RillError) {
        self.state.timer.dispose();
        self.state.chunk.lock().take();
        self.state.downstream.on_error(error);
        self.state.worker.dispose();
    }

    fn on_complete(&self) {
        self.state.timer.dispose();
        let leftovers = self.state.chunk.lock().take();
        if let Some(values) = leftovers {
            if !values.is_empty() {
                self.state.downstream.on_next(values);
            }
        }
        self.state.downstream.on_complete();
        self.state.worker.dispose();
    }
}
