// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Sequential flattening: one inner source at a time, in outer order.

use parking_lot::Mutex;
use rill_core::{
    hooks, Disposable, DrainGate, Observable, Observer, RillError, SerialDisposable,
    SubscriptionSlot,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing `concat_map` and `concat_with`.
pub trait ConcatExt<T> {
    /// Maps each value to an inner source, subscribing them strictly
    /// one after another in outer-arrival order.
    fn concat_map<R: Send + 'static>(
        self,
        mapper: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R>;

    /// [`concat_map`](Self::concat_map) with a queue capacity hint and
    /// error deferral.
    fn concat_map_with<R: Send + 'static>(
        self,
        prefetch: usize,
        delay_errors: bool,
        mapper: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R>;

    /// Emits everything from this source, then everything from `other`.
    fn concat_with(self, other: Observable<T>) -> Observable<T>;
}

impl<T: Send + 'static> ConcatExt<T> for Observable<T> {
    fn concat_map<R: Send + 'static>(
        self,
        mapper: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R> {
        self.concat_map_with(crate::DEFAULT_BUFFER_SIZE, false, mapper)
    }

    fn concat_map_with<R: Send + 'static>(
        self,
        prefetch: usize,
        delay_errors: bool,
        mapper: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R> {
        let source = self.clone();
        let mapper = Arc::new(mapper);
        Observable::new(move |downstream| {
            let state = Arc::new(ConcatState {
                downstream,
                mapper: mapper.clone(),
                delay_errors,
                queue: Mutex::new(VecDeque::with_capacity(prefetch)),
                inner_active: AtomicBool::new(false),
                outer_done: AtomicBool::new(false),
                gate: DrainGate::new(),
                errors: Mutex::new(Vec::new()),
                cancelled: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
                upstream: SubscriptionSlot::new(),
                inner: SerialDisposable::new(),
            });
            state
                .downstream
                .on_subscribe(Arc::new(ConcatDisposable(state.clone())));
            source.subscribe_observer(Arc::new(ConcatOuterObserver {
                state,
            }));
        })
    }

    fn concat_with(self, other: Observable<T>) -> Observable<T> {
        concat(vec![self, other])
    }
}

/// Emits every source in order; a source is subscribed only after its
/// predecessor completed. An error skips the remaining sources.
pub fn concat<T: Send + 'static>(sources: Vec<Observable<T>>) -> Observable<T> {
    Observable::from_iter(sources).concat_map(|source| source)
}

struct ConcatState<T, R> {
    downstream: Arc<dyn Observer<R>>,
    mapper: Arc<dyn Fn(T) -> Observable<R> + Send + Sync>,
    delay_errors: bool,
    queue: Mutex<VecDeque<T>>,
    inner_active: AtomicBool,
    outer_done: AtomicBool,
    gate: DrainGate,
    errors: Mutex<Vec<RillError>>,
    cancelled: AtomicBool,
    terminated: AtomicBool,
    upstream: SubscriptionSlot,
    inner: SerialDisposable,
}

struct ConcatDisposable<T, R>(Arc<ConcatState<T, R>>);

impl<T: Send + 'static, R: Send + 'static> Disposable for ConcatDisposable<T, R> {
    fn dispose(&self) {
        if self.0.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.0.upstream.dispose();
        self.0.inner.dispose();
        self.0.queue.lock().clear();
    }

    fn is_disposed(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }
}

struct ConcatOuterObserver<T, R> {
    state: Arc<ConcatState<T, R>>,
}

impl<T: Send + 'static, R: Send + 'static> Observer<T> for ConcatOuterObserver<T, R> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        if self.state.cancelled.load(Ordering::Acquire) {
            return;
        }
        self.state.queue.lock().push_back(value);
        drain(&self.state);
    }

    fn on_error(&self, error: RillError) {
        outer_error(&self.state, error);
    }

    fn on_complete(&self) {
        self.state.outer_done.store(true, Ordering::Release);
        drain(&self.state);
    }
}

fn outer_error<T: Send + 'static, R: Send + 'static>(
    state: &Arc<ConcatState<T, R>>,
    error: RillError,
) {
    state.errors.lock().push(error);
    state.outer_done.store(true, Ordering::Release);
    if !state.delay_errors {
        if !state.terminated.swap(true, Ordering::AcqRel) {
            state.inner.dispose();
            state.queue.lock().clear();
            let errors = std::mem::take(&mut *state.errors.lock());
            state.downstream.on_error(RillError::from_errors(errors));
        }
        return;
    }
    drain(state);
}

struct ConcatInnerObserver<T, R> {
    state: Arc<ConcatState<T, R>>,
    finished: AtomicBool,
}

impl<T: Send + 'static, R: Send + 'static> Observer<R> for ConcatInnerObserver<T, R> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.inner.set(disposable);
    }

    fn on_next(&self, value: R) {
        if !self.state.cancelled.load(Ordering::Acquire)
            && !self.state.terminated.load(Ordering::Acquire)
        {
            self.state.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RillError) {
        if self.finished.swap(true, Ordering::AcqRel) {
            hooks::undeliverable(error);
            return;
        }
        if self.state.delay_errors {
            self.state.errors.lock().push(error);
            self.state.inner_active.store(false, Ordering::Release);
            drain(&self.state);
            return;
        }
        if !self.state.terminated.swap(true, Ordering::AcqRel) {
            self.state.upstream.dispose();
            self.state.queue.lock().clear();
            self.state.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.inner_active.store(false, Ordering::Release);
        drain(&self.state);
    }
}

fn drain<T: Send + 'static, R: Send + 'static>(state: &Arc<ConcatState<T, R>>) {
    if !state.gate.enter() {
        return;
    }
    let mut missed = 1;
    loop {
        loop {
            if state.cancelled.load(Ordering::Acquire)
                || state.terminated.load(Ordering::Acquire)
                || state.inner_active.load(Ordering::Acquire)
            {
                break;
            }
            let next = state.queue.lock().pop_front();
            match next {
                Some(value) => {
                    state.inner_active.store(true, Ordering::Release);
                    let inner = (state.mapper)(value);
                    inner.subscribe_observer(Arc::new(ConcatInnerObserver {
                        state: Arc::clone(state),
                        finished: AtomicBool::new(false),
                    }));
                    // The inner may have finished synchronously; loop
                    // and re-check instead of waiting for a callback
                    continue;
                }
                None => {
                    if state.outer_done.load(Ordering::Acquire)
                        && !state.terminated.swap(true, Ordering::AcqRel)
                    {
                        let errors = std::mem::take(&mut *state.errors.lock());
                        if errors.is_empty() {
                            state.downstream.on_complete();
                        } else {
                            state.downstream.on_error(RillError::from_errors(errors));
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
