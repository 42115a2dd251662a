// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{
    hooks, Disposable, Observable, Observer, RillError, SerialDisposable, SubscriptionSlot,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Extension trait providing the `switch_map` operator.
pub trait SwitchMapExt<T> {
    /// Maps each value to an inner source, keeping exactly one inner
    /// subscription alive: a new outer value disposes the current inner
    /// before subscribing its replacement.
    ///
    /// Notifications from a superseded inner are discarded — a
    /// monotonically increasing generation guards the consumer. After
    /// the outer completes, the last inner is allowed to finish before
    /// the downstream completes.
    fn switch_map<R: Send + 'static>(
        self,
        mapper: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R>;
}

impl<T: Send + 'static> SwitchMapExt<T> for Observable<T> {
    fn switch_map<R: Send + 'static>(
        self,
        mapper: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R> {
        let source = self.clone();
        let mapper = Arc::new(mapper);
        Observable::new(move |downstream| {
            let state = Arc::new(SwitchState {
                downstream,
                generation: AtomicU64::new(0),
                emit_lock: Mutex::new(()),
                inner: SerialDisposable::new(),
                inner_live: AtomicBool::new(false),
                outer_done: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
                upstream: SubscriptionSlot::new(),
            });
            state
                .downstream
                .on_subscribe(Arc::new(SwitchDisposable(state.clone())));
            source.subscribe_observer(Arc::new(SwitchOuterObserver {
                state,
                mapper: mapper.clone(),
            }));
        })
    }
}

struct SwitchState<R> {
    downstream: Arc<dyn Observer<R>>,
    generation: AtomicU64,
    emit_lock: Mutex<()>,
    inner: SerialDisposable,
    inner_live: AtomicBool,
    outer_done: AtomicBool,
    cancelled: AtomicBool,
    terminated: AtomicBool,
    upstream: SubscriptionSlot,
}

struct SwitchDisposable<R>(Arc<SwitchState<R>>);

impl<R: Send + 'static> Disposable for SwitchDisposable<R> {
    fn dispose(&self) {
        if self.0.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        // Invalidate any in-flight inner generation
        self.0.generation.fetch_add(1, Ordering::AcqRel);
        self.0.upstream.dispose();
        self.0.inner.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }
}

struct SwitchOuterObserver<T, R> {
    state: Arc<SwitchState<R>>,
    mapper: Arc<dyn Fn(T) -> Observable<R> + Send + Sync>,
}

impl<T: Send, R: Send + 'static> Observer<T> for SwitchOuterObserver<T, R> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        if self.state.cancelled.load(Ordering::Acquire)
            || self.state.terminated.load(Ordering::Acquire)
        {
            return;
        }
        let generation = self.state.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.inner_live.store(true, Ordering::Release);
        let inner = (self.mapper)(value);
        inner.subscribe_observer(Arc::new(SwitchInnerObserver {
            state: Arc::clone(&self.state),
            generation,
        }));
    }

    fn on_error(&self, error: RillError) {
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            hooks::undeliverable(error);
            return;
        }
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        self.state.inner.dispose();
        let _guard = self.state.emit_lock.lock();
        self.state.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.state.outer_done.store(true, Ordering::Release);
        if !self.state.inner_live.load(Ordering::Acquire) {
            complete_downstream(&self.state);
        }
    }
}

struct SwitchInnerObserver<R> {
    state: Arc<SwitchState<R>>,
    generation: u64,
}

impl<R> SwitchInnerObserver<R> {
    fn is_current(&self) -> bool {
        self.state.generation.load(Ordering::Acquire) == self.generation
    }
}

impl<R: Send + 'static> Observer<R> for SwitchInnerObserver<R> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if self.is_current() {
            // Replacement disposes the superseded inner subscription
            self.state.inner.set(disposable);
        } else {
            disposable.dispose();
        }
    }

    fn on_next(&self, value: R) {
        let _guard = self.state.emit_lock.lock();
        if self.is_current()
            && !self.state.cancelled.load(Ordering::Acquire)
            && !self.state.terminated.load(Ordering::Acquire)
        {
            self.state.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RillError) {
        if !self.is_current() {
            // A superseded inner failing has no consumer left
            hooks::undeliverable(error);
            return;
        }
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            hooks::undeliverable(error);
            return;
        }
        self.state.upstream.dispose();
        let _guard = self.state.emit_lock.lock();
        self.state.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if !self.is_current() {
            return;
        }
        self.state.inner_live.store(false, Ordering::Release);
        if self.state.outer_done.load(Ordering::Acquire) {
            complete_downstream(&self.state);
        }
    }
}

fn complete_downstream<R: Send + 'static>(state: &Arc<SwitchState<R>>) {
    if state.cancelled.load(Ordering::Acquire) {
        return;
    }
    if !state.terminated.swap(true, Ordering::AcqRel) {
        let _guard = state.emit_lock.lock();
        state.downstream.on_complete();
    }
}
