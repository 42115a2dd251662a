// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Concurrent flattening: `flat_map` and the `merge` family.
//!
//! Inner sources emit from arbitrary threads; a work-pending drain
//! serializes their values onto the downstream. Inner emissions keep
//! their per-source order, across sources there is no global ordering.

use parking_lot::Mutex;
use rill_core::{
    hooks, CompositeDisposable, Disposable, DrainGate, Observable, Observer, RillError,
    SubscriptionSlot,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default internal queue capacity of multi-source operators.
pub const DEFAULT_BUFFER_SIZE: usize = 128;

/// Tuning knobs for [`FlatMapExt::flat_map_with`].
#[derive(Clone, Copy)]
pub struct FlatMapOptions {
    /// Defer errors until every source has terminated.
    pub delay_errors: bool,
    /// Maximum number of concurrently subscribed inner sources;
    /// `None` is unbounded.
    pub max_concurrency: Option<usize>,
    /// Capacity hint for the serialization queue.
    pub buffer_size: usize,
}

impl Default for FlatMapOptions {
    fn default() -> Self {
        Self {
            delay_errors: false,
            max_concurrency: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Extension trait providing `flat_map` and `merge_with`.
pub trait FlatMapExt<T> {
    /// Maps each value to an inner source and merges their emissions.
    fn flat_map<R: Send + 'static>(
        self,
        mapper: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R>;

    /// [`flat_map`](Self::flat_map) with explicit concurrency, error
    /// deferral and buffering knobs.
    fn flat_map_with<R: Send + 'static>(
        self,
        options: FlatMapOptions,
        mapper: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R>;

    /// Merges this source with another.
    fn merge_with(self, other: Observable<T>) -> Observable<T>;
}

impl<T: Send + 'static> FlatMapExt<T> for Observable<T> {
    fn flat_map<R: Send + 'static>(
        self,
        mapper: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R> {
        self.flat_map_with(FlatMapOptions::default(), mapper)
    }

    fn flat_map_with<R: Send + 'static>(
        self,
        options: FlatMapOptions,
        mapper: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Observable<R> {
        let source = self.clone();
        let mapper = Arc::new(mapper);
        Observable::new(move |downstream| {
            let state = Arc::new(MergeState {
                downstream,
                delay_errors: options.delay_errors,
                max_concurrency: options.max_concurrency.unwrap_or(usize::MAX).max(1),
                gate: DrainGate::new(),
                queue: Mutex::new(VecDeque::with_capacity(options.buffer_size)),
                coord: Mutex::new(MergeCoord {
                    active: 0,
                    pending: VecDeque::new(),
                    outer_done: false,
                }),
                errors: Mutex::new(Vec::new()),
                abort: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
                upstream: SubscriptionSlot::new(),
                inners: CompositeDisposable::new(),
            });
            state
                .downstream
                .on_subscribe(Arc::new(MergeDisposable(state.clone())));
            source.subscribe_observer(Arc::new(MergeOuterObserver {
                state,
                mapper: mapper.clone(),
            }));
        })
    }

    fn merge_with(self, other: Observable<T>) -> Observable<T> {
        merge(vec![self, other])
    }
}

/// Merges every source; completes when all of them do.
///
/// The result is a linearization preserving each source's own order.
pub fn merge<T: Send + 'static>(sources: Vec<Observable<T>>) -> Observable<T> {
    Observable::from_iter(sources).flat_map(|source| source)
}

/// [`merge`] deferring any error until all sources terminated.
pub fn merge_delay_error<T: Send + 'static>(sources: Vec<Observable<T>>) -> Observable<T> {
    Observable::from_iter(sources).flat_map_with(
        FlatMapOptions {
            delay_errors: true,
            ..FlatMapOptions::default()
        },
        |source| source,
    )
}

struct MergeCoord<R> {
    active: usize,
    pending: VecDeque<Observable<R>>,
    outer_done: bool,
}

struct MergeState<R> {
    downstream: Arc<dyn Observer<R>>,
    delay_errors: bool,
    max_concurrency: usize,
    gate: DrainGate,
    queue: Mutex<VecDeque<R>>,
    coord: Mutex<MergeCoord<R>>,
    errors: Mutex<Vec<RillError>>,
    abort: AtomicBool,
    cancelled: AtomicBool,
    terminated: AtomicBool,
    upstream: SubscriptionSlot,
    inners: CompositeDisposable,
}

struct MergeDisposable<R>(Arc<MergeState<R>>);

impl<R: Send + 'static> Disposable for MergeDisposable<R> {
    fn dispose(&self) {
        if self.0.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        cancel_sources(&self.0);
        drain(&self.0);
    }

    fn is_disposed(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }
}

struct MergeOuterObserver<T, R> {
    state: Arc<MergeState<R>>,
    mapper: Arc<dyn Fn(T) -> Observable<R> + Send + Sync>,
}

impl<T: Send, R: Send + 'static> Observer<T> for MergeOuterObserver<T, R> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        if self.state.cancelled.load(Ordering::Acquire) || self.state.abort.load(Ordering::Acquire)
        {
            return;
        }
        let inner = (self.mapper)(value);
        subscribe_or_enqueue(&self.state, inner);
    }

    fn on_error(&self, error: RillError) {
        record_error(&self.state, error, SourceSide::Outer);
    }

    fn on_complete(&self) {
        self.state.coord.lock().outer_done = true;
        drain(&self.state);
    }
}

struct MergeInnerObserver<R> {
    state: Arc<MergeState<R>>,
    slot: SubscriptionSlot,
    finished: AtomicBool,
}

impl<R: Send + 'static> Observer<R> for MergeInnerObserver<R> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if self.slot.try_set(disposable.clone()) {
            self.state.inners.add(disposable);
        }
    }

    fn on_next(&self, value: R) {
        emit(&self.state, value);
    }

    fn on_error(&self, error: RillError) {
        if self.finished.swap(true, Ordering::AcqRel) {
            hooks::undeliverable(error);
            return;
        }
        record_error(&self.state, error, SourceSide::Inner);
    }

    fn on_complete(&self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        inner_finished(&self.state);
    }
}

enum SourceSide {
    Outer,
    Inner,
}

fn subscribe_or_enqueue<R: Send + 'static>(state: &Arc<MergeState<R>>, source: Observable<R>) {
    {
        let mut coord = state.coord.lock();
        if coord.active >= state.max_concurrency {
            coord.pending.push_back(source);
            return;
        }
        coord.active += 1;
    }
    subscribe_inner(state, source);
}

fn subscribe_inner<R: Send + 'static>(state: &Arc<MergeState<R>>, source: Observable<R>) {
    source.subscribe_observer(Arc::new(MergeInnerObserver {
        state: Arc::clone(state),
        slot: SubscriptionSlot::new(),
        finished: AtomicBool::new(false),
    }));
}

fn inner_finished<R: Send + 'static>(state: &Arc<MergeState<R>>) {
    let next = {
        let mut coord = state.coord.lock();
        coord.active -= 1;
        match coord.pending.pop_front() {
            Some(source) => {
                coord.active += 1;
                Some(source)
            }
            None => None,
        }
    };
    if let Some(source) = next {
        subscribe_inner(state, source);
    }
    drain(state);
}

fn record_error<R: Send + 'static>(state: &Arc<MergeState<R>>, error: RillError, side: SourceSide) {
    state.errors.lock().push(error);
    if state.delay_errors {
        // A delayed error counts as that source's completion
        match side {
            SourceSide::Outer => {
                state.coord.lock().outer_done = true;
                drain(state);
            }
            SourceSide::Inner => inner_finished(state),
        }
    } else {
        state.abort.store(true, Ordering::Release);
        drain(state);
    }
}

fn cancel_sources<R>(state: &Arc<MergeState<R>>) {
    state.upstream.dispose();
    state.inners.dispose();
    state.coord.lock().pending.clear();
}

fn emit<R: Send + 'static>(state: &Arc<MergeState<R>>, value: R) {
    if state.gate.try_claim() {
        if !state.cancelled.load(Ordering::Acquire)
            && !state.abort.load(Ordering::Acquire)
            && !state.terminated.load(Ordering::Acquire)
        {
            state.downstream.on_next(value);
        }
        let missed = state.gate.leave(1);
        if missed != 0 {
            drain_loop(state, missed);
        }
    } else {
        state.queue.lock().push_back(value);
        if state.gate.enter() {
            drain_loop(state, 1);
        }
    }
}

fn drain<R: Send + 'static>(state: &Arc<MergeState<R>>) {
    if state.gate.enter() {
        drain_loop(state, 1);
    }
}

fn drain_loop<R: Send + 'static>(state: &Arc<MergeState<R>>, mut missed: usize) {
    loop {
        if state.cancelled.load(Ordering::Acquire) {
            state.queue.lock().clear();
        } else if state.abort.load(Ordering::Acquire) && !state.delay_errors {
            state.queue.lock().clear();
            if !state.terminated.swap(true, Ordering::AcqRel) {
                cancel_sources(state);
                let errors = std::mem::take(&mut *state.errors.lock());
                state.downstream.on_error(RillError::from_errors(errors));
            }
        } else {
            loop {
                if state.terminated.load(Ordering::Acquire)
                    || state.cancelled.load(Ordering::Acquire)
                {
                    break;
                }
                let next = state.queue.lock().pop_front();
                match next {
                    Some(value) => state.downstream.on_next(value),
                    None => break,
                }
            }
            let all_done = {
                let coord = state.coord.lock();
                coord.outer_done && coord.active == 0 && coord.pending.is_empty()
            } && state.queue.lock().is_empty();
            if all_done
                && !state.cancelled.load(Ordering::Acquire)
                && !state.terminated.swap(true, Ordering::AcqRel)
            {
                let errors = std::mem::take(&mut *state.errors.lock());
                if errors.is_empty() {
                    state.downstream.on_complete();
                } else {
                    state.downstream.on_error(RillError::from_errors(errors));
                }
            }
        }
        missed = state.gate.leave(missed);
        if missed == 0 {
            return;
        }
    }
}
