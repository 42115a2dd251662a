// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{
    CompositeDisposable, Disposable, DrainGate, Observable, Observer, RillError, SubscriptionSlot,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Combines sources index-by-index.
///
/// A row is emitted only when every source has an item queued; the
/// `i`-th emission combines the `i`-th item of every source. When any
/// source completes with an empty queue the result completes — no
/// further row can ever form. With `delay_errors` a source error is
/// held back until the rows are exhausted.
pub fn zip<T, R>(
    sources: Vec<Observable<T>>,
    zipper: impl Fn(Vec<T>) -> R + Send + Sync + 'static,
) -> Observable<R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    zip_with_options(sources, false, zipper)
}

/// [`zip`] deferring errors until no more rows can be emitted.
pub fn zip_delay_error<T, R>(
    sources: Vec<Observable<T>>,
    zipper: impl Fn(Vec<T>) -> R + Send + Sync + 'static,
) -> Observable<R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    zip_with_options(sources, true, zipper)
}

fn zip_with_options<T, R>(
    sources: Vec<Observable<T>>,
    delay_errors: bool,
    zipper: impl Fn(Vec<T>) -> R + Send + Sync + 'static,
) -> Observable<R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    let zipper = Arc::new(zipper);
    Observable::new(move |downstream| {
        if sources.is_empty() {
            downstream.on_subscribe(rill_core::disposed());
            downstream.on_complete();
            return;
        }
        let state = Arc::new(ZipState {
            downstream,
            zipper: zipper.clone(),
            delay_errors,
            lanes: Mutex::new(
                sources
                    .iter()
                    .map(|_| Lane {
                        queue: VecDeque::new(),
                        done: false,
                    })
                    .collect(),
            ),
            errors: Mutex::new(Vec::new()),
            gate: DrainGate::new(),
            subscriptions: CompositeDisposable::new(),
            cancelled: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        });
        state
            .downstream
            .on_subscribe(Arc::new(ZipDisposable(state.clone())));
        for (index, source) in sources.iter().enumerate() {
            if state.cancelled.load(Ordering::Acquire) || state.terminated.load(Ordering::Acquire)
            {
                break;
            }
            source.subscribe_observer(Arc::new(ZipLaneObserver {
                state: Arc::clone(&state),
                index,
                slot: SubscriptionSlot::new(),
            }));
        }
    })
}

/// Extension trait providing pairwise `zip_with`.
pub trait ZipExt<T> {
    /// Zips this source with another, combining index-aligned pairs.
    fn zip_with<U, R>(
        self,
        other: Observable<U>,
        zipper: impl Fn(T, U) -> R + Send + Sync + 'static,
    ) -> Observable<R>
    where
        U: Send + 'static,
        R: Send + 'static;
}

impl<T: Send + 'static> ZipExt<T> for Observable<T> {
    fn zip_with<U, R>(
        self,
        other: Observable<U>,
        zipper: impl Fn(T, U) -> R + Send + Sync + 'static,
    ) -> Observable<R>
    where
        U: Send + 'static,
        R: Send + 'static,
    {
        use crate::map::MapExt;

        // Erase the two element types into one lane type
        let left = self.map(Pair::Left);
        let right = other.map(Pair::Right);
        zip(vec![left, right], move |mut row: Vec<Pair<T, U>>| {
            let second = row.pop();
            let first = row.pop();
            match (first, second) {
                (Some(Pair::Left(a)), Some(Pair::Right(b))) => zipper(a, b),
                _ => unreachable!("zip emits exactly one item per lane"),
            }
        })
    }
}

enum Pair<T, U> {
    Left(T),
    Right(U),
}

struct Lane<T> {
    queue: VecDeque<T>,
    done: bool,
}

struct ZipState<T, R> {
    downstream: Arc<dyn Observer<R>>,
    zipper: Arc<dyn Fn(Vec<T>) -> R + Send + Sync>,
    delay_errors: bool,
    lanes: Mutex<Vec<Lane<T>>>,
    errors: Mutex<Vec<RillError>>,
    gate: DrainGate,
    subscriptions: CompositeDisposable,
    cancelled: AtomicBool,
    terminated: AtomicBool,
}

struct ZipDisposable<T, R>(Arc<ZipState<T, R>>);

impl<T: Send + 'static, R: Send + 'static> Disposable for ZipDisposable<T, R> {
    fn dispose(&self) {
        if self.0.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.0.subscriptions.dispose();
        for lane in self.0.lanes.lock().iter_mut() {
            lane.queue.clear();
        }
    }

    fn is_disposed(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }
}

struct ZipLaneObserver<T, R> {
    state: Arc<ZipState<T, R>>,
    index: usize,
    slot: SubscriptionSlot,
}

impl<T: Send + 'static, R: Send + 'static> Observer<T> for ZipLaneObserver<T, R> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if self.slot.try_set(disposable.clone()) {
            self.state.subscriptions.add(disposable);
        }
    }

    fn on_next(&self, value: T) {
        self.state.lanes.lock()[self.index].queue.push_back(value);
        drain(&self.state);
    }

    fn on_error(&self, error: RillError) {
        self.state.errors.lock().push(error);
        if !self.state.delay_errors {
            if !self.state.terminated.swap(true, Ordering::AcqRel) {
                self.state.subscriptions.dispose();
                let errors = std::mem::take(&mut *self.state.errors.lock());
                self.state
                    .downstream
                    .on_error(RillError::from_errors(errors));
            }
            return;
        }
        self.state.lanes.lock()[self.index].done = true;
        drain(&self.state);
    }

    fn on_complete(&self) {
        self.state.lanes.lock()[self.index].done = true;
        drain(&self.state);
    }
}

enum ZipStep<T> {
    Row(Vec<T>),
    Finish,
    Idle,
}

fn drain<T: Send + 'static, R: Send + 'static>(state: &Arc<ZipState<T, R>>) {
    if !state.gate.enter() {
        return;
    }
    let mut missed = 1;
    loop {
        loop {
            if state.cancelled.load(Ordering::Acquire) || state.terminated.load(Ordering::Acquire)
            {
                break;
            }
            let step = {
                let mut lanes = state.lanes.lock();
                if lanes.iter().all(|lane| !lane.queue.is_empty()) {
                    ZipStep::Row(
                        lanes
                            .iter_mut()
                            .filter_map(|lane| lane.queue.pop_front())
                            .collect(),
                    )
                } else if lanes
                    .iter()
                    .any(|lane| lane.done && lane.queue.is_empty())
                {
                    ZipStep::Finish
                } else {
                    ZipStep::Idle
                }
            };
            match step {
                ZipStep::Row(row) => {
                    let combined = (state.zipper)(row);
                    state.downstream.on_next(combined);
                }
                ZipStep::Finish => {
                    if !state.terminated.swap(true, Ordering::AcqRel) {
                        state.subscriptions.dispose();
                        let errors = std::mem::take(&mut *state.errors.lock());
                        if errors.is_empty() {
                            state.downstream.on_complete();
                        } else {
                            state
                                .downstream
                                .on_error(RillError::from_errors(errors));
                        }
                    }
                    break;
                }
                ZipStep::Idle => break,
            }
        }
        missed = state.gate.leave(missed);
        if missed == 0 {
            return;
        }
    }
}
