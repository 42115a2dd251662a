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

/// Combines the latest value of every source.
///
/// A combination is emitted on any emission once every source has
/// produced at least one value. A completing source is absorbed — its
/// last value keeps participating — until all sources completed.
pub fn combine_latest<T, R>(
    sources: Vec<Observable<T>>,
    combiner: impl Fn(&[T]) -> R + Send + Sync + 'static,
) -> Observable<R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    combine_latest_with_options(sources, false, combiner)
}

/// [`combine_latest`] deferring errors until all sources terminated.
pub fn combine_latest_delay_error<T, R>(
    sources: Vec<Observable<T>>,
    combiner: impl Fn(&[T]) -> R + Send + Sync + 'static,
) -> Observable<R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    combine_latest_with_options(sources, true, combiner)
}

/// Extension trait providing pairwise `combine_latest_with`.
pub trait CombineLatestExt<T> {
    /// Combines the latest values of this source and `other`.
    fn combine_latest_with<U, R>(
        self,
        other: Observable<U>,
        combiner: impl Fn(&T, &U) -> R + Send + Sync + 'static,
    ) -> Observable<R>
    where
        T: Clone + Sync,
        U: Clone + Send + Sync + 'static,
        R: Send + 'static;
}

impl<T: Send + 'static> CombineLatestExt<T> for Observable<T> {
    fn combine_latest_with<U, R>(
        self,
        other: Observable<U>,
        combiner: impl Fn(&T, &U) -> R + Send + Sync + 'static,
    ) -> Observable<R>
    where
        T: Clone + Sync,
        U: Clone + Send + Sync + 'static,
        R: Send + 'static,
    {
        use crate::map::MapExt;

        let left = self.map(|v| Slot::Left(Arc::new(v)));
        let right = other.map(|v| Slot::Right(Arc::new(v)));
        combine_latest(vec![left, right], move |cells: &[Slot<T, U>]| {
            match (&cells[0], &cells[1]) {
                (Slot::Left(a), Slot::Right(b)) => combiner(a, b),
                _ => unreachable!("lane values keep their lane"),
            }
        })
    }
}

#[derive(Clone)]
enum Slot<T, U> {
    Left(Arc<T>),
    Right(Arc<U>),
}

fn combine_latest_with_options<T, R>(
    sources: Vec<Observable<T>>,
    delay_errors: bool,
    combiner: impl Fn(&[T]) -> R + Send + Sync + 'static,
) -> Observable<R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    let combiner = Arc::new(combiner);
    Observable::new(move |downstream| {
        if sources.is_empty() {
            downstream.on_subscribe(rill_core::disposed());
            downstream.on_complete();
            return;
        }
        let count = sources.len();
        let state = Arc::new(CombineState {
            downstream,
            combiner: combiner.clone(),
            delay_errors,
            cells: Mutex::new(CombineCells {
                latest: vec![None; count],
                filled: 0,
                finished: 0,
            }),
            rows: Mutex::new(VecDeque::new()),
            errors: Mutex::new(Vec::new()),
            gate: DrainGate::new(),
            subscriptions: CompositeDisposable::new(),
            cancelled: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        });
        state
            .downstream
            .on_subscribe(Arc::new(CombineDisposable(state.clone())));
        for (index, source) in sources.iter().enumerate() {
            if state.cancelled.load(Ordering::Acquire) || state.terminated.load(Ordering::Acquire)
            {
                break;
            }
            source.subscribe_observer(Arc::new(CombineLaneObserver {
                state: Arc::clone(&state),
                index,
                slot: SubscriptionSlot::new(),
            }));
        }
    })
}

struct CombineCells<T> {
    latest: Vec<Option<T>>,
    filled: usize,
    finished: usize,
}

struct CombineState<T, R> {
    downstream: Arc<dyn Observer<R>>,
    combiner: Arc<dyn Fn(&[T]) -> R + Send + Sync>,
    delay_errors: bool,
    cells: Mutex<CombineCells<T>>,
    rows: Mutex<VecDeque<Vec<T>>>,
    errors: Mutex<Vec<RillError>>,
    gate: DrainGate,
    subscriptions: CompositeDisposable,
    cancelled: AtomicBool,
    terminated: AtomicBool,
}

struct CombineDisposable<T, R>(Arc<CombineState<T, R>>);

impl<T, R> Disposable for CombineDisposable<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    fn dispose(&self) {
        if self.0.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.0.subscriptions.dispose();
        self.0.rows.lock().clear();
    }

    fn is_disposed(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }
}

struct CombineLaneObserver<T, R> {
    state: Arc<CombineState<T, R>>,
    index: usize,
    slot: SubscriptionSlot,
}

impl<T, R> Observer<T> for CombineLaneObserver<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if self.slot.try_set(disposable.clone()) {
            self.state.subscriptions.add(disposable);
        }
    }

    fn on_next(&self, value: T) {
        let row = {
            let mut cells = self.state.cells.lock();
            if cells.latest[self.index].is_none() {
                cells.filled += 1;
            }
            cells.latest[self.index] = Some(value);
            if cells.filled == cells.latest.len() {
                Some(
                    cells
                        .latest
                        .iter()
                        .filter_map(|cell| cell.clone())
                        .collect::<Vec<_>>(),
                )
            } else {
                None
            }
        };
        if let Some(row) = row {
            self.state.rows.lock().push_back(row);
            drain(&self.state);
        }
    }

    fn on_error(&self, error: RillError) {
        self.state.errors.lock().push(error);
        if !self.state.delay_errors {
            if !self.state.terminated.swap(true, Ordering::AcqRel) {
                self.state.subscriptions.dispose();
                self.state.rows.lock().clear();
                let errors = std::mem::take(&mut *self.state.errors.lock());
                self.state
                    .downstream
                    .on_error(RillError::from_errors(errors));
            }
            return;
        }
        self.on_complete();
    }

    fn on_complete(&self) {
        self.state.cells.lock().finished += 1;
        drain(&self.state);
    }
}

fn drain<T, R>(state: &Arc<CombineState<T, R>>)
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
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
            let next = state.rows.lock().pop_front();
            match next {
                Some(row) => {
                    let combined = (state.combiner)(&row);
                    state.downstream.on_next(combined);
                }
                None => break,
            }
        }
        let all_finished = {
            let cells = state.cells.lock();
            cells.finished == cells.latest.len()
        } && state.rows.lock().is_empty();
        if all_finished
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
        missed = state.gate.leave(missed);
        if missed == 0 {
            return;
        }
    }
}
