// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{Disposable, Observable, Observer, RillError};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Extension trait folding a finite stream into one collection value.
///
/// Each collector emits exactly one item when the upstream completes,
/// then completes; errors pass through and discard the partial
/// collection.
pub trait CollectExt<T> {
    /// Collects every value into a `Vec`, in emission order.
    fn to_list(self) -> Observable<Vec<T>>;

    /// Collects every value into a sorted `Vec`.
    fn to_sorted_list(self) -> Observable<Vec<T>>
    where
        T: Ord;

    /// Collects into a map keyed by `key`; a later value wins a key
    /// collision.
    fn to_map<K: Eq + Hash + Send + 'static>(
        self,
        key: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<HashMap<K, T>>;

    /// Collects into a map of value groups keyed by `key`.
    fn to_multimap<K: Eq + Hash + Send + 'static>(
        self,
        key: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<HashMap<K, Vec<T>>>;
}

impl<T: Send + 'static> CollectExt<T> for Observable<T> {
    fn to_list(self) -> Observable<Vec<T>> {
        fold(self, Vec::new, |list, value| list.push(value), |list| list)
    }

    fn to_sorted_list(self) -> Observable<Vec<T>>
    where
        T: Ord,
    {
        fold(
            self,
            Vec::new,
            |list, value| list.push(value),
            |mut list| {
                list.sort();
                list
            },
        )
    }

    fn to_map<K: Eq + Hash + Send + 'static>(
        self,
        key: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<HashMap<K, T>> {
        fold(
            self,
            HashMap::new,
            move |map, value| {
                map.insert(key(&value), value);
            },
            |map| map,
        )
    }

    fn to_multimap<K: Eq + Hash + Send + 'static>(
        self,
        key: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<HashMap<K, Vec<T>>> {
        fold(
            self,
            HashMap::new,
            move |map, value| map.entry(key(&value)).or_insert_with(Vec::new).push(value),
            |map| map,
        )
    }
}

fn fold<T, A, R>(
    source: Observable<T>,
    init: impl Fn() -> A + Send + Sync + 'static,
    step: impl Fn(&mut A, T) + Send + Sync + 'static,
    finish: impl Fn(A) -> R + Send + Sync + 'static,
) -> Observable<R>
where
    T: Send + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    let init = Arc::new(init);
    let step = Arc::new(step);
    let finish = Arc::new(finish);
    source.lift(move |downstream| {
        Arc::new(FoldObserver {
            downstream,
            accumulator: Mutex::new(Some(init())),
            step: step.clone(),
            finish: finish.clone(),
        })
    })
}

struct FoldObserver<T, A, R> {
    downstream: Arc<dyn Observer<R>>,
    accumulator: Mutex<Option<A>>,
    step: Arc<dyn Fn(&mut A, T) + Send + Sync>,
    finish: Arc<dyn Fn(A) -> R + Send + Sync>,
}

impl<T: Send, A: Send, R: Send> Observer<T> for FoldObserver<T, A, R> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_next(&self, value: T) {
        let mut accumulator = self.accumulator.lock();
        if let Some(acc) = accumulator.as_mut() {
            (self.step)(acc, value);
        }
    }

    fn on_error(&self, error: RillError) {
        self.accumulator.lock().take();
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        let finished = self.accumulator.lock().take().map(|acc| (self.finish)(acc));
        if let Some(result) = finished {
            self.downstream.on_next(result);
            self.downstream.on_complete();
        }
    }
}
