// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{Disposable, Observable, Observer, RillError};
use std::sync::Arc;

/// Extension trait suppressing consecutive duplicate values.
pub trait DistinctUntilChangedExt<T> {
    /// Forwards a value only when it differs from its predecessor.
    fn distinct_until_changed(self) -> Observable<T>
    where
        T: PartialEq + Clone + Sync;

    /// Forwards a value only when the comparer says it differs from its
    /// predecessor.
    fn distinct_until_changed_by(
        self,
        comparer: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Observable<T>
    where
        T: Clone + Sync;

    /// Forwards a value only when its key differs from the previous key.
    fn distinct_until_changed_key<K: PartialEq + Send + Sync + 'static>(
        self,
        key: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<T>;
}

impl<T: Send + 'static> DistinctUntilChangedExt<T> for Observable<T> {
    fn distinct_until_changed(self) -> Observable<T>
    where
        T: PartialEq + Clone + Sync,
    {
        self.distinct_until_changed_by(|previous, current| previous == current)
    }

    fn distinct_until_changed_by(
        self,
        comparer: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Observable<T>
    where
        T: Clone + Sync,
    {
        // The retained key is the previous value itself
        self.distinct_until_changed_key_internal(
            move |previous: &T, current: &T| comparer(previous, current),
            |value: &T| value.clone(),
        )
    }

    fn distinct_until_changed_key<K: PartialEq + Send + Sync + 'static>(
        self,
        key: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<T> {
        self.distinct_until_changed_key_internal(|previous: &K, current: &K| previous == current, key)
    }
}

trait DistinctInternal<T> {
    fn distinct_until_changed_key_internal<K: Send + Sync + 'static>(
        self,
        same: impl Fn(&K, &K) -> bool + Send + Sync + 'static,
        key: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<T>;
}

impl<T: Send + 'static> DistinctInternal<T> for Observable<T> {
    fn distinct_until_changed_key_internal<K: Send + Sync + 'static>(
        self,
        same: impl Fn(&K, &K) -> bool + Send + Sync + 'static,
        key: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<T> {
        let same = Arc::new(same);
        let key = Arc::new(key);
        self.lift(move |downstream| {
            Arc::new(DistinctObserver {
                downstream,
                last: Mutex::new(None),
                same: same.clone(),
                key: key.clone(),
            })
        })
    }
}

struct DistinctObserver<T, K> {
    downstream: Arc<dyn Observer<T>>,
    last: Mutex<Option<K>>,
    same: Arc<dyn Fn(&K, &K) -> bool + Send + Sync>,
    key: Arc<dyn Fn(&T) -> K + Send + Sync>,
}

impl<T: Send, K: Send + Sync> Observer<T> for DistinctObserver<T, K> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_next(&self, value: T) {
        let current = (self.key)(&value);
        let changed = {
            let mut last = self.last.lock();
            let changed = match last.as_ref() {
                Some(previous) => !(self.same)(previous, &current),
                None => true,
            };
            if changed {
                *last = Some(current);
            }
            changed
        };
        if changed {
            self.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RillError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}
