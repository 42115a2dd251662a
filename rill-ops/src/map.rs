// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{hooks, Disposable, Observable, Observer, Result, RillError, SubscriptionSlot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `map` operators.
pub trait MapExt<T> {
    /// Transforms each value with `mapper`.
    ///
    /// # Example
    ///
    /// ```
    /// use rill_core::Observable;
    /// use rill_ops::MapExt;
    ///
    /// let doubled = Observable::from_iter(vec![1, 2, 3]).map(|v| v * 2);
    /// let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    /// let sink = seen.clone();
    /// doubled.subscribe(move |v| sink.lock().push(v));
    /// assert_eq!(*seen.lock(), vec![2, 4, 6]);
    /// ```
    fn map<R: Send + 'static>(
        self,
        mapper: impl Fn(T) -> R + Send + Sync + 'static,
    ) -> Observable<R>;

    /// Transforms each value with a fallible `mapper`.
    ///
    /// A failing mapper terminates the subscription: the error is routed
    /// into `on_error` and the upstream is disposed.
    fn try_map<R: Send + 'static>(
        self,
        mapper: impl Fn(T) -> Result<R> + Send + Sync + 'static,
    ) -> Observable<R>;
}

impl<T: Send + 'static> MapExt<T> for Observable<T> {
    fn map<R: Send + 'static>(
        self,
        mapper: impl Fn(T) -> R + Send + Sync + 'static,
    ) -> Observable<R> {
        self.try_map(move |value| Ok(mapper(value)))
    }

    fn try_map<R: Send + 'static>(
        self,
        mapper: impl Fn(T) -> Result<R> + Send + Sync + 'static,
    ) -> Observable<R> {
        let mapper = Arc::new(mapper);
        self.lift(move |downstream| {
            Arc::new(TryMapObserver {
                downstream,
                mapper: mapper.clone(),
                upstream: SubscriptionSlot::new(),
                done: AtomicBool::new(false),
            })
        })
    }
}

struct TryMapObserver<T, R> {
    downstream: Arc<dyn Observer<R>>,
    mapper: Arc<dyn Fn(T) -> Result<R> + Send + Sync>,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T: Send, R: Send> Observer<T> for TryMapObserver<T, R> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if self.upstream.try_set(disposable.clone()) {
            self.downstream.on_subscribe(disposable);
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        match (self.mapper)(value) {
            Ok(mapped) => self.downstream.on_next(mapped),
            Err(error) => {
                self.done.store(true, Ordering::Release);
                self.upstream.dispose();
                self.downstream.on_error(error);
            }
        }
    }

    fn on_error(&self, error: RillError) {
        if self.done.swap(true, Ordering::AcqRel) {
            hooks::undeliverable(error);
            return;
        }
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.downstream.on_complete();
    }
}
