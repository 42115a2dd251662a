// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{hooks, Disposable, Observable, Observer, Result, RillError, SubscriptionSlot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `filter` operators.
pub trait FilterExt<T> {
    /// Keeps only values for which the predicate holds.
    fn filter(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T>;

    /// Keeps only values for which the fallible predicate holds; a
    /// failing predicate terminates the subscription and disposes the
    /// upstream.
    fn try_filter(
        self,
        predicate: impl Fn(&T) -> Result<bool> + Send + Sync + 'static,
    ) -> Observable<T>;
}

impl<T: Send + 'static> FilterExt<T> for Observable<T> {
    fn filter(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T> {
        self.try_filter(move |value| Ok(predicate(value)))
    }

    fn try_filter(
        self,
        predicate: impl Fn(&T) -> Result<bool> + Send + Sync + 'static,
    ) -> Observable<T> {
        let predicate = Arc::new(predicate);
        self.lift(move |downstream| {
            Arc::new(TryFilterObserver {
                downstream,
                predicate: predicate.clone(),
                upstream: SubscriptionSlot::new(),
                done: AtomicBool::new(false),
            })
        })
    }
}

struct TryFilterObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    predicate: Arc<dyn Fn(&T) -> Result<bool> + Send + Sync>,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for TryFilterObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if self.upstream.try_set(disposable.clone()) {
            self.downstream.on_subscribe(disposable);
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        match (self.predicate)(&value) {
            Ok(true) => self.downstream.on_next(value),
            Ok(false) => {}
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
