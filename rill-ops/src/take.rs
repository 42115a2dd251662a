// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{Disposable, Observable, Observer, RillError, SubscriptionSlot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing the `take` operator.
pub trait TakeExt<T> {
    /// Emits at most `count` values, then completes and disposes the
    /// upstream. Further upstream values are discarded, not forwarded.
    fn take(self, count: u64) -> Observable<T>;
}

impl<T: Send + 'static> TakeExt<T> for Observable<T> {
    fn take(self, count: u64) -> Observable<T> {
        self.lift(move |downstream| {
            Arc::new(TakeObserver {
                downstream,
                remaining: Mutex::new(count),
                upstream: SubscriptionSlot::new(),
                done: AtomicBool::new(false),
            })
        })
    }
}

struct TakeObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    remaining: Mutex<u64>,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for TakeObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if !self.upstream.try_set(disposable.clone()) {
            return;
        }
        self.downstream.on_subscribe(disposable);
        if *self.remaining.lock() == 0 && !self.done.swap(true, Ordering::AcqRel) {
            self.upstream.dispose();
            self.downstream.on_complete();
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let exhausted = {
            let mut remaining = self.remaining.lock();
            if *remaining == 0 {
                return;
            }
            *remaining -= 1;
            *remaining == 0
        };
        self.downstream.on_next(value);
        if exhausted && !self.done.swap(true, Ordering::AcqRel) {
            self.upstream.dispose();
            self.downstream.on_complete();
        }
    }

    fn on_error(&self, error: RillError) {
        if self.done.swap(true, Ordering::AcqRel) {
            rill_core::hooks::undeliverable(error);
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
