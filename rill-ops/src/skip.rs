// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{Disposable, Observable, Observer, RillError};
use std::sync::Arc;

/// Extension trait providing the `skip` operator.
pub trait SkipExt<T> {
    /// Drops the first `count` values, forwarding the rest.
    fn skip(self, count: u64) -> Observable<T>;
}

impl<T: Send + 'static> SkipExt<T> for Observable<T> {
    fn skip(self, count: u64) -> Observable<T> {
        self.lift(move |downstream| {
            Arc::new(SkipObserver {
                downstream,
                remaining: Mutex::new(count),
            })
        })
    }
}

struct SkipObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    remaining: Mutex<u64>,
}

impl<T: Send> Observer<T> for SkipObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_next(&self, value: T) {
        {
            let mut remaining = self.remaining.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return;
            }
        }
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: RillError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}
