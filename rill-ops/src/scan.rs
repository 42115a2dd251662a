// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{Disposable, Observable, Observer, RillError};
use std::sync::Arc;

/// Extension trait providing the `scan` operators.
pub trait ScanExt<T> {
    /// Emits each intermediate accumulation, starting from the first
    /// value itself.
    fn scan(self, accumulate: impl Fn(T, T) -> T + Send + Sync + 'static) -> Observable<T>
    where
        T: Clone + Sync;

    /// Emits the seed, then each intermediate accumulation.
    ///
    /// ```
    /// use rill_core::Observable;
    /// use rill_ops::ScanExt;
    ///
    /// let sums = Observable::from_iter(vec![1, 2, 3]).scan_with(0, |acc, v| acc + v);
    /// let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    /// let sink = seen.clone();
    /// sums.subscribe(move |v| sink.lock().push(v));
    /// assert_eq!(*seen.lock(), vec![0, 1, 3, 6]);
    /// ```
    fn scan_with<A: Clone + Send + Sync + 'static>(
        self,
        seed: A,
        accumulate: impl Fn(A, T) -> A + Send + Sync + 'static,
    ) -> Observable<A>;
}

impl<T: Send + 'static> ScanExt<T> for Observable<T> {
    fn scan(self, accumulate: impl Fn(T, T) -> T + Send + Sync + 'static) -> Observable<T>
    where
        T: Clone + Sync,
    {
        let accumulate = Arc::new(accumulate);
        self.lift(move |downstream| {
            let accumulate = accumulate.clone();
            Arc::new(ScanObserver {
                downstream,
                state: Mutex::new(None),
                accumulate: Arc::new(move |acc: Option<T>, value: T| match acc {
                    None => value,
                    Some(acc) => accumulate(acc, value),
                }),
                seed: None,
            })
        })
    }

    fn scan_with<A: Clone + Send + Sync + 'static>(
        self,
        seed: A,
        accumulate: impl Fn(A, T) -> A + Send + Sync + 'static,
    ) -> Observable<A> {
        let accumulate = Arc::new(accumulate);
        self.lift(move |downstream| {
            let accumulate = accumulate.clone();
            Arc::new(ScanObserver {
                downstream,
                state: Mutex::new(None),
                accumulate: Arc::new(move |acc: Option<A>, value: T| match acc {
                    // Unreachable in practice: the seed is pre-loaded at
                    // subscribe time
                    None => accumulate(seed_unreached(), value),
                    Some(acc) => accumulate(acc, value),
                }),
                seed: Some(seed.clone()),
            })
        })
    }
}

fn seed_unreached<A>() -> A {
    unreachable!("seeded scan always holds an accumulator")
}

struct ScanObserver<T, A> {
    downstream: Arc<dyn Observer<A>>,
    state: Mutex<Option<A>>,
    #[allow(clippy::type_complexity)]
    accumulate: Arc<dyn Fn(Option<A>, T) -> A + Send + Sync>,
    seed: Option<A>,
}

impl<T: Send, A: Clone + Send + Sync> Observer<T> for ScanObserver<T, A> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.downstream.on_subscribe(disposable);
        if let Some(seed) = &self.seed {
            *self.state.lock() = Some(seed.clone());
            self.downstream.on_next(seed.clone());
        }
    }

    fn on_next(&self, value: T) {
        let next = {
            let mut state = self.state.lock();
            let next = (self.accumulate)(state.take(), value);
            *state = Some(next.clone());
            next
        };
        self.downstream.on_next(next);
    }

    fn on_error(&self, error: RillError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}
