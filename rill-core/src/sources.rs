// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Source adapters: arrays, iterables, callables, futures and deferred
//! factories expressed as observables.
//!
//! Synchronous sources check the subscription between emissions, so
//! disposing mid-emission stops the loop and suppresses the terminal.

use crate::disposable::{disposed, Disposable, FlagDisposable};
use crate::observer::Observer;
use crate::{hooks, Observable, Result, RillError};
use futures::executor::block_on;
use futures::Future;
use parking_lot::Mutex;
use std::sync::Arc;

impl<T: Send + 'static> Observable<T> {
    /// Emits a single value, then completes.
    pub fn just(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Observable::new(move |downstream| {
            let flag: Arc<dyn Disposable> = Arc::new(FlagDisposable::new());
            downstream.on_subscribe(flag.clone());
            if flag.is_disposed() {
                return;
            }
            downstream.on_next(value.clone());
            if !flag.is_disposed() {
                downstream.on_complete();
            }
        })
    }

    /// Emits every item of the (re-iterable) collection, then completes.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    {
        Observable::new(move |downstream| {
            let flag: Arc<dyn Disposable> = Arc::new(FlagDisposable::new());
            downstream.on_subscribe(flag.clone());
            for item in iter.clone() {
                if flag.is_disposed() {
                    return;
                }
                downstream.on_next(item);
            }
            if !flag.is_disposed() {
                downstream.on_complete();
            }
        })
    }

    /// Evaluates the callable at subscribe time; emits its value or
    /// routes its failure into `on_error`.
    pub fn from_callable(callable: impl Fn() -> Result<T> + Send + Sync + 'static) -> Self {
        Observable::new(move |downstream| {
            let flag: Arc<dyn Disposable> = Arc::new(FlagDisposable::new());
            downstream.on_subscribe(flag.clone());
            if flag.is_disposed() {
                return;
            }
            match callable() {
                Ok(value) => {
                    downstream.on_next(value);
                    if !flag.is_disposed() {
                        downstream.on_complete();
                    }
                }
                Err(error) => downstream.on_error(error),
            }
        })
    }

    /// Defers source construction to subscribe time.
    ///
    /// Each subscription gets a fresh source from the factory.
    pub fn defer(factory: impl Fn() -> Observable<T> + Send + Sync + 'static) -> Self {
        Observable::new(move |downstream| {
            factory().subscribe_observer(downstream);
        })
    }

    /// Completes immediately without emitting.
    pub fn empty() -> Self {
        Observable::new(|downstream| {
            downstream.on_subscribe(Arc::new(FlagDisposable::new()));
            downstream.on_complete();
        })
    }

    /// Never emits and never terminates.
    pub fn never() -> Self {
        Observable::new(|downstream| {
            downstream.on_subscribe(Arc::new(FlagDisposable::new()));
        })
    }

    /// Fails immediately with the given error.
    pub fn error(error: RillError) -> Self {
        Observable::error_with(move || error.clone())
    }

    /// Fails immediately with an error built at subscribe time.
    pub fn error_with(factory: impl Fn() -> RillError + Send + Sync + 'static) -> Self {
        Observable::new(move |downstream| {
            downstream.on_subscribe(disposed());
            downstream.on_error(factory());
        })
    }

    /// Bridges a one-shot future.
    ///
    /// The subscribing thread blocks on the future (pair with
    /// `subscribe_on` to move that wait onto an `io` worker, and with
    /// `timeout` for a deadline). Rust futures are single-shot: a second
    /// subscription observes an error instead of a value.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Some(future)));
        Observable::new(move |downstream| {
            let flag: Arc<dyn Disposable> = Arc::new(FlagDisposable::new());
            downstream.on_subscribe(flag.clone());
            let future = slot.lock().take();
            match future {
                Some(future) => match block_on(future) {
                    Ok(value) => {
                        if flag.is_disposed() {
                            return;
                        }
                        downstream.on_next(value);
                        if !flag.is_disposed() {
                            downstream.on_complete();
                        }
                    }
                    Err(error) => downstream.on_error(error),
                },
                None => downstream.on_error(RillError::stream_error(
                    "future already consumed by a previous subscription",
                )),
            }
        })
    }

    /// Derives a source from a per-subscription resource.
    ///
    /// `acquire` runs at subscribe time, `source` builds the stream over
    /// the resource, and `release` runs exactly once when the
    /// subscription ends — before the terminal is forwarded when `eager`
    /// is `true`, after it otherwise. A failing eager release replaces
    /// the completion (or joins the error as a composite); a failing
    /// lazy release is reported to the global hook.
    pub fn using<R: Send + 'static>(
        acquire: impl Fn() -> Result<R> + Send + Sync + 'static,
        source: impl Fn(&R) -> Observable<T> + Send + Sync + 'static,
        release: impl Fn(R) -> Result<()> + Send + Sync + 'static,
        eager: bool,
    ) -> Self {
        let release = Arc::new(release);
        Observable::new(move |downstream| {
            let resource = match acquire() {
                Ok(resource) => resource,
                Err(error) => {
                    downstream.on_subscribe(disposed());
                    downstream.on_error(error);
                    return;
                }
            };
            let stream = source(&resource);
            let guard = Arc::new(ResourceGuard {
                resource: Mutex::new(Some(resource)),
                release: release.clone(),
            });
            stream.subscribe_observer(Arc::new(UsingObserver {
                downstream,
                guard,
                eager,
            }));
        })
    }
}

struct ResourceGuard<R> {
    resource: Mutex<Option<R>>,
    #[allow(clippy::type_complexity)]
    release: Arc<dyn Fn(R) -> Result<()> + Send + Sync>,
}

impl<R> ResourceGuard<R> {
    // Runs the release exactly once; subsequent calls are no-ops.
    fn release_now(&self) -> Result<()> {
        match self.resource.lock().take() {
            Some(resource) => (self.release)(resource),
            None => Ok(()),
        }
    }
}

struct UsingObserver<T, R> {
    downstream: Arc<dyn Observer<T>>,
    guard: Arc<ResourceGuard<R>>,
    eager: bool,
}

impl<T: Send + 'static, R: Send + 'static> Observer<T> for UsingObserver<T, R> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        let guard = self.guard.clone();
        let upstream = disposable.clone();
        self.downstream
            .on_subscribe(Arc::new(crate::disposable::ActionDisposable::new(
                move || {
                    upstream.dispose();
                    if let Err(error) = guard.release_now() {
                        hooks::undeliverable(error);
                    }
                },
            )));
    }

    fn on_next(&self, value: T) {
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: RillError) {
        if self.eager {
            match self.guard.release_now() {
                Ok(()) => self.downstream.on_error(error),
                Err(cleanup) => self
                    .downstream
                    .on_error(RillError::from_errors(vec![error, cleanup])),
            }
            return;
        }
        self.downstream.on_error(error);
        if let Err(cleanup) = self.guard.release_now() {
            hooks::undeliverable(cleanup);
        }
    }

    fn on_complete(&self) {
        if self.eager {
            match self.guard.release_now() {
                Ok(()) => self.downstream.on_complete(),
                Err(cleanup) => self.downstream.on_error(cleanup),
            }
            return;
        }
        self.downstream.on_complete();
        if let Err(cleanup) = self.guard.release_now() {
            hooks::undeliverable(cleanup);
        }
    }
}

impl Observable<i64> {
    /// Emits `count` consecutive integers starting at `start`.
    pub fn range(start: i64, count: u64) -> Observable<i64> {
        Observable::new(move |downstream| {
            let flag: Arc<dyn Disposable> = Arc::new(FlagDisposable::new());
            downstream.on_subscribe(flag.clone());
            for offset in 0..count {
                if flag.is_disposed() {
                    return;
                }
                downstream.on_next(start + offset as i64);
            }
            if !flag.is_disposed() {
                downstream.on_complete();
            }
        })
    }
}
