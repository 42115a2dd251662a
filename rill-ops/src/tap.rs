// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Side-effect hooks on the subscription lifecycle.
//!
//! Each `do_on_*` operator forwards everything unchanged and invokes
//! its callback at the corresponding point. `do_finally` runs exactly
//! once, after the terminal or on disposal, whichever comes first.

use rill_core::{ActionDisposable, Disposable, Observable, Observer, RillError, Signal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type NextHook<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&RillError) + Send + Sync>;
type UnitHook = Arc<dyn Fn() + Send + Sync>;

struct TapHooks<T> {
    on_next: Option<NextHook<T>>,
    on_error: Option<ErrorHook>,
    on_complete: Option<UnitHook>,
    on_subscribe: Option<UnitHook>,
    on_dispose: Option<UnitHook>,
    finally: Option<UnitHook>,
}

impl<T> Default for TapHooks<T> {
    fn default() -> Self {
        Self {
            on_next: None,
            on_error: None,
            on_complete: None,
            on_subscribe: None,
            on_dispose: None,
            finally: None,
        }
    }
}

/// Extension trait providing the `do_on_*` side-effect operators.
pub trait TapExt<T> {
    /// Observes each value before it is forwarded.
    fn do_on_next(self, hook: impl Fn(&T) + Send + Sync + 'static) -> Observable<T>;

    /// Observes the error terminal before it is forwarded.
    fn do_on_error(self, hook: impl Fn(&RillError) + Send + Sync + 'static) -> Observable<T>;

    /// Observes the completion terminal before it is forwarded.
    fn do_on_complete(self, hook: impl Fn() + Send + Sync + 'static) -> Observable<T>;

    /// Observes the handshake, before the handle reaches downstream.
    fn do_on_subscribe(self, hook: impl Fn() + Send + Sync + 'static) -> Observable<T>;

    /// Observes downstream disposal.
    fn do_on_dispose(self, hook: impl Fn() + Send + Sync + 'static) -> Observable<T>;

    /// Runs exactly once after the terminal or on disposal.
    fn do_finally(self, hook: impl Fn() + Send + Sync + 'static) -> Observable<T>;

    /// Observes every signal as a [`Signal`].
    fn do_on_each(self, hook: impl Fn(&Signal<T>) + Send + Sync + 'static) -> Observable<T>
    where
        T: Clone;
}

impl<T: Send + 'static> TapExt<T> for Observable<T> {
    fn do_on_next(self, hook: impl Fn(&T) + Send + Sync + 'static) -> Observable<T> {
        tap(
            self,
            TapHooks {
                on_next: Some(Arc::new(hook)),
                ..TapHooks::default()
            },
        )
    }

    fn do_on_error(self, hook: impl Fn(&RillError) + Send + Sync + 'static) -> Observable<T> {
        tap(
            self,
            TapHooks {
                on_error: Some(Arc::new(hook)),
                ..TapHooks::default()
            },
        )
    }

    fn do_on_complete(self, hook: impl Fn() + Send + Sync + 'static) -> Observable<T> {
        tap(
            self,
            TapHooks {
                on_complete: Some(Arc::new(hook)),
                ..TapHooks::default()
            },
        )
    }

    fn do_on_subscribe(self, hook: impl Fn() + Send + Sync + 'static) -> Observable<T> {
        tap(
            self,
            TapHooks {
                on_subscribe: Some(Arc::new(hook)),
                ..TapHooks::default()
            },
        )
    }

    fn do_on_dispose(self, hook: impl Fn() + Send + Sync + 'static) -> Observable<T> {
        tap(
            self,
            TapHooks {
                on_dispose: Some(Arc::new(hook)),
                ..TapHooks::default()
            },
        )
    }

    fn do_finally(self, hook: impl Fn() + Send + Sync + 'static) -> Observable<T> {
        tap(
            self,
            TapHooks {
                finally: Some(Arc::new(hook)),
                ..TapHooks::default()
            },
        )
    }

    fn do_on_each(self, hook: impl Fn(&Signal<T>) + Send + Sync + 'static) -> Observable<T>
    where
        T: Clone,
    {
        let hook = Arc::new(hook);
        let on_next = {
            let hook = hook.clone();
            move |value: &T| hook(&Signal::Next(value.clone()))
        };
        let on_error = {
            let hook = hook.clone();
            move |error: &RillError| hook(&Signal::Error(error.clone()))
        };
        let on_complete = move || hook(&Signal::Complete);
        tap(
            self,
            TapHooks {
                on_next: Some(Arc::new(on_next)),
                on_error: Some(Arc::new(on_error)),
                on_complete: Some(Arc::new(on_complete)),
                ..TapHooks::default()
            },
        )
    }
}

fn tap<T: Send + 'static>(source: Observable<T>, hooks: TapHooks<T>) -> Observable<T> {
    let hooks = Arc::new(hooks);
    source.lift(move |downstream| {
        Arc::new(TapObserver {
            downstream,
            hooks: hooks.clone(),
            finalized: Arc::new(AtomicBool::new(false)),
        })
    })
}

struct TapObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    hooks: Arc<TapHooks<T>>,
    finalized: Arc<AtomicBool>,
}

fn finalize<T>(hooks: &Arc<TapHooks<T>>, finalized: &AtomicBool) {
    if finalized.swap(true, Ordering::AcqRel) {
        return;
    }
    if let Some(finally) = &hooks.finally {
        finally();
    }
}

impl<T: Send + 'static> Observer<T> for TapObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if let Some(hook) = &self.hooks.on_subscribe {
            hook();
        }
        let hooks = Arc::clone(&self.hooks);
        let finalized = Arc::clone(&self.finalized);
        self.downstream
            .on_subscribe(Arc::new(ActionDisposable::new(move || {
                disposable.dispose();
                if let Some(hook) = &hooks.on_dispose {
                    hook();
                }
                finalize(&hooks, &finalized);
            })));
    }

    fn on_next(&self, value: T) {
        if let Some(hook) = &self.hooks.on_next {
            hook(&value);
        }
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: RillError) {
        if let Some(hook) = &self.hooks.on_error {
            hook(&error);
        }
        self.downstream.on_error(error);
        finalize(&self.hooks, &self.finalized);
    }

    fn on_complete(&self) {
        if let Some(hook) = &self.hooks.on_complete {
            hook();
        }
        self.downstream.on_complete();
        finalize(&self.hooks, &self.finalized);
    }
}
