// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Resubscription loops: `retry` and `repeat`.
//!
//! A redo driver holds the current attempt in a serial disposable and
//! re-subscribes the source when the policy asks for another round. The
//! resubscription itself runs through a work-pending trampoline, so a
//! source that fails synchronously loops iteratively instead of
//! recursing. Disposing the downstream handle ends the loop regardless
//! of which attempt is live.

use rill_core::{
    hooks, pair, Disposable, DrainGate, Observable, Observer, PublishSubject, RillError,
    SerialDisposable,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Extension trait providing the `retry` family.
pub trait RetryExt<T> {
    /// Resubscribes on every error, forever.
    fn retry(self) -> Observable<T>;

    /// Resubscribes on error at most `times` times, then forwards the
    /// error.
    fn retry_times(self, times: u64) -> Observable<T>;

    /// Resubscribes while the predicate — given the 1-based attempt
    /// index and the error — returns `true`.
    fn retry_if(
        self,
        predicate: impl Fn(u64, &RillError) -> bool + Send + Sync + 'static,
    ) -> Observable<T>;

    /// Resubscribes on error until `stop` returns `true`.
    fn retry_until(self, stop: impl Fn() -> bool + Send + Sync + 'static) -> Observable<T>;

    /// Redo loop driven by a signal source the caller controls: each
    /// error is pushed into the stream handed to `handler`; every value
    /// the handler's output emits triggers a resubscription, and its
    /// terminal terminates the downstream.
    fn retry_when<S: Send + 'static>(
        self,
        handler: impl Fn(Observable<RillError>) -> Observable<S> + Send + Sync + 'static,
    ) -> Observable<T>;
}

/// Extension trait providing the `repeat` family.
pub trait RepeatExt<T> {
    /// Replays the sequence forever.
    fn repeat(self) -> Observable<T>;

    /// Plays the sequence `times` times in total.
    fn repeat_times(self, times: u64) -> Observable<T>;

    /// Replays the sequence until `stop` returns `true` after a
    /// completion.
    fn repeat_until(self, stop: impl Fn() -> bool + Send + Sync + 'static) -> Observable<T>;

    /// Redo loop driven by a signal source: each completion pushes a
    /// unit into the stream handed to `handler`; values from the
    /// handler's output resubscribe, its terminal terminates.
    fn repeat_when<S: Send + 'static>(
        self,
        handler: impl Fn(Observable<()>) -> Observable<S> + Send + Sync + 'static,
    ) -> Observable<T>;
}

impl<T: Send + 'static> RetryExt<T> for Observable<T> {
    fn retry(self) -> Observable<T> {
        self.retry_if(|_, _| true)
    }

    fn retry_times(self, times: u64) -> Observable<T> {
        self.retry_if(move |attempt, _| attempt <= times)
    }

    fn retry_if(
        self,
        predicate: impl Fn(u64, &RillError) -> bool + Send + Sync + 'static,
    ) -> Observable<T> {
        let source = self.clone();
        let predicate = Arc::new(predicate);
        Observable::new(move |downstream| {
            let state = RedoState::install(source.clone(), downstream, None);
            let predicate = predicate.clone();
            let observer: Arc<RedoObserver<T>> = Arc::new_cyclic(|this| RedoObserver {
                state,
                this: this.clone(),
                policy: RedoPolicy::OnError(Box::new(move |attempt, error| {
                    predicate(attempt, error)
                })),
            });
            start(observer);
        })
    }

    fn retry_until(self, stop: impl Fn() -> bool + Send + Sync + 'static) -> Observable<T> {
        self.retry_if(move |_, _| !stop())
    }

    fn retry_when<S: Send + 'static>(
        self,
        handler: impl Fn(Observable<RillError>) -> Observable<S> + Send + Sync + 'static,
    ) -> Observable<T> {
        let source = self.clone();
        let handler = Arc::new(handler);
        Observable::new(move |downstream| {
            let signals = PublishSubject::<RillError>::new();
            let control = handler(signals.observable());
            install_when(
                source.clone(),
                downstream,
                control,
                RedoPolicy::ErrorSignal(Box::new(move |error| signals.next(error))),
            );
        })
    }
}

impl<T: Send + 'static> RepeatExt<T> for Observable<T> {
    fn repeat(self) -> Observable<T> {
        self.repeat_until(|| false)
    }

    fn repeat_times(self, times: u64) -> Observable<T> {
        if times == 0 {
            return Observable::empty();
        }
        let source = self.clone();
        Observable::new(move |downstream| {
            let state = RedoState::install(source.clone(), downstream, None);
            let observer: Arc<RedoObserver<T>> = Arc::new_cyclic(|this| RedoObserver {
                state,
                this: this.clone(),
                // `plays` counts completions; the first play is not a redo
                policy: RedoPolicy::OnComplete(Box::new(move |plays| plays < times)),
            });
            start(observer);
        })
    }

    fn repeat_until(self, stop: impl Fn() -> bool + Send + Sync + 'static) -> Observable<T> {
        let source = self.clone();
        let stop = Arc::new(stop);
        Observable::new(move |downstream| {
            let state = RedoState::install(source.clone(), downstream, None);
            let stop = stop.clone();
            let observer: Arc<RedoObserver<T>> = Arc::new_cyclic(|this| RedoObserver {
                state,
                this: this.clone(),
                policy: RedoPolicy::OnComplete(Box::new(move |_| !stop())),
            });
            start(observer);
        })
    }

    fn repeat_when<S: Send + 'static>(
        self,
        handler: impl Fn(Observable<()>) -> Observable<S> + Send + Sync + 'static,
    ) -> Observable<T> {
        let source = self.clone();
        let handler = Arc::new(handler);
        Observable::new(move |downstream| {
            let signals = PublishSubject::<()>::new();
            let control = handler(signals.observable());
            install_when(
                source.clone(),
                downstream,
                control,
                RedoPolicy::CompleteSignal(Box::new(move || signals.next(()))),
            );
        })
    }
}

struct RedoState<T> {
    source: Observable<T>,
    downstream: Arc<dyn Observer<T>>,
    current: Arc<SerialDisposable>,
    trampoline: DrainGate,
    attempts: AtomicU64,
    terminated: AtomicBool,
}

impl<T: Send + 'static> RedoState<T> {
    // Wires the downstream handshake and returns the shared driver
    // state; `extra` joins the handle when the policy owns another
    // subscription (the `when` control stream).
    fn install(
        source: Observable<T>,
        downstream: Arc<dyn Observer<T>>,
        extra: Option<Arc<dyn Disposable>>,
    ) -> Arc<Self> {
        let current = Arc::new(SerialDisposable::new());
        let handle: Arc<dyn Disposable> = match extra {
            Some(extra) => pair(current.clone(), extra),
            None => current.clone(),
        };
        downstream.on_subscribe(handle);
        Arc::new(Self {
            source,
            downstream,
            current,
            trampoline: DrainGate::new(),
            attempts: AtomicU64::new(0),
            terminated: AtomicBool::new(false),
        })
    }
}

enum RedoPolicy {
    // attempt index (1-based), error -> resubscribe?
    OnError(Box<dyn Fn(u64, &RillError) -> bool + Send + Sync>),
    // completed plays so far -> resubscribe?
    OnComplete(Box<dyn Fn(u64) -> bool + Send + Sync>),
    // retry_when: errors go to the signal source, completion terminates
    ErrorSignal(Box<dyn Fn(RillError) + Send + Sync>),
    // repeat_when: completions go to the signal source, errors terminate
    CompleteSignal(Box<dyn Fn() + Send + Sync>),
}

struct RedoObserver<T> {
    state: Arc<RedoState<T>>,
    this: Weak<RedoObserver<T>>,
    policy: RedoPolicy,
}

fn start<T: Send + 'static>(observer: Arc<RedoObserver<T>>) {
    let state = Arc::clone(&observer.state);
    resubscribe(&state, observer);
}

fn resubscribe<T: Send + 'static>(state: &Arc<RedoState<T>>, observer: Arc<RedoObserver<T>>) {
    if !state.trampoline.enter() {
        return;
    }
    loop {
        if state.current.is_disposed() || state.terminated.load(Ordering::Acquire) {
            return;
        }
        state.source.subscribe_observer(observer.clone());
        if state.trampoline.leave(1) == 0 {
            return;
        }
    }
}

impl<T: Send + 'static> RedoObserver<T> {
    fn redo(&self) {
        if let Some(me) = self.this.upgrade() {
            resubscribe(&self.state, me);
        }
    }

    fn terminate_error(&self, error: RillError) {
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            hooks::undeliverable(error);
            return;
        }
        self.state.downstream.on_error(error);
    }

    fn terminate_complete(&self) {
        if !self.state.terminated.swap(true, Ordering::AcqRel) {
            self.state.downstream.on_complete();
        }
    }
}

impl<T: Send + 'static> Observer<T> for RedoObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.current.set(disposable);
    }

    fn on_next(&self, value: T) {
        if !self.state.terminated.load(Ordering::Acquire) {
            self.state.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RillError) {
        match &self.policy {
            RedoPolicy::OnError(decide) => {
                let attempt = self.state.attempts.fetch_add(1, Ordering::AcqRel) + 1;
                if !self.state.current.is_disposed() && decide(attempt, &error) {
                    self.redo();
                } else {
                    self.terminate_error(error);
                }
            }
            RedoPolicy::OnComplete(_) | RedoPolicy::CompleteSignal(_) => {
                self.terminate_error(error);
            }
            RedoPolicy::ErrorSignal(forward) => {
                if self.state.terminated.load(Ordering::Acquire) {
                    hooks::undeliverable(error);
                } else {
                    forward(error);
                }
            }
        }
    }

    fn on_complete(&self) {
        match &self.policy {
            RedoPolicy::OnError(_) | RedoPolicy::ErrorSignal(_) => self.terminate_complete(),
            RedoPolicy::OnComplete(decide) => {
                let plays = self.state.attempts.fetch_add(1, Ordering::AcqRel) + 1;
                if !self.state.current.is_disposed() && decide(plays) {
                    self.redo();
                } else {
                    self.terminate_complete();
                }
            }
            RedoPolicy::CompleteSignal(forward) => {
                if !self.state.terminated.load(Ordering::Acquire) {
                    forward();
                }
            }
        }
    }
}

// Shared wiring of `retry_when` / `repeat_when`: the source observer
// pushes triggers into the signal subject, the handler's control stream
// resubscribes (value) or terminates (terminal).
fn install_when<T, S>(
    source: Observable<T>,
    downstream: Arc<dyn Observer<T>>,
    control: Observable<S>,
    policy: RedoPolicy,
) where
    T: Send + 'static,
    S: Send + 'static,
{
    let control_handle = Arc::new(SerialDisposable::new());
    let state = RedoState::install(source, downstream, Some(control_handle.clone()));
    let observer: Arc<RedoObserver<T>> = Arc::new_cyclic(|this| RedoObserver {
        state: Arc::clone(&state),
        this: this.clone(),
        policy,
    });
    // The control side keeps the driver alive between attempts
    control.subscribe_observer(Arc::new(ControlObserver {
        redo: observer.clone(),
        handle: control_handle,
        _marker: std::marker::PhantomData,
    }));
    start(observer);
}

struct ControlObserver<T, S> {
    redo: Arc<RedoObserver<T>>,
    handle: Arc<SerialDisposable>,
    _marker: std::marker::PhantomData<fn() -> S>,
}

impl<T: Send + 'static, S: Send> Observer<S> for ControlObserver<T, S> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.handle.set(disposable);
    }

    fn on_next(&self, _signal: S) {
        self.redo.redo();
    }

    fn on_error(&self, error: RillError) {
        self.redo.terminate_error(error);
    }

    fn on_complete(&self) {
        self.redo.terminate_complete();
    }
}
