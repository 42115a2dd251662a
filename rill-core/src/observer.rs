// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::disposable::{Disposable, SubscriptionSlot};
use crate::{hooks, RillError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The four-callback sink of the subscription protocol.
///
/// A well-behaved producer honors, per consumer:
/// 1. `on_subscribe` is called exactly once, before any other callback.
/// 2. `on_next`/`on_error`/`on_complete` are never invoked concurrently.
/// 3. After `on_error` or `on_complete`, no further callback occurs.
/// 4. Disposing the delivered handle cancels pending work and
///    short-circuits in-flight emissions.
pub trait Observer<T>: Send + Sync {
    /// Delivers the cancellation handle for this subscription.
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>);

    /// Delivers the next value.
    fn on_next(&self, value: T);

    /// Terminates the subscription with a failure.
    fn on_error(&self, error: RillError);

    /// Terminates the subscription normally.
    fn on_complete(&self);
}

/// Closure-backed observer used by the `subscribe` convenience methods.
///
/// Doubles as the disposal handle returned to the caller. Terminal
/// signals arriving after termination are routed to the global hook,
/// late values are dropped.
pub struct CallbackObserver<T> {
    on_next: Box<dyn Fn(T) + Send + Sync>,
    on_error: Option<Box<dyn Fn(RillError) + Send + Sync>>,
    on_complete: Option<Box<dyn Fn() + Send + Sync>>,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T> CallbackObserver<T> {
    pub fn new(
        on_next: impl Fn(T) + Send + Sync + 'static,
        on_error: Option<Box<dyn Fn(RillError) + Send + Sync>>,
        on_complete: Option<Box<dyn Fn() + Send + Sync>>,
    ) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_error,
            on_complete,
            upstream: SubscriptionSlot::new(),
            done: AtomicBool::new(false),
        }
    }
}

impl<T: Send> Observer<T> for CallbackObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        (self.on_next)(value);
    }

    fn on_error(&self, error: RillError) {
        if self.done.swap(true, Ordering::AcqRel) {
            hooks::undeliverable(error);
            return;
        }
        match &self.on_error {
            Some(callback) => callback(error),
            None => hooks::undeliverable(error),
        }
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(callback) = &self.on_complete {
            callback();
        }
    }
}

impl<T> Disposable for CallbackObserver<T>
where
    T: Send,
{
    fn dispose(&self) {
        self.done.store(true, Ordering::Release);
        self.upstream.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.upstream.is_disposed()
    }
}
