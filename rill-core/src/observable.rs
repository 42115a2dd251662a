// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::disposable::Disposable;
use crate::observer::{CallbackObserver, Observer};
use crate::RillError;
use std::sync::Arc;

/// A push-based source of values.
///
/// An `Observable<T>` is anything that, handed an [`Observer`], begins
/// delivering notifications per the subscription protocol: the handle
/// first, then zero or more values, then at most one terminal.
///
/// Cloning is cheap and shares the definition, not a subscription —
/// every `subscribe` starts the producer anew (multicast operators are
/// the explicit exception).
///
/// # Example
///
/// ```
/// use rill_core::Observable;
///
/// let collected = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
/// let sink = collected.clone();
/// Observable::from_iter(1..=3).subscribe(move |v| sink.lock().push(v));
/// assert_eq!(*collected.lock(), vec![1, 2, 3]);
/// ```
pub struct Observable<T> {
    on_subscribe: Arc<dyn Fn(Arc<dyn Observer<T>>) + Send + Sync>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            on_subscribe: Arc::clone(&self.on_subscribe),
        }
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Defines a source from its raw subscribe action.
    ///
    /// The action is responsible for the full protocol, including the
    /// `on_subscribe` handshake. Prefer [`Observable::create`] for
    /// producers that want a guarded emitter.
    pub fn new(on_subscribe: impl Fn(Arc<dyn Observer<T>>) + Send + Sync + 'static) -> Self {
        Self {
            on_subscribe: Arc::new(on_subscribe),
        }
    }

    /// Subscribes a full observer.
    pub fn subscribe_observer(&self, observer: Arc<dyn Observer<T>>) {
        (self.on_subscribe)(observer);
    }

    /// Subscribes with a value callback only.
    ///
    /// Errors reaching this subscription are routed to the global hook.
    /// The returned handle cancels the subscription.
    pub fn subscribe(&self, on_next: impl Fn(T) + Send + Sync + 'static) -> Arc<dyn Disposable> {
        let observer = Arc::new(CallbackObserver::new(on_next, None, None));
        self.subscribe_observer(observer.clone());
        observer
    }

    /// Subscribes with value, error and completion callbacks.
    pub fn subscribe_all(
        &self,
        on_next: impl Fn(T) + Send + Sync + 'static,
        on_error: impl Fn(RillError) + Send + Sync + 'static,
        on_complete: impl Fn() + Send + Sync + 'static,
    ) -> Arc<dyn Disposable> {
        let observer = Arc::new(CallbackObserver::new(
            on_next,
            Some(Box::new(on_error)),
            Some(Box::new(on_complete)),
        ));
        self.subscribe_observer(observer.clone());
        observer
    }

    /// Builds a derived source from a consumer transformer.
    ///
    /// The transformer maps the downstream observer into the observer
    /// handed upstream; subscribing the result wraps and subscribes.
    /// Every operator in the engine is a lift. The transformer must
    /// uphold the protocol invariants even when it introduces
    /// concurrency — concurrent operators add explicit serialization.
    pub fn lift<R: Send + 'static>(
        &self,
        transform: impl Fn(Arc<dyn Observer<R>>) -> Arc<dyn Observer<T>> + Send + Sync + 'static,
    ) -> Observable<R> {
        let source = self.clone();
        Observable::new(move |downstream| {
            source.subscribe_observer(transform(downstream));
        })
    }
}
