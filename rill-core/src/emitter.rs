// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::disposable::{Disposable, SerialDisposable};
use crate::observer::Observer;
use crate::{hooks, Observable, RillError};
use std::sync::Arc;

/// Guarded producer handle for [`Observable::create`].
///
/// The emitter enforces the protocol on behalf of an arbitrary
/// asynchronous producer: emissions after a terminal or after disposal
/// are dropped, a second terminal goes to the global hook, and the
/// producer may attach a resource through [`set_disposable`] that is
/// released together with the subscription.
///
/// [`set_disposable`]: Emitter::set_disposable
pub struct Emitter<T> {
    inner: Arc<EmitterInner<T>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EmitterInner<T> {
    downstream: Arc<dyn Observer<T>>,
    // Terminal and disposal share one state: a terminated emitter is a
    // disposed emitter.
    resource: SerialDisposable,
}

impl<T: Send + 'static> Emitter<T> {
    fn new(downstream: Arc<dyn Observer<T>>) -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                downstream,
                resource: SerialDisposable::new(),
            }),
        }
    }

    /// Emits a value, unless the subscription has ended.
    pub fn next(&self, value: T) {
        if !self.is_disposed() {
            self.inner.downstream.on_next(value);
        }
    }

    /// Terminates with an error.
    ///
    /// If the subscription already ended the error is undeliverable and
    /// goes to the global hook; see [`try_error`](Self::try_error) to
    /// observe that outcome.
    pub fn error(&self, error: RillError) {
        let _ = self.try_error(error);
    }

    /// Terminates with an error, reporting whether it was delivered.
    pub fn try_error(&self, error: RillError) -> bool {
        if self.is_disposed() {
            hooks::undeliverable(error);
            return false;
        }
        self.inner.downstream.on_error(error);
        self.inner.resource.dispose();
        true
    }

    /// Terminates normally.
    pub fn complete(&self) {
        if !self.is_disposed() {
            self.inner.downstream.on_complete();
            self.inner.resource.dispose();
        }
    }

    /// Attaches a resource released when the subscription ends, by
    /// either side. Replaces (and releases) any prior resource.
    pub fn set_disposable(&self, disposable: Arc<dyn Disposable>) {
        self.inner.resource.set(disposable);
    }

    /// Whether the consumer cancelled or a terminal was already sent.
    pub fn is_disposed(&self) -> bool {
        self.inner.resource.is_disposed()
    }
}

impl<T> Disposable for Emitter<T> {
    fn dispose(&self) {
        self.inner.resource.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner.resource.is_disposed()
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Bridges an arbitrary push-style producer into a source.
    ///
    /// The producer runs once per subscription and receives an
    /// [`Emitter`] that it may use from any thread, and may outlive the
    /// call by cloning.
    ///
    /// # Example
    ///
    /// ```
    /// use rill_core::Observable;
    ///
    /// let source = Observable::create(|emitter| {
    ///     emitter.next(1);
    ///     emitter.next(2);
    ///     emitter.complete();
    /// });
    /// let seen = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    /// let sink = seen.clone();
    /// source.subscribe(move |v| {
    ///     sink.fetch_add(v, std::sync::atomic::Ordering::SeqCst);
    /// });
    /// assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 3);
    /// ```
    pub fn create(producer: impl Fn(Emitter<T>) + Send + Sync + 'static) -> Self {
        Observable::new(move |downstream| {
            let emitter = Emitter::new(downstream.clone());
            downstream.on_subscribe(Arc::new(emitter.clone()));
            producer(emitter);
        })
    }
}
