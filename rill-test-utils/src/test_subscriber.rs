// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{RillError, Signal};
use rill_flow::{Subscriber, Subscription};
use std::sync::Arc;

/// A recording subscriber with manual demand control.
///
/// Call [`request`](Self::request) to grant credit; the recording side
/// mirrors [`TestObserver`](crate::TestObserver).
pub struct TestSubscriber<T> {
    inner: Arc<TestSubscriberInner<T>>,
}

impl<T> Clone for TestSubscriber<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct TestSubscriberInner<T> {
    signals: Mutex<Vec<Signal<T>>>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    initial_request: u64,
}

impl<T> Default for TestSubscriber<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TestSubscriber<T> {
    /// A subscriber that requests nothing until told to.
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial_request(0)
    }

    /// A subscriber that requests `n` as soon as it is subscribed.
    #[must_use]
    pub fn with_initial_request(n: u64) -> Self {
        Self {
            inner: Arc::new(TestSubscriberInner {
                signals: Mutex::new(Vec::new()),
                subscription: Mutex::new(None),
                initial_request: n,
            }),
        }
    }

    /// Grants `n` more emissions.
    pub fn request(&self, n: u64) {
        let subscription = self.inner.subscription.lock().clone();
        if let Some(subscription) = subscription {
            subscription.request(n);
        }
    }

    /// Cancels the subscription.
    pub fn cancel(&self) {
        let subscription = self.inner.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }

    #[must_use]
    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner
            .signals
            .lock()
            .iter()
            .filter_map(|signal| signal.value().cloned())
            .collect()
    }

    #[must_use]
    pub fn error(&self) -> Option<RillError> {
        self.inner
            .signals
            .lock()
            .iter()
            .find_map(|signal| signal.error().cloned())
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.signals.lock().iter().any(Signal::is_complete)
    }

    /// Asserts the exact value sequence received so far.
    pub fn assert_values(&self, expected: &[T])
    where
        T: PartialEq + std::fmt::Debug + Clone,
    {
        assert_eq!(self.values(), expected, "unexpected value sequence");
    }
}

impl<T: Send + Sync> Subscriber<T> for TestSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.inner.subscription.lock() = Some(subscription.clone());
        if self.inner.initial_request > 0 {
            subscription.request(self.inner.initial_request);
        }
    }

    fn on_next(&self, value: T) {
        self.inner.signals.lock().push(Signal::Next(value));
    }

    fn on_error(&self, error: RillError) {
        self.inner.signals.lock().push(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.inner.signals.lock().push(Signal::Complete);
    }
}
