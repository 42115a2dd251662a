// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::{Condvar, Mutex};
use rill_core::{Disposable, Observer, RillError, Signal};
use std::sync::Arc;
use std::time::Duration;

/// A recording observer with latch-based waiting.
///
/// Records every callback, keeps the disposal handle from the
/// handshake, and lets tests block until a terminal or a value count
/// arrives. Cloning shares the recording.
///
/// # Example
///
/// ```
/// use rill_core::Observable;
/// use rill_test_utils::TestObserver;
/// use std::sync::Arc;
///
/// let observer = TestObserver::new();
/// Observable::from_iter(vec![1, 2, 3]).subscribe_observer(Arc::new(observer.clone()));
/// observer.assert_values(&[1, 2, 3]);
/// observer.assert_completed();
/// ```
pub struct TestObserver<T> {
    inner: Arc<TestObserverInner<T>>,
}

impl<T> Clone for TestObserver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct TestObserverInner<T> {
    recorded: Mutex<Recorded<T>>,
    changed: Condvar,
}

struct Recorded<T> {
    signals: Vec<Signal<T>>,
    handle: Option<Arc<dyn Disposable>>,
    subscribe_calls: usize,
    terminated: bool,
}

impl<T> Default for TestObserver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TestObserver<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TestObserverInner {
                recorded: Mutex::new(Recorded {
                    signals: Vec::new(),
                    handle: None,
                    subscribe_calls: 0,
                    terminated: false,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    /// How many times `on_subscribe` was invoked.
    #[must_use]
    pub fn subscribe_count(&self) -> usize {
        self.inner.recorded.lock().subscribe_calls
    }

    /// The recorded values, in arrival order.
    #[must_use]
    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner
            .recorded
            .lock()
            .signals
            .iter()
            .filter_map(|signal| signal.value().cloned())
            .collect()
    }

    /// Number of values received so far.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.inner
            .recorded
            .lock()
            .signals
            .iter()
            .filter(|signal| signal.is_next())
            .count()
    }

    /// The terminal error, if the stream failed.
    #[must_use]
    pub fn error(&self) -> Option<RillError> {
        self.inner
            .recorded
            .lock()
            .signals
            .iter()
            .find_map(|signal| signal.error().cloned())
    }

    /// Whether `on_complete` was received.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner
            .recorded
            .lock()
            .signals
            .iter()
            .any(Signal::is_complete)
    }

    /// Whether any terminal was received.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.recorded.lock().terminated
    }

    /// Disposes the handle received in the handshake.
    pub fn dispose(&self) {
        let handle = self.inner.recorded.lock().handle.clone();
        if let Some(handle) = handle {
            handle.dispose();
        }
    }

    /// Blocks until a terminal arrives. Returns `false` on timeout.
    pub fn await_terminal(&self, timeout: Duration) -> bool {
        let mut recorded = self.inner.recorded.lock();
        if recorded.terminated {
            return true;
        }
        !self
            .inner
            .changed
            .wait_while_for(&mut recorded, |r| !r.terminated, timeout)
            .timed_out()
    }

    /// Blocks until at least `count` values arrived. Returns `false` on
    /// timeout.
    pub fn await_values(&self, count: usize, timeout: Duration) -> bool {
        let mut recorded = self.inner.recorded.lock();
        let reached = |r: &mut Recorded<T>| r.signals.iter().filter(|s| s.is_next()).count() >= count;
        if reached(&mut recorded) {
            return true;
        }
        !self
            .inner
            .changed
            .wait_while_for(&mut recorded, |r| !reached(r), timeout)
            .timed_out()
    }

    /// Asserts the exact value sequence received so far.
    pub fn assert_values(&self, expected: &[T])
    where
        T: PartialEq + std::fmt::Debug + Clone,
    {
        assert_eq!(self.values(), expected, "unexpected value sequence");
    }

    /// Asserts a normal completion and no error.
    pub fn assert_completed(&self) {
        assert!(self.is_completed(), "expected completion");
        assert!(self.error().is_none(), "expected no error");
    }

    /// Asserts that no terminal was received.
    pub fn assert_not_terminated(&self) {
        assert!(!self.is_terminated(), "expected a live subscription");
    }

    /// Asserts an error terminal matching the predicate.
    pub fn assert_error(&self, predicate: impl Fn(&RillError) -> bool) {
        match self.error() {
            Some(error) => assert!(predicate(&error), "unexpected error: {error}"),
            None => panic!("expected an error terminal"),
        }
    }

    fn record(&self, signal: Signal<T>) {
        let mut recorded = self.inner.recorded.lock();
        if signal.is_terminal() {
            recorded.terminated = true;
        }
        recorded.signals.push(signal);
        self.inner.changed.notify_all();
    }
}

impl<T: Send + Sync> Observer<T> for TestObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        let mut recorded = self.inner.recorded.lock();
        recorded.subscribe_calls += 1;
        recorded.handle = Some(disposable);
        self.inner.changed.notify_all();
    }

    fn on_next(&self, value: T) {
        self.record(Signal::Next(value));
    }

    fn on_error(&self, error: RillError) {
        self.record(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.record(Signal::Complete);
    }
}
