// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{
    Disposable, Observable, Observer, Result, RillError, Signal, SubscriptionSlot,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// Minimal recording observer for core-level tests; the full-featured
// one lives in rill-test-utils, which this crate cannot depend on.
struct Recorder<T> {
    signals: Mutex<Vec<Signal<T>>>,
    handshakes: AtomicUsize,
    handle: Mutex<Option<Arc<dyn Disposable>>>,
}

impl<T> Recorder<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            signals: Mutex::new(Vec::new()),
            handshakes: AtomicUsize::new(0),
            handle: Mutex::new(None),
        })
    }

    fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.signals
            .lock()
            .iter()
            .filter_map(|s| s.value().cloned())
            .collect()
    }

    fn completed(&self) -> bool {
        self.signals.lock().iter().any(Signal::is_complete)
    }

    fn error(&self) -> Option<RillError> {
        self.signals.lock().iter().find_map(|s| s.error().cloned())
    }
}

impl<T: Send + Sync> Observer<T> for Recorder<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        *self.handle.lock() = Some(disposable);
    }

    fn on_next(&self, value: T) {
        self.signals.lock().push(Signal::Next(value));
    }

    fn on_error(&self, error: RillError) {
        self.signals.lock().push(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.signals.lock().push(Signal::Complete);
    }
}

#[test]
fn test_from_iter_emits_in_order_then_completes() {
    // Arrange
    let recorder = Recorder::new();

    // Act
    Observable::from_iter(vec![1, 2, 3]).subscribe_observer(recorder.clone());

    // Assert
    assert_eq!(recorder.handshakes.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.values(), vec![1, 2, 3]);
    assert!(recorder.completed());
}

#[test]
fn test_range_spans_start_and_count() {
    let recorder = Recorder::new();
    Observable::range(-1, 4).subscribe_observer(recorder.clone());
    assert_eq!(recorder.values(), vec![-1, 0, 1, 2]);
    assert!(recorder.completed());
}

#[test]
fn test_handshake_precedes_every_other_callback() {
    // Arrange
    let out_of_order = Arc::new(AtomicBool::new(false));
    let flag = out_of_order.clone();

    struct OrderProbe {
        subscribed: AtomicBool,
        out_of_order: Arc<AtomicBool>,
    }
    impl Observer<i32> for OrderProbe {
        fn on_subscribe(&self, _d: Arc<dyn Disposable>) {
            self.subscribed.store(true, Ordering::SeqCst);
        }
        fn on_next(&self, _value: i32) {
            if !self.subscribed.load(Ordering::SeqCst) {
                self.out_of_order.store(true, Ordering::SeqCst);
            }
        }
        fn on_error(&self, _error: RillError) {}
        fn on_complete(&self) {
            if !self.subscribed.load(Ordering::SeqCst) {
                self.out_of_order.store(true, Ordering::SeqCst);
            }
        }
    }

    // Act
    Observable::from_iter(vec![1]).subscribe_observer(Arc::new(OrderProbe {
        subscribed: AtomicBool::new(false),
        out_of_order: flag,
    }));

    // Assert
    assert!(!out_of_order.load(Ordering::SeqCst));
}

#[test]
fn test_disposing_mid_emission_stops_the_sequence() {
    // Arrange: an observer that cancels itself after the second value
    struct CancelAfterTwo {
        seen: AtomicUsize,
        handle: Mutex<Option<Arc<dyn Disposable>>>,
        later: Arc<AtomicUsize>,
    }
    impl Observer<i64> for CancelAfterTwo {
        fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
            *self.handle.lock() = Some(disposable);
        }
        fn on_next(&self, _value: i64) {
            let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
            self.later.fetch_add(1, Ordering::SeqCst);
            if seen == 2 {
                if let Some(handle) = self.handle.lock().as_ref() {
                    handle.dispose();
                }
            }
        }
        fn on_error(&self, _error: RillError) {}
        fn on_complete(&self) {
            // Must never run once disposed
            self.later.fetch_add(100, Ordering::SeqCst);
        }
    }

    let delivered = Arc::new(AtomicUsize::new(0));

    // Act
    Observable::range(0, 1_000).subscribe_observer(Arc::new(CancelAfterTwo {
        seen: AtomicUsize::new(0),
        handle: Mutex::new(None),
        later: delivered.clone(),
    }));

    // Assert: two values, no completion
    assert_eq!(delivered.load(Ordering::SeqCst), 2);
}

#[test]
fn test_create_routes_emitter_calls() {
    // Arrange
    let recorder = Recorder::new();
    let source = Observable::create(|emitter| {
        emitter.next(7);
        emitter.next(8);
        emitter.complete();
        // Ignored after the terminal
        emitter.next(9);
    });

    // Act
    source.subscribe_observer(recorder.clone());

    // Assert
    assert_eq!(recorder.values(), vec![7, 8]);
    assert!(recorder.completed());
}

#[test]
fn test_create_reports_error_after_terminal_to_hook() {
    // Arrange
    let dropped = Arc::new(AtomicUsize::new(0));
    let seen = dropped.clone();
    rill_core::hooks::set_undeliverable_handler(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let source: Observable<i32> = Observable::create(|emitter| {
        emitter.complete();
        emitter.error(RillError::stream_error("late"));
    });

    // Act
    source.subscribe_observer(Recorder::new());

    // Assert
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
    rill_core::hooks::reset_undeliverable_handler();
}

#[test]
fn test_from_callable_routes_failure_into_on_error() {
    let recorder = Recorder::new();
    let source: Observable<i32> =
        Observable::from_callable(|| -> Result<i32> { Err(RillError::stream_error("boom")) });
    source.subscribe_observer(recorder.clone());

    assert!(recorder.values().is_empty());
    assert!(recorder.error().is_some());
}

#[test]
fn test_defer_builds_a_fresh_source_per_subscription() {
    // Arrange
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let source = Observable::defer(move || {
        let build = counter.fetch_add(1, Ordering::SeqCst) as i32;
        Observable::just(build)
    });

    // Act
    let first = Recorder::new();
    let second = Recorder::new();
    source.subscribe_observer(first.clone());
    source.subscribe_observer(second.clone());

    // Assert
    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert_eq!(first.values(), vec![0]);
    assert_eq!(second.values(), vec![1]);
}

#[test]
fn test_using_eager_release_runs_before_completion() {
    // Arrange
    let order = Arc::new(Mutex::new(Vec::new()));
    let release_order = order.clone();
    let complete_order = order.clone();

    struct OrderedObserver {
        order: Arc<Mutex<Vec<&'static str>>>,
    }
    impl Observer<i32> for OrderedObserver {
        fn on_subscribe(&self, _d: Arc<dyn Disposable>) {}
        fn on_next(&self, _value: i32) {}
        fn on_error(&self, _error: RillError) {}
        fn on_complete(&self) {
            self.order.lock().push("complete");
        }
    }

    let source = Observable::using(
        || Ok(41),
        |resource| Observable::just(*resource + 1),
        move |_resource| {
            release_order.lock().push("release");
            Ok(())
        },
        true,
    );

    // Act
    source.subscribe_observer(Arc::new(OrderedObserver {
        order: complete_order,
    }));

    // Assert
    assert_eq!(*order.lock(), vec!["release", "complete"]);
}

#[test]
fn test_using_lazy_release_runs_after_terminal() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let release_order = order.clone();
    let complete_order = order.clone();

    struct OrderedObserver {
        order: Arc<Mutex<Vec<&'static str>>>,
    }
    impl Observer<i32> for OrderedObserver {
        fn on_subscribe(&self, _d: Arc<dyn Disposable>) {}
        fn on_next(&self, _value: i32) {}
        fn on_error(&self, _error: RillError) {}
        fn on_complete(&self) {
            self.order.lock().push("complete");
        }
    }

    Observable::using(
        || Ok(1),
        |_| Observable::just(1),
        move |_| {
            release_order.lock().push("release");
            Ok(())
        },
        false,
    )
    .subscribe_observer(Arc::new(OrderedObserver {
        order: complete_order,
    }));

    assert_eq!(*order.lock(), vec!["complete", "release"]);
}

#[test]
fn test_using_eager_release_failure_replaces_completion() {
    let recorder = Recorder::new();
    Observable::using(
        || Ok(1),
        |_| Observable::just(1),
        |_| Err(RillError::cleanup_error("leaked")),
        true,
    )
    .subscribe_observer(recorder.clone());

    assert!(!recorder.completed());
    assert!(recorder.error().is_some());
}

#[test]
fn test_from_future_is_single_shot() {
    // Arrange
    let source = Observable::from_future(async { Ok(21) });

    // Act
    let first = Recorder::new();
    let second = Recorder::new();
    source.subscribe_observer(first.clone());
    source.subscribe_observer(second.clone());

    // Assert
    assert_eq!(first.values(), vec![21]);
    assert!(first.completed());
    assert!(second.error().is_some());
}

#[test]
fn test_lift_wraps_the_downstream_consumer() {
    // Arrange: a doubling operator expressed directly through lift
    struct Doubler {
        downstream: Arc<dyn Observer<i32>>,
        upstream: SubscriptionSlot,
    }
    impl Observer<i32> for Doubler {
        fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
            if self.upstream.try_set(disposable.clone()) {
                self.downstream.on_subscribe(disposable);
            }
        }
        fn on_next(&self, value: i32) {
            self.downstream.on_next(value * 2);
        }
        fn on_error(&self, error: RillError) {
            self.downstream.on_error(error);
        }
        fn on_complete(&self) {
            self.downstream.on_complete();
        }
    }

    let recorder = Recorder::new();

    // Act
    Observable::from_iter(vec![1, 2, 3])
        .lift(|downstream| {
            Arc::new(Doubler {
                downstream,
                upstream: SubscriptionSlot::new(),
            }) as Arc<dyn Observer<i32>>
        })
        .subscribe_observer(recorder.clone());

    // Assert
    assert_eq!(recorder.values(), vec![2, 4, 6]);
    assert!(recorder.completed());
}
