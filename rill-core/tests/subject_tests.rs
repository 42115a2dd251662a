// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{
    Disposable, Observer, OverflowPolicy, PublishSubject, RillError, Signal, UnicastSubject,
};
use std::sync::Arc;

struct Recorder<T> {
    signals: Mutex<Vec<Signal<T>>>,
    handle: Mutex<Option<Arc<dyn Disposable>>>,
}

impl<T> Recorder<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            signals: Mutex::new(Vec::new()),
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

    fn dispose(&self) {
        if let Some(handle) = self.handle.lock().as_ref() {
            handle.dispose();
        }
    }
}

impl<T: Send + Sync> Observer<T> for Recorder<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
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
fn test_publish_subject_fans_out_to_all_subscribers() {
    // Arrange
    let subject = PublishSubject::new();
    let first = Recorder::new();
    let second = Recorder::new();
    subject.observable().subscribe_observer(first.clone());
    subject.observable().subscribe_observer(second.clone());

    // Act
    subject.next(1);
    subject.next(2);
    subject.complete();

    // Assert
    assert_eq!(first.values(), vec![1, 2]);
    assert_eq!(second.values(), vec![1, 2]);
    assert!(first.completed() && second.completed());
}

#[test]
fn test_publish_subject_late_subscriber_misses_earlier_values() {
    let subject = PublishSubject::new();
    subject.next(1);

    let late = Recorder::new();
    subject.observable().subscribe_observer(late.clone());
    subject.next(2);
    subject.complete();

    assert_eq!(late.values(), vec![2]);
}

#[test]
fn test_publish_subject_latches_terminal_for_future_subscribers() {
    // Arrange
    let subject = PublishSubject::<i32>::new();
    subject.error(RillError::stream_error("broken"));

    // Act
    let late = Recorder::new();
    subject.observable().subscribe_observer(late.clone());

    // Assert
    assert!(late.values().is_empty());
    assert!(late.error().is_some());
}

#[test]
fn test_publish_subject_drops_disposed_subscribers() {
    // Arrange
    let subject = PublishSubject::new();
    let leaver = Recorder::new();
    let stayer = Recorder::new();
    subject.observable().subscribe_observer(leaver.clone());
    subject.observable().subscribe_observer(stayer.clone());
    assert_eq!(subject.subscriber_count(), 2);

    // Act
    subject.next(1);
    leaver.dispose();
    subject.next(2);

    // Assert
    assert_eq!(leaver.values(), vec![1]);
    assert_eq!(stayer.values(), vec![1, 2]);
    assert_eq!(subject.subscriber_count(), 1);
}

#[test]
fn test_unicast_replays_backlog_to_its_single_consumer() {
    // Arrange
    let subject = UnicastSubject::new();
    subject.push(1);
    subject.push(2);

    // Act
    let consumer = Recorder::new();
    subject.observable().subscribe_observer(consumer.clone());
    subject.push(3);
    subject.complete();

    // Assert
    assert_eq!(consumer.values(), vec![1, 2, 3]);
    assert!(consumer.completed());
}

#[test]
fn test_unicast_rejects_a_second_consumer() {
    let subject = UnicastSubject::<i32>::new();
    let first = Recorder::new();
    let second = Recorder::new();
    subject.observable().subscribe_observer(first.clone());
    subject.observable().subscribe_observer(second.clone());

    let error = second.error().expect("second consumer must fail");
    assert!(error.is_protocol_violation());
}

#[test]
fn test_unicast_abandon_fires_callback_and_discards() {
    // Arrange
    let subject = UnicastSubject::new();
    let abandoned = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = abandoned.clone();
    subject.set_on_abandon(move || flag.store(true, std::sync::atomic::Ordering::SeqCst));

    let consumer = Recorder::new();
    subject.observable().subscribe_observer(consumer.clone());

    // Act
    subject.push(1);
    consumer.dispose();
    subject.push(2);

    // Assert
    assert!(abandoned.load(std::sync::atomic::Ordering::SeqCst));
    assert_eq!(consumer.values(), vec![1]);
}

#[test]
fn test_bounded_unicast_error_policy_poisons_the_subject() {
    // Arrange: no consumer attached, capacity 2
    let subject = UnicastSubject::bounded(2, OverflowPolicy::Error);
    subject.push(1);
    subject.push(2);

    // Act
    let overflow = subject.try_push(3);

    // Assert
    assert!(overflow.is_err());
    let consumer = Recorder::new();
    subject.observable().subscribe_observer(consumer.clone());
    assert_eq!(consumer.values(), vec![1, 2]);
    assert!(consumer.error().is_some_and(|e| e.is_overflow()));
}

#[test]
fn test_bounded_unicast_drop_newest_discards_silently() {
    let subject = UnicastSubject::bounded(1, OverflowPolicy::DropNewest);
    subject.push(1);
    subject.push(2);
    subject.complete();

    let consumer = Recorder::new();
    subject.observable().subscribe_observer(consumer.clone());
    assert_eq!(consumer.values(), vec![1]);
    assert!(consumer.completed());
}
