// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{Observable, PublishSubject, RillError};
use rill_test_utils::{TestObserver, TestScheduler};
use rill_time::{DebounceExt, SampleExt, ThrottleExt};
use std::sync::Arc;
use std::time::Duration;

fn subscribe<T: Send + Sync + 'static>(source: &Observable<T>) -> TestObserver<T> {
    let observer = TestObserver::new();
    source.subscribe_observer(Arc::new(observer.clone()));
    observer
}

const MS10: Duration = Duration::from_millis(10);

#[test]
fn test_debounce_emits_after_a_quiet_window() {
    // Arrange
    let scheduler = TestScheduler::new();
    let upstream = PublishSubject::new();
    let source = upstream.observable().debounce(MS10, Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    // Act: rapid burst, then silence
    upstream.next(1);
    scheduler.advance_by(Duration::from_millis(4));
    upstream.next(2);
    scheduler.advance_by(Duration::from_millis(4));
    upstream.next(3);
    scheduler.advance_by(MS10);

    // Assert: only the last of the burst survives
    observer.assert_values(&[3]);
}

#[test]
fn test_debounce_emits_each_isolated_value() {
    let scheduler = TestScheduler::new();
    let upstream = PublishSubject::new();
    let source = upstream.observable().debounce(MS10, Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    upstream.next(1);
    scheduler.advance_by(Duration::from_millis(15));
    upstream.next(2);
    scheduler.advance_by(Duration::from_millis(15));

    observer.assert_values(&[1, 2]);
}

#[test]
fn test_debounce_flushes_the_pending_value_on_completion() {
    let scheduler = TestScheduler::new();
    let upstream = PublishSubject::new();
    let source = upstream.observable().debounce(MS10, Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    upstream.next(9);
    upstream.complete();

    observer.assert_values(&[9]);
    observer.assert_completed();
}

#[test]
fn test_debounce_discards_the_pending_value_on_error() {
    let scheduler = TestScheduler::new();
    let upstream = PublishSubject::new();
    let source = upstream.observable().debounce(MS10, Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    upstream.next(9);
    upstream.error(RillError::stream_error("cut"));

    assert!(observer.values().is_empty());
    assert!(observer.error().is_some());
}

#[test]
fn test_sample_takes_the_latest_per_tick() {
    // Arrange
    let scheduler = TestScheduler::new();
    let upstream = PublishSubject::new();
    let source = upstream.observable().sample(MS10, Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    // Act
    upstream.next(1);
    upstream.next(2);
    scheduler.advance_by(MS10);
    // No fresh value in the second window
    scheduler.advance_by(MS10);
    upstream.next(3);
    scheduler.advance_by(MS10);

    // Assert: one value per tick that had news
    observer.assert_values(&[2, 3]);
}

#[test]
fn test_sample_completes_with_upstream() {
    let scheduler = TestScheduler::new();
    let upstream = PublishSubject::<i32>::new();
    let source = upstream.observable().sample(MS10, Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    upstream.complete();
    scheduler.advance_by(MS10);

    observer.assert_completed();
    assert!(observer.values().is_empty());
}

#[test]
fn test_throttle_first_keeps_the_opener_of_each_window() {
    // Arrange
    let scheduler = TestScheduler::new();
    let upstream = PublishSubject::new();
    let source = upstream
        .observable()
        .throttle_first(MS10, Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    // Act
    upstream.next(1);
    upstream.next(2);
    scheduler.advance_by(Duration::from_millis(5));
    upstream.next(3);
    scheduler.advance_by(Duration::from_millis(5));
    upstream.next(4);
    upstream.complete();

    // Assert: 1 opens the first window; 4 opens the next
    observer.assert_values(&[1, 4]);
    observer.assert_completed();
}

#[test]
fn test_throttle_last_is_an_alias_of_sample() {
    let scheduler = TestScheduler::new();
    let upstream = PublishSubject::new();
    let source = upstream
        .observable()
        .throttle_last(MS10, Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    upstream.next(1);
    upstream.next(2);
    scheduler.advance_by(MS10);

    observer.assert_values(&[2]);
}
