// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{Observable, PublishSubject, RillError};
use rill_flow::{BackpressureStrategy, Flowable, ToFlowableExt};
use rill_test_utils::{TestObserver, TestSubscriber};
use std::sync::Arc;

#[test]
fn test_from_iter_waits_for_demand() {
    // Arrange
    let flow = Flowable::from_iter(vec![1, 2, 3, 4, 5]);
    let subscriber = TestSubscriber::new();

    // Act
    flow.subscribe_subscriber(Arc::new(subscriber.clone()));

    // Assert: nothing without credit
    subscriber.assert_values(&[]);

    subscriber.request(2);
    subscriber.assert_values(&[1, 2]);

    subscriber.request(10);
    subscriber.assert_values(&[1, 2, 3, 4, 5]);
    assert!(subscriber.is_completed());
}

#[test]
fn test_from_iter_cancel_stops_production() {
    let flow = Flowable::from_iter(vec![1, 2, 3]);
    let subscriber = TestSubscriber::new();
    flow.subscribe_subscriber(Arc::new(subscriber.clone()));

    subscriber.request(1);
    subscriber.cancel();
    subscriber.request(10);

    subscriber.assert_values(&[1]);
    assert!(!subscriber.is_completed());
}

#[test]
fn test_request_zero_is_a_protocol_violation() {
    let flow = Flowable::from_iter(vec![1]);
    let subscriber = TestSubscriber::new();
    flow.subscribe_subscriber(Arc::new(subscriber.clone()));

    subscriber.request(0);

    assert!(subscriber
        .error()
        .is_some_and(|e| e.is_protocol_violation()));
}

#[test]
fn test_buffer_strategy_holds_the_backlog() {
    // Arrange: the whole synchronous source lands in the buffer
    let flow = Observable::from_iter(vec![1, 2, 3, 4]).to_flowable(BackpressureStrategy::Buffer);
    let subscriber = TestSubscriber::new();

    // Act
    flow.subscribe_subscriber(Arc::new(subscriber.clone()));
    subscriber.assert_values(&[]);
    subscriber.request(3);

    // Assert: backlog drains per demand, terminal after the backlog
    subscriber.assert_values(&[1, 2, 3]);
    assert!(!subscriber.is_completed());
    subscriber.request(1);
    subscriber.assert_values(&[1, 2, 3, 4]);
    assert!(subscriber.is_completed());
}

#[test]
fn test_drop_strategy_discards_undemanded_emissions() {
    // Arrange: credit for two, the rest arrives unrequested
    let flow = Observable::from_iter(vec![1, 2, 3, 4, 5]).to_flowable(BackpressureStrategy::Drop);
    let subscriber = TestSubscriber::with_initial_request(2);

    // Act
    flow.subscribe_subscriber(Arc::new(subscriber.clone()));

    // Assert
    subscriber.assert_values(&[1, 2]);
    assert!(subscriber.is_completed());
}

#[test]
fn test_latest_strategy_keeps_the_most_recent() {
    // Arrange
    let upstream = PublishSubject::new();
    let flow = upstream
        .observable()
        .to_flowable(BackpressureStrategy::Latest);
    let subscriber = TestSubscriber::new();
    flow.subscribe_subscriber(Arc::new(subscriber.clone()));

    // Act: three emissions race ahead of demand
    upstream.next(1);
    upstream.next(2);
    upstream.next(3);
    subscriber.request(1);
    upstream.complete();

    // Assert
    subscriber.assert_values(&[3]);
    assert!(subscriber.is_completed());
}

#[test]
fn test_error_strategy_fails_on_overflow() {
    let flow = Observable::from_iter(vec![1, 2]).to_flowable(BackpressureStrategy::Error);
    let subscriber = TestSubscriber::new();
    flow.subscribe_subscriber(Arc::new(subscriber.clone()));

    assert!(subscriber.error().is_some_and(|e| e.is_overflow()));
}

#[test]
fn test_error_strategy_passes_within_demand() {
    let flow = Observable::from_iter(vec![1, 2]).to_flowable(BackpressureStrategy::Error);
    let subscriber = TestSubscriber::with_initial_request(10);
    flow.subscribe_subscriber(Arc::new(subscriber.clone()));

    subscriber.assert_values(&[1, 2]);
    assert!(subscriber.is_completed());
}

#[test]
fn test_into_observable_requests_unbounded_demand() {
    // Arrange
    let flow = Flowable::from_iter(vec![1, 2, 3]);
    let observer = TestObserver::new();

    // Act
    flow.into_observable()
        .subscribe_observer(Arc::new(observer.clone()));

    // Assert
    observer.assert_values(&[1, 2, 3]);
    observer.assert_completed();
}

#[test]
fn test_round_trip_through_both_bridges() {
    let source = Observable::from_iter(vec![10, 20])
        .to_flowable(BackpressureStrategy::Buffer)
        .into_observable();
    let observer = TestObserver::new();
    source.subscribe_observer(Arc::new(observer.clone()));

    observer.assert_values(&[10, 20]);
    observer.assert_completed();
}

#[test]
fn test_flowable_error_passes_through_the_bridge() {
    let flow = Observable::<i32>::error(RillError::stream_error("boom"))
        .to_flowable(BackpressureStrategy::Buffer);
    let subscriber = TestSubscriber::new();
    flow.subscribe_subscriber(Arc::new(subscriber.clone()));

    // Terminals need no demand
    assert!(subscriber.error().is_some());
}
