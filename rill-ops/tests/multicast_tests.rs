// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{Observable, PublishSubject};
use rill_ops::{MulticastExt, TapExt};
use rill_test_utils::TestObserver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn subscribe<T: Send + Sync + 'static>(source: &Observable<T>) -> TestObserver<T> {
    let observer = TestObserver::new();
    source.subscribe_observer(Arc::new(observer.clone()));
    observer
}

#[test]
fn test_publish_emits_nothing_before_connect() {
    // Arrange
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let probe = subscriptions.clone();
    let connectable = Observable::from_iter(vec![1, 2, 3])
        .do_on_subscribe(move || {
            probe.fetch_add(1, Ordering::SeqCst);
        })
        .publish();
    let observer = subscribe(&connectable.observable());

    // Assert: registration alone must not touch the upstream
    assert_eq!(subscriptions.load(Ordering::SeqCst), 0);
    observer.assert_values(&[]);

    // Act
    connectable.connect();

    // Assert
    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
    observer.assert_values(&[1, 2, 3]);
    observer.assert_completed();
}

#[test]
fn test_publish_latches_the_terminal_for_late_subscribers() {
    let connectable = Observable::from_iter(vec![1]).publish();
    connectable.connect();

    let late = subscribe(&connectable.observable());
    late.assert_values(&[]);
    late.assert_completed();
}

#[test]
fn test_publish_fans_out_live_emissions() {
    // Arrange: a hot upstream driven by hand
    let upstream = PublishSubject::<i32>::new();
    let connectable = upstream.observable().publish();
    connectable.connect();

    let first = subscribe(&connectable.observable());
    upstream.next(1);
    let second = subscribe(&connectable.observable());
    upstream.next(2);
    upstream.complete();

    // Assert: the late subscriber missed the first emission
    first.assert_values(&[1, 2]);
    second.assert_values(&[2]);
    first.assert_completed();
    second.assert_completed();
}

#[test]
fn test_replay_bounded_delivers_the_retained_window() {
    // just(1,2,3).replay(2): a subscriber arriving after completion
    // sees the last two values
    let connectable = Observable::from_iter(vec![1, 2, 3]).replay_bounded(2);
    connectable.connect();

    let late = subscribe(&connectable.observable());
    late.assert_values(&[2, 3]);
    late.assert_completed();
}

#[test]
fn test_replay_unbounded_hands_full_history_then_live() {
    let upstream = PublishSubject::<i32>::new();
    let connectable = upstream.observable().replay();
    connectable.connect();

    upstream.next(1);
    upstream.next(2);
    let observer = subscribe(&connectable.observable());
    observer.assert_values(&[1, 2]);

    upstream.next(3);
    observer.assert_values(&[1, 2, 3]);
}

#[test]
fn test_share_connects_once_for_many_subscribers() {
    // Arrange
    let upstream_subscribes = Arc::new(AtomicUsize::new(0));
    let probe = upstream_subscribes.clone();
    let upstream = PublishSubject::<i32>::new();
    let shared = upstream
        .observable()
        .do_on_subscribe(move || {
            probe.fetch_add(1, Ordering::SeqCst);
        })
        .share();

    // Act
    let first = subscribe(&shared);
    let second = subscribe(&shared);
    upstream.next(5);

    // Assert
    assert_eq!(upstream_subscribes.load(Ordering::SeqCst), 1);
    first.assert_values(&[5]);
    second.assert_values(&[5]);
}

#[test]
fn test_share_disposes_upstream_when_the_last_subscriber_leaves() {
    // Arrange
    let disposals = Arc::new(AtomicUsize::new(0));
    let probe = disposals.clone();
    let upstream = PublishSubject::<i32>::new();
    let shared = upstream
        .observable()
        .do_on_dispose(move || {
            probe.fetch_add(1, Ordering::SeqCst);
        })
        .share();

    let first = subscribe(&shared);
    let second = subscribe(&shared);

    // Act
    first.dispose();
    assert_eq!(disposals.load(Ordering::SeqCst), 0);
    second.dispose();

    // Assert: the zero transition disconnects exactly once
    assert_eq!(disposals.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cache_connects_on_first_subscription_and_replays() {
    // Arrange
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let probe = subscriptions.clone();
    let cached = Observable::from_iter(vec![1, 2])
        .do_on_subscribe(move || {
            probe.fetch_add(1, Ordering::SeqCst);
        })
        .cache();

    // Act
    let first = subscribe(&cached);
    let second = subscribe(&cached);

    // Assert: one upstream run, both see everything
    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
    first.assert_values(&[1, 2]);
    second.assert_values(&[1, 2]);
    first.assert_completed();
    second.assert_completed();
}
