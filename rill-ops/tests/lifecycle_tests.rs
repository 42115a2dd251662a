// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{Observable, PublishSubject};
use rill_ops::{ObserveOnExt, SubscribeOnExt, UnsubscribeOnExt};
use rill_scheduler::Schedulers;
use rill_test_utils::TestObserver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::ThreadId;
use std::time::Duration;

fn subscribe<T: Send + Sync + 'static>(source: &Observable<T>) -> TestObserver<T> {
    let observer = TestObserver::new();
    source.subscribe_observer(Arc::new(observer.clone()));
    observer
}

#[test]
fn test_observe_on_preserves_order_and_terminal_position() {
    // Arrange
    let source = Observable::range(0, 50).observe_on(Schedulers::computation());

    // Act
    let observer = subscribe(&source);
    assert!(observer.await_terminal(Duration::from_secs(5)));

    // Assert
    let expected: Vec<i64> = (0..50).collect();
    observer.assert_values(&expected);
    observer.assert_completed();
}

#[test]
fn test_observe_on_delivers_on_a_worker_thread() {
    // Arrange
    let (sender, receiver) = mpsc::channel::<ThreadId>();
    let source = Observable::just(1).observe_on(Schedulers::single());

    // Act
    let probe = sender.clone();
    source.subscribe(move |_| {
        let _ = probe.send(std::thread::current().id());
    });

    // Assert
    let delivery_thread = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("value must be delivered");
    assert_ne!(delivery_thread, std::thread::current().id());
}

#[test]
fn test_observe_on_dispose_stops_pending_deliveries() {
    // Arrange: a hot source queuing faster than anyone drains
    let upstream = PublishSubject::<i32>::new();
    let source = upstream.observable().observe_on(Schedulers::single());
    let observer = subscribe(&source);

    // Act
    upstream.next(1);
    assert!(observer.await_values(1, Duration::from_secs(5)));
    observer.dispose();
    upstream.next(2);
    upstream.next(3);
    std::thread::sleep(Duration::from_millis(100));

    // Assert
    observer.assert_values(&[1]);
    observer.assert_not_terminated();
}

#[test]
fn test_subscribe_on_moves_the_subscription_call() {
    // Arrange
    let (sender, receiver) = mpsc::channel::<ThreadId>();
    let probe = sender.clone();
    let source = Observable::from_callable(move || {
        let _ = probe.send(std::thread::current().id());
        Ok(42)
    })
    .subscribe_on(Schedulers::io());

    // Act
    let observer = subscribe(&source);
    let producing_thread = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("the callable must run");

    // Assert
    assert_ne!(producing_thread, std::thread::current().id());
    assert!(observer.await_terminal(Duration::from_secs(5)));
    observer.assert_values(&[42]);
}

#[test]
fn test_subscribe_on_subscribes_exactly_once() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let probe = subscriptions.clone();
    let source = Observable::defer(move || {
        probe.fetch_add(1, Ordering::SeqCst);
        Observable::just(1)
    })
    .subscribe_on(Schedulers::computation());

    let observer = subscribe(&source);
    assert!(observer.await_terminal(Duration::from_secs(5)));
    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unsubscribe_on_moves_disposal_to_the_scheduler() {
    // Arrange
    let (sender, receiver) = mpsc::channel::<ThreadId>();
    let upstream = PublishSubject::<i32>::new();
    let probe = sender.clone();
    use rill_ops::TapExt;
    let source = upstream
        .observable()
        .do_on_dispose(move || {
            let _ = probe.send(std::thread::current().id());
        })
        .unsubscribe_on(Schedulers::single());

    // Act
    let observer = subscribe(&source);
    observer.dispose();

    // Assert
    let disposing_thread = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("disposal must run");
    assert_ne!(disposing_thread, std::thread::current().id());
}
