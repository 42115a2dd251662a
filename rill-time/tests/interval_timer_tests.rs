// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::Observable;
use rill_ops::{MapExt, TakeExt};
use rill_scheduler::Scheduler;
use rill_test_utils::{TestObserver, TestScheduler};
use rill_time::{interval_from, interval_on, timer_on};
use std::sync::Arc;
use std::time::Duration;

fn subscribe<T: Send + Sync + 'static>(source: &Observable<T>) -> TestObserver<T> {
    let observer = TestObserver::new();
    source.subscribe_observer(Arc::new(observer.clone()));
    observer
}

const MS10: Duration = Duration::from_millis(10);

#[test]
fn test_interval_ticks_at_each_period() {
    // Arrange
    let scheduler = TestScheduler::new();
    let source = interval_on(MS10, Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    // Act + Assert: nothing before the first period elapses
    scheduler.advance_by(Duration::from_millis(9));
    observer.assert_values(&[]);

    scheduler.advance_by(Duration::from_millis(1));
    observer.assert_values(&[0]);

    scheduler.advance_by(Duration::from_millis(25));
    observer.assert_values(&[0, 1, 2]);
}

#[test]
fn test_interval_take_timestamps_land_on_the_grid() {
    // interval(10ms).take(3) after advancing 35ms: ticks at 10/20/30
    let scheduler = TestScheduler::new();
    let stamping = scheduler.clone();
    let source = interval_on(MS10, Arc::new(scheduler.clone()))
        .map(move |tick| (tick, stamping.virtual_now()))
        .take(3);
    let observer = subscribe(&source);

    scheduler.advance_by(Duration::from_millis(35));

    observer.assert_values(&[
        (0, Duration::from_millis(10)),
        (1, Duration::from_millis(20)),
        (2, Duration::from_millis(30)),
    ]);
    observer.assert_completed();
}

#[test]
fn test_interval_stops_after_disposal() {
    let scheduler = TestScheduler::new();
    let source = interval_on(MS10, Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    scheduler.advance_by(MS10);
    observer.dispose();
    scheduler.advance_by(Duration::from_millis(100));

    observer.assert_values(&[0]);
    observer.assert_not_terminated();
}

#[test]
fn test_interval_from_uses_the_initial_delay() {
    let scheduler = TestScheduler::new();
    let source = interval_from(
        Duration::from_millis(5),
        MS10,
        Arc::new(scheduler.clone()),
    );
    let observer = subscribe(&source);

    scheduler.advance_by(Duration::from_millis(5));
    observer.assert_values(&[0]);
    scheduler.advance_by(MS10);
    observer.assert_values(&[0, 1]);
}

#[test]
fn test_timer_fires_once_and_completes() {
    let scheduler = TestScheduler::new();
    let source = timer_on(Duration::from_millis(30), Arc::new(scheduler.clone()));
    let observer = subscribe(&source);

    scheduler.advance_by(Duration::from_millis(29));
    observer.assert_values(&[]);
    scheduler.advance_by(Duration::from_millis(1));

    observer.assert_values(&[0]);
    observer.assert_completed();
}

#[test]
fn test_scheduler_clock_is_shared_with_operators() {
    let scheduler = TestScheduler::new();
    assert_eq!(scheduler.now(), Duration::ZERO);
    scheduler.advance_by(Duration::from_millis(7));
    assert_eq!(scheduler.now(), Duration::from_millis(7));
}
