// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::Disposable;
use rill_scheduler::{PeriodicWorker, Scheduler, Worker};
use rill_test_utils::TestScheduler;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_nothing_runs_until_the_clock_advances() {
    // Arrange
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker();
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();

    // Act
    worker.schedule(Box::new(move || sink.lock().push("ran")));

    // Assert
    assert!(log.lock().is_empty());
    scheduler.advance_by(Duration::ZERO);
    assert_eq!(*log.lock(), vec!["ran"]);
}

#[test]
fn test_tasks_run_in_due_order_then_submission_order() {
    // Arrange
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker();
    let log = Arc::new(Mutex::new(Vec::new()));

    for (name, delay) in [("late", 20u64), ("early", 5), ("mid-a", 10), ("mid-b", 10)] {
        let sink = log.clone();
        worker.schedule_after(
            Duration::from_millis(delay),
            Box::new(move || sink.lock().push(name)),
        );
    }

    // Act
    scheduler.advance_by(Duration::from_millis(30));

    // Assert
    assert_eq!(*log.lock(), vec!["early", "mid-a", "mid-b", "late"]);
}

#[test]
fn test_advance_stops_at_the_target() {
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker();
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    worker.schedule_after(
        Duration::from_millis(50),
        Box::new(move || sink.lock().push("far")),
    );

    scheduler.advance_by(Duration::from_millis(49));

    assert!(log.lock().is_empty());
    assert_eq!(scheduler.virtual_now(), Duration::from_millis(49));
}

#[test]
fn test_tasks_scheduled_mid_advance_participate() {
    // A task that re-arms itself must keep firing within one advance
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker();
    let ticks = Arc::new(Mutex::new(0));
    let counter = ticks.clone();

    worker.schedule_periodic(
        Duration::from_millis(10),
        Duration::from_millis(10),
        move || *counter.lock() += 1,
    );
    scheduler.advance_by(Duration::from_millis(45));

    assert_eq!(*ticks.lock(), 4);
}

#[test]
fn test_disposed_worker_skips_its_tasks() {
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker();
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    worker.schedule_after(
        Duration::from_millis(10),
        Box::new(move || sink.lock().push("skipped")),
    );

    worker.dispose();
    scheduler.advance_by(Duration::from_millis(20));

    assert!(log.lock().is_empty());
}

#[test]
fn test_cancelling_one_handle_leaves_the_rest() {
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker();
    let log = Arc::new(Mutex::new(Vec::new()));

    let doomed_sink = log.clone();
    let doomed = worker.schedule_after(
        Duration::from_millis(10),
        Box::new(move || doomed_sink.lock().push("doomed")),
    );
    let kept_sink = log.clone();
    worker.schedule_after(
        Duration::from_millis(10),
        Box::new(move || kept_sink.lock().push("kept")),
    );

    doomed.dispose();
    scheduler.advance_by(Duration::from_millis(10));

    assert_eq!(*log.lock(), vec!["kept"]);
}
