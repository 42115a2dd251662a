// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{Observable, PublishSubject, RillError};
use rill_ops::{combine_latest, zip, zip_delay_error, CombineLatestExt, ZipExt};
use rill_test_utils::TestObserver;
use std::sync::Arc;

fn subscribe<T: Send + Sync + 'static>(source: &Observable<T>) -> TestObserver<T> {
    let observer = TestObserver::new();
    source.subscribe_observer(Arc::new(observer.clone()));
    observer
}

#[test]
fn test_zip_pairs_values_index_by_index() {
    let source = zip(
        vec![
            Observable::from_iter(vec![1, 2, 3]),
            Observable::from_iter(vec![10, 20, 30]),
        ],
        |row| row[0] + row[1],
    );
    let observer = subscribe(&source);
    observer.assert_values(&[11, 22, 33]);
    observer.assert_completed();
}

#[test]
fn test_zip_stops_at_the_shortest_source() {
    let source = zip(
        vec![
            Observable::from_iter(vec![1, 2, 3, 4, 5]),
            Observable::from_iter(vec![10, 20]),
        ],
        |row| row[0] + row[1],
    );
    let observer = subscribe(&source);
    observer.assert_values(&[11, 22]);
    observer.assert_completed();
}

#[test]
fn test_zip_with_combines_heterogeneous_pairs() {
    let numbers = Observable::from_iter(vec![1, 2]);
    let labels = Observable::from_iter(vec!["a", "b"]);
    let source = numbers.zip_with(labels, |n, s| format!("{n}{s}"));
    let observer = subscribe(&source);
    observer.assert_values(&["1a".to_string(), "2b".to_string()]);
    observer.assert_completed();
}

#[test]
fn test_zip_error_is_immediate_without_delay() {
    let source = zip(
        vec![
            Observable::from_iter(vec![1, 2]),
            Observable::error(RillError::stream_error("lane down")),
        ],
        |row: Vec<i32>| row[0],
    );
    let observer = subscribe(&source);
    assert!(observer.error().is_some());
}

#[test]
fn test_zip_delay_error_emits_rows_before_the_error() {
    // Both values of the short healthy lane pair up first
    let source = zip_delay_error(
        vec![
            Observable::from_iter(vec![1, 2]),
            Observable::from_iter(vec![10, 20]).concat_error("late"),
        ],
        |row| row[0] + row[1],
    );
    let observer = subscribe(&source);
    observer.assert_values(&[11, 22]);
    observer.assert_error(|e| e.to_string().contains("late"));
}

trait ConcatError<T> {
    fn concat_error(self, message: &str) -> Observable<T>;
}

impl<T: Send + 'static> ConcatError<T> for Observable<T> {
    fn concat_error(self, message: &str) -> Observable<T> {
        use rill_ops::ConcatExt;
        self.concat_with(Observable::error(RillError::stream_error(message)))
    }
}

#[test]
fn test_combine_latest_emits_once_every_source_has_a_value() {
    // Arrange
    let left = PublishSubject::<i32>::new();
    let right = PublishSubject::<i32>::new();
    let source = combine_latest(
        vec![left.observable(), right.observable()],
        |cells: &[i32]| (cells[0], cells[1]),
    );
    let observer = subscribe(&source);

    // Act
    left.next(1);
    observer.assert_values(&[]);
    right.next(10);
    left.next(2);
    right.next(20);
    left.complete();
    right.next(30);
    right.complete();

    // Assert: completion of one source is absorbed until all finish
    observer.assert_values(&[(1, 10), (2, 10), (2, 20), (2, 30)]);
    observer.assert_completed();
}

#[test]
fn test_combine_latest_with_pairs_two_sources() {
    let left = PublishSubject::<i32>::new();
    let right = PublishSubject::<&'static str>::new();
    let source = left
        .observable()
        .combine_latest_with(right.observable(), |n, s| format!("{n}{s}"));
    let observer = subscribe(&source);

    left.next(1);
    right.next("x");
    left.next(2);
    left.complete();
    right.complete();

    observer.assert_values(&["1x".to_string(), "2x".to_string()]);
    observer.assert_completed();
}

#[test]
fn test_combine_latest_error_terminates_immediately() {
    let left = PublishSubject::<i32>::new();
    let source = combine_latest(
        vec![
            left.observable(),
            Observable::error(RillError::stream_error("dead lane")),
        ],
        |cells: &[i32]| cells[0],
    );
    let observer = subscribe(&source);
    left.next(1);
    observer.assert_error(|e| e.to_string().contains("dead lane"));
}
