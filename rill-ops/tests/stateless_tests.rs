// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{Observable, Result, RillError};
use rill_ops::{
    DistinctUntilChangedExt, FilterExt, MapExt, ScanExt, SkipExt, TakeExt,
};
use rill_test_utils::TestObserver;
use std::sync::Arc;

fn subscribe<T: Send + Sync + 'static>(source: &Observable<T>) -> TestObserver<T> {
    let observer = TestObserver::new();
    source.subscribe_observer(Arc::new(observer.clone()));
    observer
}

#[test]
fn test_map_transforms_every_value() {
    let source = Observable::from_iter(vec![1, 2, 3]).map(|v| v * 10);
    let observer = subscribe(&source);
    observer.assert_values(&[10, 20, 30]);
    observer.assert_completed();
}

#[test]
fn test_map_composition_equals_composed_map() {
    // map(f) . map(g) behaves as map(g . f)
    let chained = Observable::range(1, 4).map(|v| v + 1).map(|v| v * 2);
    let fused = Observable::range(1, 4).map(|v| (v + 1) * 2);

    let chained_observer = subscribe(&chained);
    let fused_observer = subscribe(&fused);

    assert_eq!(chained_observer.values(), fused_observer.values());
    chained_observer.assert_completed();
    fused_observer.assert_completed();
}

#[test]
fn test_try_map_failure_terminates_and_stops_upstream() {
    // Arrange: a long source; the failure must cut it short
    let source = Observable::range(1, 1_000).try_map(|v| {
        if v < 3 {
            Ok(v)
        } else {
            Err(RillError::stream_error("rejected"))
        }
    });

    // Act
    let observer = subscribe(&source);

    // Assert
    observer.assert_values(&[1, 2]);
    observer.assert_error(|e| e.to_string().contains("rejected"));
    assert!(!observer.is_completed());
}

#[test]
fn test_filter_keeps_matching_subsequence_in_order() {
    let source = Observable::range(1, 10).filter(|v| v % 2 == 0);
    let observer = subscribe(&source);
    observer.assert_values(&[2, 4, 6, 8, 10]);
    observer.assert_completed();
}

#[test]
fn test_try_filter_failure_routes_to_on_error() {
    let source = Observable::range(1, 10).try_filter(|v| {
        if *v == 4 {
            Err(RillError::stream_error("bad predicate"))
        } else {
            Ok(true)
        }
    });
    let observer = subscribe(&source);
    observer.assert_values(&[1, 2, 3]);
    observer.assert_error(|e| e.to_string().contains("bad predicate"));
}

#[test]
fn test_scan_with_emits_seed_then_accumulations() {
    let source = Observable::from_iter(vec![1, 2, 3]).scan_with(0, |acc, v| acc + v);
    let observer = subscribe(&source);
    observer.assert_values(&[0, 1, 3, 6]);
    observer.assert_completed();
}

#[test]
fn test_scan_without_seed_starts_at_first_value() {
    let source = Observable::from_iter(vec![1, 2, 3]).scan(|acc, v| acc + v);
    let observer = subscribe(&source);
    observer.assert_values(&[1, 3, 6]);
}

#[test]
fn test_take_truncates_and_completes() {
    let source = Observable::range(0, 100).take(3);
    let observer = subscribe(&source);
    observer.assert_values(&[0, 1, 2]);
    observer.assert_completed();
}

#[test]
fn test_take_zero_completes_immediately() {
    let source = Observable::range(0, 100).take(0);
    let observer = subscribe(&source);
    observer.assert_values(&[]);
    observer.assert_completed();
}

#[test]
fn test_take_more_than_available_forwards_the_completion() {
    let source = Observable::from_iter(vec![1, 2]).take(10);
    let observer = subscribe(&source);
    observer.assert_values(&[1, 2]);
    observer.assert_completed();
}

#[test]
fn test_skip_drops_the_prefix() {
    let source = Observable::range(0, 6).skip(4);
    let observer = subscribe(&source);
    observer.assert_values(&[4, 5]);
    observer.assert_completed();
}

#[test]
fn test_distinct_until_changed_collapses_runs() {
    let source = Observable::from_iter(vec![1, 1, 2, 2, 2, 1, 3]).distinct_until_changed();
    let observer = subscribe(&source);
    observer.assert_values(&[1, 2, 1, 3]);
    observer.assert_completed();
}

#[test]
fn test_distinct_until_changed_key_compares_by_key() {
    let source = Observable::from_iter(vec![(1, "a"), (1, "b"), (2, "c")])
        .distinct_until_changed_key(|pair| pair.0);
    let observer = subscribe(&source);
    observer.assert_values(&[(1, "a"), (2, "c")]);
}

#[test]
fn test_operator_results_are_fallible_via_try_map() -> Result<()> {
    // The Result alias composes with plain test code
    let source = Observable::just(2).try_map(|v| Ok(v * 2));
    let observer = subscribe(&source);
    observer.assert_values(&[4]);
    Ok(())
}
