// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{Observable, RillError};
use rill_ops::{CollectExt, ElementsExt, FilterExt, MapExt};
use rill_test_utils::TestObserver;
use std::sync::Arc;

fn subscribe<T: Send + Sync + 'static>(source: &Observable<T>) -> TestObserver<T> {
    let observer = TestObserver::new();
    source.subscribe_observer(Arc::new(observer.clone()));
    observer
}

#[test]
fn test_filter_map_to_list_pipeline() {
    // range(1, 5) | keep evens | x10 | collect
    let source = Observable::range(1, 5)
        .filter(|v| v % 2 == 0)
        .map(|v| v * 10)
        .to_list();
    let observer = subscribe(&source);
    observer.assert_values(&[vec![20, 40]]);
    observer.assert_completed();
}

#[test]
fn test_to_list_of_empty_stream_is_an_empty_list() {
    let source = Observable::<i32>::empty().to_list();
    let observer = subscribe(&source);
    observer.assert_values(&[vec![]]);
    observer.assert_completed();
}

#[test]
fn test_to_list_discards_partial_collection_on_error() {
    let source = Observable::from_iter(vec![1, 2])
        .concat_with_error()
        .to_list();
    let observer = subscribe(&source);
    assert!(observer.values().is_empty());
    assert!(observer.error().is_some());
}

// Appends a failing tail to a finite source
trait WithErrorTail<T> {
    fn concat_with_error(self) -> Observable<T>;
}

impl<T: Send + 'static> WithErrorTail<T> for Observable<T> {
    fn concat_with_error(self) -> Observable<T> {
        use rill_ops::ConcatExt;
        self.concat_with(Observable::error(RillError::stream_error("tail")))
    }
}

#[test]
fn test_to_sorted_list_orders_the_values() {
    let source = Observable::from_iter(vec![3, 1, 2]).to_sorted_list();
    let observer = subscribe(&source);
    observer.assert_values(&[vec![1, 2, 3]]);
}

#[test]
fn test_to_map_last_value_wins_per_key() {
    let source = Observable::from_iter(vec![(1, "old"), (2, "two"), (1, "new")])
        .to_map(|pair| pair.0);
    let observer = subscribe(&source);

    let maps = observer.values();
    assert_eq!(maps.len(), 1);
    assert_eq!(maps[0].get(&1), Some(&(1, "new")));
    assert_eq!(maps[0].get(&2), Some(&(2, "two")));
}

#[test]
fn test_to_multimap_groups_values_per_key() {
    let source = Observable::from_iter(vec![1, 2, 3, 4]).to_multimap(|v| v % 2);
    let observer = subscribe(&source);

    let maps = observer.values();
    assert_eq!(maps.len(), 1);
    assert_eq!(maps[0].get(&0), Some(&vec![2, 4]));
    assert_eq!(maps[0].get(&1), Some(&vec![1, 3]));
}

#[test]
fn test_first_takes_one_and_completes() {
    let source = Observable::from_iter(vec![9, 8, 7]).first();
    let observer = subscribe(&source);
    observer.assert_values(&[9]);
    observer.assert_completed();
}

#[test]
fn test_first_on_empty_is_a_missing_element_error() {
    let source = Observable::<i32>::empty().first();
    let observer = subscribe(&source);
    observer.assert_error(|e| matches!(e, RillError::MissingElementError { .. }));
}

#[test]
fn test_single_rejects_a_second_element() {
    let source = Observable::from_iter(vec![1, 2]).single();
    let observer = subscribe(&source);
    assert!(observer.error().is_some());
    assert!(observer.values().is_empty());
}

#[test]
fn test_single_passes_a_lone_element_on_completion() {
    let source = Observable::just(42).single();
    let observer = subscribe(&source);
    observer.assert_values(&[42]);
    observer.assert_completed();
}
