// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{Observable, RillError, Signal};
use rill_ops::{
    CollectExt, ConcatExt, DematerializeExt, MapExt, MaterializeExt, OnErrorExt, TapExt,
};
use rill_test_utils::TestObserver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn subscribe<T: Send + Sync + 'static>(source: &Observable<T>) -> TestObserver<T> {
    let observer = TestObserver::new();
    source.subscribe_observer(Arc::new(observer.clone()));
    observer
}

#[test]
fn test_do_on_next_observes_without_changing_the_stream() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let source = Observable::from_iter(vec![1, 2]).do_on_next(move |v| sink.lock().push(*v));
    let observer = subscribe(&source);

    observer.assert_values(&[1, 2]);
    assert_eq!(*log.lock(), vec![1, 2]);
}

#[test]
fn test_do_finally_runs_once_after_the_terminal() {
    let finals = Arc::new(AtomicUsize::new(0));
    let counter = finals.clone();
    let source = Observable::from_iter(vec![1]).do_finally(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let observer = subscribe(&source);

    observer.assert_completed();
    assert_eq!(finals.load(Ordering::SeqCst), 1);

    // Disposing after the terminal must not run it again
    observer.dispose();
    assert_eq!(finals.load(Ordering::SeqCst), 1);
}

#[test]
fn test_do_finally_runs_on_disposal_of_a_live_stream() {
    let finals = Arc::new(AtomicUsize::new(0));
    let counter = finals.clone();
    let source = Observable::<i32>::never().do_finally(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let observer = subscribe(&source);

    observer.dispose();
    assert_eq!(finals.load(Ordering::SeqCst), 1);
}

#[test]
fn test_do_on_each_sees_values_and_the_terminal() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let source = Observable::from_iter(vec![1]).do_on_each(move |signal| {
        sink.lock().push(match signal {
            Signal::Next(v) => format!("next:{v}"),
            Signal::Error(_) => "error".to_string(),
            Signal::Complete => "complete".to_string(),
        });
    });
    subscribe(&source);

    assert_eq!(*log.lock(), vec!["next:1", "complete"]);
}

#[test]
fn test_on_error_return_replaces_the_error_with_a_value() {
    // just(1,2,3) ++ error, recovered into -1
    let source = Observable::from_iter(vec![1, 2, 3])
        .concat_with(Observable::error(RillError::stream_error("tail")))
        .on_error_return(|_| -1);
    let observer = subscribe(&source);

    observer.assert_values(&[1, 2, 3, -1]);
    observer.assert_completed();
}

#[test]
fn test_on_error_resume_next_switches_to_the_fallback() {
    let source = Observable::from_iter(vec![1])
        .concat_with(Observable::error(RillError::stream_error("tail")))
        .on_error_resume_next(|_| Observable::from_iter(vec![8, 9]));
    let observer = subscribe(&source);

    observer.assert_values(&[1, 8, 9]);
    observer.assert_completed();
}

#[test]
fn test_on_error_resume_next_lets_fallback_errors_through() {
    let source = Observable::<i32>::error(RillError::stream_error("first"))
        .on_error_resume_next(|_| Observable::error(RillError::stream_error("second")));
    let observer = subscribe(&source);

    observer.assert_error(|e| e.to_string().contains("second"));
}

#[test]
fn test_materialize_reifies_the_terminal() {
    let source = Observable::from_iter(vec![1]).materialize();
    let observer = subscribe(&source);

    let signals = observer.values();
    assert_eq!(signals.len(), 2);
    assert!(signals[0].is_next());
    assert!(signals[1].is_complete());
    observer.assert_completed();
}

#[test]
fn test_materialize_turns_an_error_into_a_value() {
    let source = Observable::<i32>::error(RillError::stream_error("boom")).materialize();
    let observer = subscribe(&source);

    let signals = observer.values();
    assert_eq!(signals.len(), 1);
    assert!(signals[0].is_error());
    // The materialized stream itself completes normally
    observer.assert_completed();
}

#[test]
fn test_dematerialize_restores_the_notifications() {
    let source = Observable::from_iter(vec![1, 2])
        .materialize()
        .dematerialize();
    let observer = subscribe(&source);

    observer.assert_values(&[1, 2]);
    observer.assert_completed();
}

#[test]
fn test_dematerialize_surfaces_a_reified_error() {
    let source = Observable::from_iter(vec![
        Signal::Next(1),
        Signal::Error(RillError::stream_error("reified")),
        Signal::Next(2),
    ])
    .dematerialize();
    let observer = subscribe(&source);

    observer.assert_values(&[1]);
    observer.assert_error(|e| e.to_string().contains("reified"));
}

#[test]
fn test_map_after_materialize_composes() {
    let source = Observable::from_iter(vec![1, 2])
        .materialize()
        .map(|signal| signal.is_next())
        .to_list();
    let observer = subscribe(&source);
    observer.assert_values(&[vec![true, true, false]]);
}
