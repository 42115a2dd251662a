// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::StreamExt;
use rill::prelude::*;
use rill::IntoStreamExt;
use rill_test_utils::TestObserver;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_into_stream_yields_values_then_ends() -> anyhow::Result<()> {
    // Arrange
    let mut stream = Observable::from_iter(vec![1, 2, 3]).into_stream();

    // Act + Assert
    assert_eq!(stream.next().await.transpose()?, Some(1));
    assert_eq!(stream.next().await.transpose()?, Some(2));
    assert_eq!(stream.next().await.transpose()?, Some(3));
    assert!(stream.next().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_into_stream_surfaces_the_error_terminal() {
    let mut stream = Observable::from_iter(vec![1])
        .concat_with(Observable::<i32>::error(RillError::stream_error("wire")))
        .into_stream();

    assert!(matches!(stream.next().await, Some(Ok(1))));
    assert!(matches!(stream.next().await, Some(Err(_))));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_from_stream_pushes_each_item() {
    // Arrange
    let source = rill::from_stream(|| futures::stream::iter(vec![1, 2, 3]));
    let observer = TestObserver::new();

    // Act
    source.subscribe_observer(Arc::new(observer.clone()));

    // Assert: production happens on an io worker
    assert!(observer.await_terminal(Duration::from_secs(5)));
    observer.assert_values(&[1, 2, 3]);
    observer.assert_completed();
}

#[tokio::test]
async fn test_from_stream_resubscription_gets_a_fresh_stream() {
    let source = rill::from_stream(|| futures::stream::iter(vec![7]));

    let first = TestObserver::new();
    source.subscribe_observer(Arc::new(first.clone()));
    assert!(first.await_terminal(Duration::from_secs(5)));

    let second = TestObserver::new();
    source.subscribe_observer(Arc::new(second.clone()));
    assert!(second.await_terminal(Duration::from_secs(5)));

    first.assert_values(&[7]);
    second.assert_values(&[7]);
}

#[tokio::test]
async fn test_round_trip_stream_to_observable_to_stream() -> anyhow::Result<()> {
    let stream = rill::from_stream(|| futures::stream::iter(0..5))
        .map(|v| v * 2)
        .into_stream();
    let collected: Vec<i32> = stream.map(Result::unwrap).collect().await;
    assert_eq!(collected, vec![0, 2, 4, 6, 8]);
    Ok(())
}
