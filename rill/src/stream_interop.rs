// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Interop with the `futures` ecosystem.
//!
//! `from_stream` drives a pull-based [`Stream`] on an io worker and
//! pushes its items; [`IntoStreamExt::into_stream`] funnels a
//! subscription into a channel-backed stream whose drop cancels the
//! subscription.

use futures::executor::block_on;
use futures::{Stream, StreamExt};
use rill_core::{Disposable, Observable, RillError, Signal};
use rill_scheduler::{Schedulers};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Adapts a `futures` stream into an observable.
///
/// Each subscription claims an `io` worker and drives the stream to
/// completion there, checking for disposal between items. The stream
/// factory runs per subscription, so resubscription gets a fresh
/// stream.
pub fn from_stream<S, T>(factory: impl Fn() -> S + Send + Sync + 'static) -> Observable<T>
where
    S: Stream<Item = T> + Send + 'static,
    T: Send + 'static,
{
    let factory = Arc::new(factory);
    Observable::create(move |emitter| {
        let factory = Arc::clone(&factory);
        let worker = Schedulers::io().create_worker();
        emitter.set_disposable(worker.clone());
        let driver = emitter.clone();
        worker.schedule(Box::new(move || {
            let mut stream = Box::pin(factory());
            block_on(async move {
                while let Some(item) = stream.next().await {
                    if driver.is_disposed() {
                        return;
                    }
                    driver.next(item);
                }
                driver.complete();
            });
        }));
    })
}

/// Extension trait funneling a subscription into a [`Stream`].
pub trait IntoStreamExt<T> {
    /// Subscribes and yields each value as `Ok`, the error terminal as
    /// one `Err`, and ends on completion. Dropping the stream disposes
    /// the subscription.
    fn into_stream(self) -> ObservableStream<T>;
}

impl<T: Send + 'static> IntoStreamExt<T> for Observable<T> {
    fn into_stream(self) -> ObservableStream<T> {
        let (sender, receiver) = async_channel::unbounded();
        let terminal_sender = sender.clone();
        let error_sender = sender.clone();
        let guard = self.subscribe_all(
            move |value| {
                let _ = sender.try_send(Signal::Next(value));
            },
            move |error| {
                let _ = error_sender.try_send(Signal::Error(error));
                error_sender.close();
            },
            move || {
                let _ = terminal_sender.try_send(Signal::Complete);
                terminal_sender.close();
            },
        );
        ObservableStream {
            receiver: Box::pin(receiver),
            guard,
            done: false,
        }
    }
}

/// Channel-backed stream over a live subscription.
pub struct ObservableStream<T> {
    receiver: Pin<Box<async_channel::Receiver<Signal<T>>>>,
    guard: Arc<dyn Disposable>,
    done: bool,
}

impl<T> Stream for ObservableStream<T> {
    type Item = Result<T, RillError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.receiver.as_mut().poll_next(cx) {
            Poll::Ready(Some(Signal::Next(value))) => Poll::Ready(Some(Ok(value))),
            Poll::Ready(Some(Signal::Error(error))) => {
                this.done = true;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(Some(Signal::Complete)) | Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for ObservableStream<T> {
    fn drop(&mut self) {
        self.guard.dispose();
    }
}
