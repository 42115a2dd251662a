// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::multicast::connectable::ConnectableObservable;
use parking_lot::Mutex;
use rill_core::{ActionDisposable, Disposable, Observable, Observer, RillError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) fn ref_count<T: Clone + Send + 'static>(
    connectable: ConnectableObservable<T>,
) -> Observable<T> {
    let state = Arc::new(RefCountState {
        connectable,
        inner: Mutex::new(RefCountInner {
            subscribers: 0,
            connection: None,
        }),
    });
    Observable::new(move |downstream| {
        let released = Arc::new(AtomicBool::new(false));
        let observer = Arc::new(RefCountObserver {
            downstream,
            state: Arc::clone(&state),
            released,
        });
        // Register before connecting so a synchronous upstream reaches
        // this subscriber
        state.connectable.observable().subscribe_observer(observer);
        let connect_now = {
            let mut inner = state.inner.lock();
            inner.subscribers += 1;
            inner.subscribers == 1 && inner.connection.is_none()
        };
        if connect_now {
            let connection = state.connectable.connect();
            let mut inner = state.inner.lock();
            if inner.subscribers == 0 {
                // Everyone left during the synchronous connect
                drop(inner);
                connection.dispose();
            } else {
                inner.connection = Some(connection);
            }
        }
    })
}

struct RefCountInner {
    subscribers: usize,
    connection: Option<Arc<dyn Disposable>>,
}

struct RefCountState<T> {
    connectable: ConnectableObservable<T>,
    inner: Mutex<RefCountInner>,
}

fn release<T>(state: &Arc<RefCountState<T>>, released: &AtomicBool) {
    if released.swap(true, Ordering::AcqRel) {
        return;
    }
    let connection = {
        let mut inner = state.inner.lock();
        inner.subscribers = inner.subscribers.saturating_sub(1);
        if inner.subscribers == 0 {
            inner.connection.take()
        } else {
            None
        }
    };
    // The transition to zero disposes the upstream exactly once
    if let Some(connection) = connection {
        connection.dispose();
    }
}

struct RefCountObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    state: Arc<RefCountState<T>>,
    released: Arc<AtomicBool>,
}

impl<T: Clone + Send + 'static> Observer<T> for RefCountObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        let state = Arc::clone(&self.state);
        let released = Arc::clone(&self.released);
        self.downstream
            .on_subscribe(Arc::new(ActionDisposable::new(move || {
                disposable.dispose();
                release(&state, &released);
            })));
    }

    fn on_next(&self, value: T) {
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: RillError) {
        self.downstream.on_error(error);
        release(&self.state, &self.released);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
        release(&self.state, &self.released);
    }
}
