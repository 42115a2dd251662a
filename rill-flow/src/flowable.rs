// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::subscriber::{Subscriber, Subscription};
use parking_lot::Mutex;
use rill_core::{DrainGate, RillError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A demand-signalling source of values.
///
/// Where an `Observable` pushes unconditionally, a `Flowable` emits
/// only as much as its subscriber has requested through the
/// [`Subscription`] handed over in the handshake.
pub struct Flowable<T> {
    on_subscribe: Arc<dyn Fn(Arc<dyn Subscriber<T>>) + Send + Sync>,
}

impl<T> Clone for Flowable<T> {
    fn clone(&self) -> Self {
        Self {
            on_subscribe: Arc::clone(&self.on_subscribe),
        }
    }
}

impl<T: Send + 'static> Flowable<T> {
    /// Defines a flow from its raw subscribe action.
    pub fn new(on_subscribe: impl Fn(Arc<dyn Subscriber<T>>) + Send + Sync + 'static) -> Self {
        Self {
            on_subscribe: Arc::new(on_subscribe),
        }
    }

    /// Subscribes a full subscriber.
    pub fn subscribe_subscriber(&self, subscriber: Arc<dyn Subscriber<T>>) {
        (self.on_subscribe)(subscriber);
    }

    /// Emits a single value, honoring demand.
    pub fn just(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_iter(vec![value])
    }

    /// A demand-paced source over a re-iterable collection: values are
    /// produced only as credit arrives.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
        I::IntoIter: Send + 'static,
    {
        Flowable::new(move |subscriber| {
            let state = Arc::new(IterState {
                subscriber: subscriber.clone(),
                iter: Mutex::new(Some(iter.clone().into_iter())),
                requested: AtomicU64::new(0),
                gate: DrainGate::new(),
                cancelled: AtomicBool::new(false),
            });
            subscriber.on_subscribe(Arc::new(IterSubscription(state)));
        })
    }
}

struct IterState<T, I: Iterator<Item = T>> {
    subscriber: Arc<dyn Subscriber<T>>,
    // None once exhausted
    iter: Mutex<Option<I>>,
    requested: AtomicU64,
    gate: DrainGate,
    cancelled: AtomicBool,
}

struct IterSubscription<T, I: Iterator<Item = T>>(Arc<IterState<T, I>>);

/// Saturating demand accounting shared by flow producers.
pub(crate) fn add_demand(requested: &AtomicU64, n: u64) {
    let mut current = requested.load(Ordering::Acquire);
    loop {
        let next = current.saturating_add(n);
        match requested.compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

/// Consumes one unit of demand unless it is unbounded.
pub(crate) fn consume_demand(requested: &AtomicU64) {
    if requested.load(Ordering::Acquire) != u64::MAX {
        requested.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<T, I> Subscription for IterSubscription<T, I>
where
    T: Send + 'static,
    I: Iterator<Item = T> + Send,
{
    fn request(&self, n: u64) {
        let state = &self.0;
        if n == 0 {
            rill_core::hooks::protocol_violation("request(0) is not a valid demand");
            state.cancelled.store(true, Ordering::Release);
            state
                .subscriber
                .on_error(RillError::protocol_violation("request(0) is not valid"));
            return;
        }
        add_demand(&state.requested, n);
        if !state.gate.enter() {
            return;
        }
        let mut missed = 1;
        loop {
            loop {
                if state.cancelled.load(Ordering::Acquire) {
                    state.iter.lock().take();
                    break;
                }
                if state.requested.load(Ordering::Acquire) == 0 {
                    break;
                }
                let step = {
                    let mut iter = state.iter.lock();
                    match iter.as_mut() {
                        Some(items) => match items.next() {
                            Some(value) => Some(value),
                            None => {
                                *iter = None;
                                None
                            }
                        },
                        None => break,
                    }
                };
                match step {
                    Some(value) => {
                        consume_demand(&state.requested);
                        state.subscriber.on_next(value);
                    }
                    None => {
                        state.subscriber.on_complete();
                        break;
                    }
                }
            }
            missed = state.gate.leave(missed);
            if missed == 0 {
                return;
            }
        }
    }

    fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::Release);
        self.0.iter.lock().take();
    }
}
