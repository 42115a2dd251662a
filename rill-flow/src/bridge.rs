// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Bridges between the unbounded and the demand-signalling worlds.
//!
//! `to_flowable(strategy)` decides what happens when the unbounded side
//! outruns downstream demand; `into_observable` requests unbounded
//! demand and forwards.

use crate::flowable::{add_demand, consume_demand, Flowable};
use crate::subscriber::{Subscriber, Subscription};
use parking_lot::Mutex;
use rill_core::{
    ActionDisposable, Disposable, DrainGate, Observable, Observer, RillError, SubscriptionSlot,
    Terminal,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// What to do with an emission that arrives without downstream demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressureStrategy {
    /// Queue without bound until demand arrives
    Buffer,
    /// Discard the emission
    Drop,
    /// Keep only the most recent emission
    Latest,
    /// Fail the subscription with an overflow error
    Error,
}

/// Extension trait converting an unbounded source into a flow.
pub trait ToFlowableExt<T> {
    /// Applies `strategy` whenever the source emits faster than the
    /// subscriber requests.
    fn to_flowable(self, strategy: BackpressureStrategy) -> Flowable<T>;
}

impl<T: Send + 'static> ToFlowableExt<T> for Observable<T> {
    fn to_flowable(self, strategy: BackpressureStrategy) -> Flowable<T> {
        let source = self.clone();
        Flowable::new(move |subscriber| {
            let state = Arc::new(BridgeState {
                downstream: subscriber.clone(),
                strategy,
                requested: AtomicU64::new(0),
                queue: Mutex::new(VecDeque::new()),
                latest: Mutex::new(None),
                terminal: Mutex::new(None),
                gate: DrainGate::new(),
                cancelled: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
                upstream: SubscriptionSlot::new(),
            });
            subscriber.on_subscribe(Arc::new(BridgeSubscription(state.clone())));
            source.subscribe_observer(Arc::new(BridgeObserver { state }));
        })
    }
}

struct BridgeState<T> {
    downstream: Arc<dyn Subscriber<T>>,
    strategy: BackpressureStrategy,
    requested: AtomicU64,
    queue: Mutex<VecDeque<T>>,
    latest: Mutex<Option<T>>,
    terminal: Mutex<Option<Terminal>>,
    gate: DrainGate,
    cancelled: AtomicBool,
    terminated: AtomicBool,
    upstream: SubscriptionSlot,
}

impl<T> BridgeState<T> {
    // Claims one credit up front; used by the strategies that decide at
    // arrival time instead of at emission time.
    fn try_claim(&self) -> bool {
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return false;
            }
            if current == u64::MAX {
                return true;
            }
            match self.requested.compare_exchange(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    fn backlog_empty(&self) -> bool {
        match self.strategy {
            BackpressureStrategy::Latest => self.latest.lock().is_none(),
            _ => self.queue.lock().is_empty(),
        }
    }
}

struct BridgeSubscription<T>(Arc<BridgeState<T>>);

impl<T: Send + 'static> Subscription for BridgeSubscription<T> {
    fn request(&self, n: u64) {
        let state = &self.0;
        if n == 0 {
            rill_core::hooks::protocol_violation("request(0) is not a valid demand");
            *state.terminal.lock() = Some(Terminal::Error(RillError::protocol_violation(
                "request(0) is not valid",
            )));
            state.upstream.dispose();
            drain(state);
            return;
        }
        add_demand(&state.requested, n);
        drain(state);
    }

    fn cancel(&self) {
        if self.0.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.0.upstream.dispose();
        self.0.queue.lock().clear();
        self.0.latest.lock().take();
    }
}

struct BridgeObserver<T> {
    state: Arc<BridgeState<T>>,
}

impl<T: Send + 'static> Observer<T> for BridgeObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.state.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        let state = &self.state;
        if state.cancelled.load(Ordering::Acquire) || state.terminated.load(Ordering::Acquire) {
            return;
        }
        match state.strategy {
            BackpressureStrategy::Buffer => {
                state.queue.lock().push_back(value);
            }
            BackpressureStrategy::Latest => {
                *state.latest.lock() = Some(value);
            }
            BackpressureStrategy::Drop => {
                if !state.try_claim() {
                    return;
                }
                state.queue.lock().push_back(value);
            }
            BackpressureStrategy::Error => {
                if state.try_claim() {
                    state.queue.lock().push_back(value);
                } else {
                    *state.terminal.lock() = Some(Terminal::Error(RillError::overflow(
                        "emission without downstream demand",
                    )));
                    state.upstream.dispose();
                }
            }
        }
        drain(state);
    }

    fn on_error(&self, error: RillError) {
        *self.state.terminal.lock() = Some(Terminal::Error(error));
        drain(&self.state);
    }

    fn on_complete(&self) {
        *self.state.terminal.lock() = Some(Terminal::Complete);
        drain(&self.state);
    }
}

fn drain<T: Send + 'static>(state: &Arc<BridgeState<T>>) {
    if !state.gate.enter() {
        return;
    }
    let mut missed = 1;
    loop {
        loop {
            if state.cancelled.load(Ordering::Acquire) {
                state.queue.lock().clear();
                state.latest.lock().take();
                break;
            }
            if state.terminated.load(Ordering::Acquire) {
                break;
            }
            // Buffer/Latest pay credit at emission time; Drop/Error
            // already paid at arrival
            let pay_here = matches!(
                state.strategy,
                BackpressureStrategy::Buffer | BackpressureStrategy::Latest
            );
            if pay_here && state.requested.load(Ordering::Acquire) == 0 {
                break;
            }
            let item = match state.strategy {
                BackpressureStrategy::Latest => state.latest.lock().take(),
                _ => state.queue.lock().pop_front(),
            };
            match item {
                Some(value) => {
                    if pay_here {
                        consume_demand(&state.requested);
                    }
                    state.downstream.on_next(value);
                }
                None => break,
            }
        }
        if !state.cancelled.load(Ordering::Acquire)
            && !state.terminated.load(Ordering::Acquire)
            && state.backlog_empty()
        {
            let terminal = state.terminal.lock().take();
            if let Some(terminal) = terminal {
                if !state.terminated.swap(true, Ordering::AcqRel) {
                    match terminal {
                        Terminal::Complete => state.downstream.on_complete(),
                        Terminal::Error(e) => state.downstream.on_error(e),
                    }
                }
            }
        }
        missed = state.gate.leave(missed);
        if missed == 0 {
            return;
        }
    }
}

impl<T: Send + 'static> Flowable<T> {
    /// Adapts the flow back into an unbounded observable by requesting
    /// unbounded demand up front.
    pub fn into_observable(&self) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |downstream| {
            let link = Arc::new(FlowLink {
                subscription: Mutex::new(None),
                cancelled: AtomicBool::new(false),
            });
            let handle = Arc::clone(&link);
            downstream.on_subscribe(Arc::new(ActionDisposable::new(move || handle.cancel())));
            source.subscribe_subscriber(Arc::new(UnboundedSubscriber { downstream, link }));
        })
    }
}

struct FlowLink {
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    cancelled: AtomicBool,
}

impl FlowLink {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }
}

struct UnboundedSubscriber<T> {
    downstream: Arc<dyn Observer<T>>,
    link: Arc<FlowLink>,
}

impl<T: Send + 'static> Subscriber<T> for UnboundedSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.link.cancelled.load(Ordering::Acquire) {
            subscription.cancel();
            return;
        }
        *self.link.subscription.lock() = Some(subscription.clone());
        subscription.request(u64::MAX);
    }

    fn on_next(&self, value: T) {
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: RillError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}
