// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{Disposable, Observable, Observer, RillError, Signal, SubscriptionSlot};
use std::sync::Arc;

/// Reifies the notification stream into values.
pub trait MaterializeExt<T> {
    /// Turns every notification — values and terminals alike — into a
    /// [`Signal`] value; the result always completes normally.
    fn materialize(self) -> Observable<Signal<T>>;
}

impl<T: Send + 'static> MaterializeExt<T> for Observable<T> {
    fn materialize(self) -> Observable<Signal<T>> {
        self.lift(|downstream| Arc::new(MaterializeObserver { downstream }))
    }
}

struct MaterializeObserver<T> {
    downstream: Arc<dyn Observer<Signal<T>>>,
}

impl<T: Send> Observer<T> for MaterializeObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_next(&self, value: T) {
        self.downstream.on_next(Signal::Next(value));
    }

    fn on_error(&self, error: RillError) {
        self.downstream.on_next(Signal::Error(error));
        self.downstream.on_complete();
    }

    fn on_complete(&self) {
        self.downstream.on_next(Signal::Complete);
        self.downstream.on_complete();
    }
}

/// Collapses reified signals back into the notification stream.
pub trait DematerializeExt<T> {
    /// Interprets each [`Signal`] value as the notification it names.
    /// A terminal signal ends the subscription and disposes upstream.
    fn dematerialize(self) -> Observable<T>;
}

impl<T: Send + 'static> DematerializeExt<T> for Observable<Signal<T>> {
    fn dematerialize(self) -> Observable<T> {
        self.lift(|downstream| {
            Arc::new(DematerializeObserver {
                downstream,
                upstream: SubscriptionSlot::new(),
                done: std::sync::atomic::AtomicBool::new(false),
            })
        })
    }
}

struct DematerializeObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    upstream: SubscriptionSlot,
    done: std::sync::atomic::AtomicBool,
}

use std::sync::atomic::Ordering;

impl<T: Send> Observer<Signal<T>> for DematerializeObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if self.upstream.try_set(disposable.clone()) {
            self.downstream.on_subscribe(disposable);
        }
    }

    fn on_next(&self, signal: Signal<T>) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        match signal {
            Signal::Next(value) => self.downstream.on_next(value),
            Signal::Error(error) => {
                if !self.done.swap(true, Ordering::AcqRel) {
                    self.upstream.dispose();
                    self.downstream.on_error(error);
                }
            }
            Signal::Complete => {
                if !self.done.swap(true, Ordering::AcqRel) {
                    self.upstream.dispose();
                    self.downstream.on_complete();
                }
            }
        }
    }

    fn on_error(&self, error: RillError) {
        if self.done.swap(true, Ordering::AcqRel) {
            rill_core::hooks::undeliverable(error);
            return;
        }
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.downstream.on_complete();
    }
}
