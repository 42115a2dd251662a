// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{Disposable, Observable, Observer, RillError, SubscriptionSlot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait extracting single elements.
pub trait ElementsExt<T> {
    /// Emits the first value, then completes and disposes the upstream.
    /// An empty stream fails with a missing-element error.
    fn first(self) -> Observable<T>;

    /// Emits the only value on completion. An empty stream fails with a
    /// missing-element error; a second value fails the stream and
    /// disposes the upstream.
    fn single(self) -> Observable<T>;
}

impl<T: Send + 'static> ElementsExt<T> for Observable<T> {
    fn first(self) -> Observable<T> {
        self.lift(|downstream| {
            Arc::new(FirstObserver {
                downstream,
                upstream: SubscriptionSlot::new(),
                done: AtomicBool::new(false),
            })
        })
    }

    fn single(self) -> Observable<T> {
        self.lift(|downstream| {
            Arc::new(SingleObserver {
                downstream,
                upstream: SubscriptionSlot::new(),
                held: Mutex::new(None),
                done: AtomicBool::new(false),
            })
        })
    }
}

struct FirstObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for FirstObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if self.upstream.try_set(disposable.clone()) {
            self.downstream.on_subscribe(disposable);
        }
    }

    fn on_next(&self, value: T) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.upstream.dispose();
        self.downstream.on_next(value);
        self.downstream.on_complete();
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
        self.downstream
            .on_error(RillError::missing_element("first() on an empty stream"));
    }
}

struct SingleObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    upstream: SubscriptionSlot,
    held: Mutex<Option<T>>,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for SingleObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if self.upstream.try_set(disposable.clone()) {
            self.downstream.on_subscribe(disposable);
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let second = {
            let mut held = self.held.lock();
            if held.is_some() {
                *held = None;
                true
            } else {
                *held = Some(value);
                false
            }
        };
        if second && !self.done.swap(true, Ordering::AcqRel) {
            self.upstream.dispose();
            self.downstream.on_error(RillError::stream_error(
                "single() on a stream with more than one element",
            ));
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
        match self.held.lock().take() {
            Some(value) => {
                self.downstream.on_next(value);
                self.downstream.on_complete();
            }
            None => self
                .downstream
                .on_error(RillError::missing_element("single() on an empty stream")),
        }
    }
}
