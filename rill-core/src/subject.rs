// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::disposable::{ActionDisposable, Disposable};
use crate::observer::Observer;
use crate::signal::Terminal;
use crate::{hooks, Observable, RillError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A hot source that fans values out to all current subscribers.
///
/// `PublishSubject` is the entry point for pushing values into a
/// pipeline by hand, and the signal carrier inside `retry_when` /
/// `repeat_when`. Late subscribers do not receive earlier values; the
/// terminal is latched and replayed to anyone arriving after it.
///
/// Emission methods must not be called concurrently with each other —
/// the subject fans out on the caller's thread. Wrap the caller side
/// with a `SerializedObserver` when producers race.
pub struct PublishSubject<T> {
    state: Arc<SubjectState<T>>,
}

impl<T> Clone for PublishSubject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

struct SubjectState<T> {
    subscribers: Mutex<Vec<Arc<SubjectSlot<T>>>>,
    terminal: Mutex<Option<Terminal>>,
    done: AtomicBool,
}

struct SubjectSlot<T> {
    observer: Arc<dyn Observer<T>>,
    disposed: AtomicBool,
}

impl<T: Clone + Send + 'static> Default for PublishSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> PublishSubject<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(SubjectState {
                subscribers: Mutex::new(Vec::new()),
                terminal: Mutex::new(None),
                done: AtomicBool::new(false),
            }),
        }
    }

    /// The subscribable face of this subject.
    pub fn observable(&self) -> Observable<T> {
        let state = Arc::clone(&self.state);
        Observable::new(move |downstream| {
            let slot = Arc::new(SubjectSlot {
                observer: downstream.clone(),
                disposed: AtomicBool::new(false),
            });
            let state_for_dispose = Arc::clone(&state);
            let slot_for_dispose = Arc::clone(&slot);
            downstream.on_subscribe(Arc::new(ActionDisposable::new(move || {
                slot_for_dispose.disposed.store(true, Ordering::Release);
                state_for_dispose
                    .subscribers
                    .lock()
                    .retain(|s| !Arc::ptr_eq(s, &slot_for_dispose));
            })));

            // Latched terminal wins over registration
            let latched = {
                let terminal = state.terminal.lock();
                match &*terminal {
                    Some(t) => Some(t.clone()),
                    None => {
                        state.subscribers.lock().push(slot);
                        None
                    }
                }
            };
            if let Some(terminal) = latched {
                match terminal {
                    Terminal::Complete => downstream.on_complete(),
                    Terminal::Error(e) => downstream.on_error(e),
                }
            }
        })
    }

    /// Pushes a value to all current subscribers.
    pub fn next(&self, value: T) {
        if self.state.done.load(Ordering::Acquire) {
            return;
        }
        for slot in self.snapshot() {
            if !slot.disposed.load(Ordering::Acquire) {
                slot.observer.on_next(value.clone());
            }
        }
    }

    /// Terminates all current and future subscribers with an error.
    pub fn error(&self, error: RillError) {
        if self.state.done.swap(true, Ordering::AcqRel) {
            hooks::undeliverable(error);
            return;
        }
        *self.state.terminal.lock() = Some(Terminal::Error(error.clone()));
        for slot in self.drain_subscribers() {
            if !slot.disposed.load(Ordering::Acquire) {
                slot.observer.on_error(error.clone());
            }
        }
    }

    /// Completes all current and future subscribers.
    pub fn complete(&self) {
        if self.state.done.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.state.terminal.lock() = Some(Terminal::Complete);
        for slot in self.drain_subscribers() {
            if !slot.disposed.load(Ordering::Acquire) {
                slot.observer.on_complete();
            }
        }
    }

    /// Whether a terminal has been latched.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state.done.load(Ordering::Acquire)
    }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.subscribers.lock().len()
    }

    fn snapshot(&self) -> Vec<Arc<SubjectSlot<T>>> {
        self.state.subscribers.lock().clone()
    }

    fn drain_subscribers(&self) -> Vec<Arc<SubjectSlot<T>>> {
        std::mem::take(&mut *self.state.subscribers.lock())
    }
}

impl<T: Clone + Send + 'static> Observer<T> for PublishSubject<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        if self.is_terminated() {
            disposable.dispose();
        }
    }

    fn on_next(&self, value: T) {
        self.next(value);
    }

    fn on_error(&self, error: RillError) {
        self.error(error);
    }

    fn on_complete(&self) {
        self.complete();
    }
}
