// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::disposable::{ActionDisposable, Disposable};
use crate::gate::DrainGate;
use crate::observer::Observer;
use crate::signal::Terminal;
use crate::{hooks, Observable, Result, RillError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a bounded queue does when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Terminate the stream with an overflow error
    Error,
    /// Silently drop the incoming item
    DropNewest,
}

/// A single-consumer subject that queues until its consumer arrives.
///
/// The building block of `group_by` groups and `window` windows: the
/// producer side pushes values immediately, the (at most one) consumer
/// may subscribe later and receives the backlog first, in order. A
/// second subscription observes a protocol error.
///
/// Disposing the consumer side marks the subject *abandoned*: pending
/// and future values are discarded and the abandon callback, if any,
/// fires once (group-key eviction hangs off this).
pub struct UnicastSubject<T> {
    state: Arc<UnicastState<T>>,
}

impl<T> Clone for UnicastSubject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

struct UnicastState<T> {
    inner: Mutex<UnicastInner<T>>,
    gate: DrainGate,
    abandoned: AtomicBool,
    on_abandon: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

struct UnicastInner<T> {
    queue: VecDeque<T>,
    capacity: Option<usize>,
    policy: OverflowPolicy,
    observer: Option<Arc<dyn Observer<T>>>,
    consumed: bool,
    terminal: Option<Terminal>,
    terminal_sent: bool,
}

impl<T: Send + 'static> Default for UnicastSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> UnicastSubject<T> {
    /// An unbounded unicast subject.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(None, OverflowPolicy::Error)
    }

    /// A unicast subject with a bounded backlog.
    #[must_use]
    pub fn bounded(capacity: usize, policy: OverflowPolicy) -> Self {
        Self::with_capacity(Some(capacity), policy)
    }

    fn with_capacity(capacity: Option<usize>, policy: OverflowPolicy) -> Self {
        Self {
            state: Arc::new(UnicastState {
                inner: Mutex::new(UnicastInner {
                    queue: VecDeque::new(),
                    capacity,
                    policy,
                    observer: None,
                    consumed: false,
                    terminal: None,
                    terminal_sent: false,
                }),
                gate: DrainGate::new(),
                abandoned: AtomicBool::new(false),
                on_abandon: Mutex::new(None),
            }),
        }
    }

    /// Registers the callback fired once when the consumer abandons the
    /// subject.
    pub fn set_on_abandon(&self, callback: impl FnOnce() + Send + 'static) {
        *self.state.on_abandon.lock() = Some(Box::new(callback));
    }

    /// Pushes a value.
    ///
    /// Returns the overflow error (without delivering it) when the
    /// backlog is full under [`OverflowPolicy::Error`]; the caller
    /// decides whether that poisons a wider stream.
    pub fn try_push(&self, value: T) -> Result<()> {
        {
            let mut inner = self.state.inner.lock();
            if inner.terminal.is_some() || self.state.abandoned.load(Ordering::Acquire) {
                return Ok(());
            }
            // The bound applies to the undelivered backlog only
            if inner.observer.is_none() {
                if let Some(capacity) = inner.capacity {
                    if inner.queue.len() >= capacity {
                        match inner.policy {
                            OverflowPolicy::DropNewest => return Ok(()),
                            OverflowPolicy::Error => {
                                let error = RillError::overflow(format!(
                                    "unicast backlog exceeded {capacity} items"
                                ));
                                inner.terminal = Some(Terminal::Error(error.clone()));
                                drop(inner);
                                drain(&self.state);
                                return Err(error);
                            }
                        }
                    }
                }
            }
            inner.queue.push_back(value);
        }
        drain(&self.state);
        Ok(())
    }

    /// Pushes a value, routing a poisoning overflow into the subject
    /// itself.
    pub fn push(&self, value: T) {
        let _ = self.try_push(value);
    }

    /// Terminates the subject with an error.
    pub fn error(&self, error: RillError) {
        {
            let mut inner = self.state.inner.lock();
            if inner.terminal.is_some() {
                drop(inner);
                hooks::undeliverable(error);
                return;
            }
            inner.terminal = Some(Terminal::Error(error));
        }
        drain(&self.state);
    }

    /// Completes the subject; the backlog is still delivered first.
    pub fn complete(&self) {
        {
            let mut inner = self.state.inner.lock();
            if inner.terminal.is_some() {
                return;
            }
            inner.terminal = Some(Terminal::Complete);
        }
        drain(&self.state);
    }

    /// Cuts the subject off from its consumer, discarding the backlog.
    pub fn dispose(&self) {
        abandon(&self.state);
    }

    /// The consumable face of this subject.
    pub fn observable(&self) -> Observable<T> {
        let state = Arc::clone(&self.state);
        Observable::new(move |downstream| {
            let state_for_dispose = Arc::clone(&state);
            downstream.on_subscribe(Arc::new(ActionDisposable::new(move || {
                abandon(&state_for_dispose);
            })));

            {
                let mut inner = state.inner.lock();
                if inner.consumed {
                    drop(inner);
                    downstream.on_error(RillError::protocol_violation(
                        "unicast subject supports exactly one subscriber",
                    ));
                    return;
                }
                inner.consumed = true;
                inner.observer = Some(downstream);
            }
            drain(&state);
        })
    }
}

fn abandon<T>(state: &Arc<UnicastState<T>>) {
    if state.abandoned.swap(true, Ordering::AcqRel) {
        return;
    }
    {
        let mut inner = state.inner.lock();
        inner.queue.clear();
        inner.observer = None;
    }
    let callback = state.on_abandon.lock().take();
    if let Some(callback) = callback {
        callback();
    }
}

fn drain<T>(state: &Arc<UnicastState<T>>) {
    if !state.gate.enter() {
        return;
    }
    let mut missed = 1;
    loop {
        loop {
            if state.abandoned.load(Ordering::Acquire) {
                state.inner.lock().queue.clear();
                break;
            }
            let step = {
                let mut inner = state.inner.lock();
                let Some(observer) = inner.observer.clone() else {
                    break;
                };
                if let Some(value) = inner.queue.pop_front() {
                    DrainStep::Value(observer, value)
                } else if let Some(terminal) = inner.terminal.clone() {
                    if inner.terminal_sent {
                        break;
                    }
                    inner.terminal_sent = true;
                    DrainStep::Terminal(observer, terminal)
                } else {
                    break;
                }
            };
            match step {
                DrainStep::Value(observer, value) => observer.on_next(value),
                DrainStep::Terminal(observer, terminal) => {
                    match terminal {
                        Terminal::Complete => observer.on_complete(),
                        Terminal::Error(e) => observer.on_error(e),
                    }
                    state.inner.lock().observer = None;
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

enum DrainStep<T> {
    Value(Arc<dyn Observer<T>>, T),
    Terminal(Arc<dyn Observer<T>>, Terminal),
}
