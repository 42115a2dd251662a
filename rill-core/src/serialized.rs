// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::disposable::Disposable;
use crate::observer::Observer;
use crate::{hooks, RillError, Signal};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Serializes callbacks onto a downstream observer.
///
/// Emissions arriving while another thread is mid-delivery are queued
/// and drained by the thread currently holding the emission right, so
/// the downstream never observes concurrent callbacks. Errors jump the
/// queue ahead of buffered values; signals after the terminal are
/// dropped (errors to the global hook).
pub struct SerializedObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    state: Mutex<SerializeState<T>>,
}

struct SerializeState<T> {
    emitting: bool,
    done: bool,
    queue: VecDeque<Signal<T>>,
}

impl<T: Send + 'static> SerializedObserver<T> {
    pub fn new(downstream: Arc<dyn Observer<T>>) -> Self {
        Self {
            downstream,
            state: Mutex::new(SerializeState {
                emitting: false,
                done: false,
                queue: VecDeque::new(),
            }),
        }
    }

    fn drain(&self) {
        loop {
            let signal = {
                let mut state = self.state.lock();
                match state.queue.pop_front() {
                    Some(signal) => signal,
                    None => {
                        state.emitting = false;
                        return;
                    }
                }
            };
            match signal {
                Signal::Next(v) => self.downstream.on_next(v),
                Signal::Error(e) => {
                    self.downstream.on_error(e);
                    return;
                }
                Signal::Complete => {
                    self.downstream.on_complete();
                    return;
                }
            }
        }
    }
}

impl<T: Send + 'static> Observer<T> for SerializedObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_next(&self, value: T) {
        {
            let mut state = self.state.lock();
            if state.done {
                return;
            }
            if state.emitting {
                state.queue.push_back(Signal::Next(value));
                return;
            }
            state.emitting = true;
        }
        self.downstream.on_next(value);
        self.drain();
    }

    fn on_error(&self, error: RillError) {
        {
            let mut state = self.state.lock();
            if state.done {
                drop(state);
                hooks::undeliverable(error);
                return;
            }
            state.done = true;
            if state.emitting {
                // Errors cut ahead of any values still queued
                state.queue.push_front(Signal::Error(error));
                return;
            }
            state.emitting = true;
        }
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        {
            let mut state = self.state.lock();
            if state.done {
                return;
            }
            state.done = true;
            if state.emitting {
                state.queue.push_back(Signal::Complete);
                return;
            }
            state.emitting = true;
        }
        self.downstream.on_complete();
    }
}
