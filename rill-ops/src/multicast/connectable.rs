// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::multicast::replay::ReplayBuffer;
use parking_lot::Mutex;
use rill_core::{
    disposed, ActionDisposable, Disposable, DrainGate, Observable, Observer, RillError, Terminal,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A source that shares one upstream subscription among its
/// subscribers, activated explicitly through [`connect`](Self::connect).
///
/// Subscribers register at any time; emissions fan out to everyone
/// currently registered, prefixed by whatever the replay buffer
/// retains. The upstream terminal is latched and replayed to future
/// subscribers. At most one upstream subscription is live at a time;
/// disconnecting allows a later reconnect unless the terminal latched.
pub struct ConnectableObservable<T> {
    core: Arc<MulticastCore<T>>,
}

impl<T> Clone for ConnectableObservable<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

struct MulticastCore<T> {
    source: Observable<T>,
    inner: Mutex<MulticastInner<T>>,
}

struct MulticastInner<T> {
    buffer: ReplayBuffer<T>,
    subscribers: Vec<Arc<MulticastSlot<T>>>,
    terminal: Option<Terminal>,
    connected: bool,
    generation: u64,
    connection: Option<Arc<dyn Disposable>>,
}

struct MulticastSlot<T> {
    observer: Arc<dyn Observer<T>>,
    queue: Mutex<VecDeque<T>>,
    terminal: Mutex<Option<Terminal>>,
    gate: DrainGate,
    disposed: AtomicBool,
}

impl<T: Clone + Send + 'static> ConnectableObservable<T> {
    pub(crate) fn new(source: Observable<T>, buffer: ReplayBuffer<T>) -> Self {
        Self {
            core: Arc::new(MulticastCore {
                source,
                inner: Mutex::new(MulticastInner {
                    buffer,
                    subscribers: Vec::new(),
                    terminal: None,
                    connected: false,
                    generation: 0,
                    connection: None,
                }),
            }),
        }
    }

    /// The subscribable face; registering does not connect.
    pub fn observable(&self) -> Observable<T> {
        let core = Arc::clone(&self.core);
        Observable::new(move |downstream| {
            let slot = Arc::new(MulticastSlot {
                observer: downstream.clone(),
                queue: Mutex::new(VecDeque::new()),
                terminal: Mutex::new(None),
                gate: DrainGate::new(),
                disposed: AtomicBool::new(false),
            });
            let dispose_core = Arc::clone(&core);
            let dispose_slot = Arc::clone(&slot);
            downstream.on_subscribe(Arc::new(ActionDisposable::new(move || {
                dispose_slot.disposed.store(true, Ordering::Release);
                dispose_slot.queue.lock().clear();
                dispose_core
                    .inner
                    .lock()
                    .subscribers
                    .retain(|s| !Arc::ptr_eq(s, &dispose_slot));
            })));
            {
                let mut inner = core.inner.lock();
                let backlog = inner.buffer.snapshot();
                slot.queue.lock().extend(backlog);
                let latched = inner.terminal.clone();
                match latched {
                    Some(terminal) => *slot.terminal.lock() = Some(terminal),
                    None => inner.subscribers.push(Arc::clone(&slot)),
                }
            }
            drain_slot(&slot);
        })
    }

    /// Subscribes the upstream if no connection is live. Returns the
    /// connection handle; disposing it disconnects.
    pub fn connect(&self) -> Arc<dyn Disposable> {
        let generation = {
            let mut inner = self.core.inner.lock();
            if inner.terminal.is_some() {
                return disposed();
            }
            if inner.connected {
                return Arc::new(ConnectionHandle {
                    core: Arc::clone(&self.core),
                    generation: inner.generation,
                });
            }
            inner.connected = true;
            inner.generation += 1;
            inner.generation
        };
        self.core
            .source
            .subscribe_observer(Arc::new(ConnectionObserver {
                core: Arc::clone(&self.core),
                generation,
            }));
        Arc::new(ConnectionHandle {
            core: Arc::clone(&self.core),
            generation,
        })
    }

    /// Auto-connects on the first subscriber and disconnects the
    /// upstream when the last one leaves.
    pub fn ref_count(&self) -> Observable<T> {
        crate::multicast::ref_count::ref_count(self.clone())
    }
}

struct ConnectionHandle<T> {
    core: Arc<MulticastCore<T>>,
    generation: u64,
}

impl<T: Send + 'static> Disposable for ConnectionHandle<T> {
    fn dispose(&self) {
        let connection = {
            let mut inner = self.core.inner.lock();
            if inner.generation != self.generation || !inner.connected {
                return;
            }
            inner.connected = false;
            inner.connection.take()
        };
        if let Some(connection) = connection {
            connection.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        let inner = self.core.inner.lock();
        inner.generation != self.generation || !inner.connected
    }
}

struct ConnectionObserver<T> {
    core: Arc<MulticastCore<T>>,
    generation: u64,
}

impl<T> ConnectionObserver<T> {
    fn is_current(&self, inner: &MulticastInner<T>) -> bool {
        inner.generation == self.generation && inner.connected
    }
}

impl<T: Clone + Send + 'static> Observer<T> for ConnectionObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        let mut inner = self.core.inner.lock();
        if self.is_current(&inner) && inner.connection.is_none() {
            inner.connection = Some(disposable);
        } else {
            drop(inner);
            disposable.dispose();
        }
    }

    fn on_next(&self, value: T) {
        let slots = {
            let mut inner = self.core.inner.lock();
            if !self.is_current(&inner) {
                return;
            }
            inner.buffer.push(value.clone());
            for slot in &inner.subscribers {
                slot.queue.lock().push_back(value.clone());
            }
            inner.subscribers.clone()
        };
        for slot in slots {
            drain_slot(&slot);
        }
    }

    fn on_error(&self, error: RillError) {
        self.terminate(Terminal::Error(error));
    }

    fn on_complete(&self) {
        self.terminate(Terminal::Complete);
    }
}

impl<T: Clone + Send + 'static> ConnectionObserver<T> {
    fn terminate(&self, terminal: Terminal) {
        let slots = {
            let mut inner = self.core.inner.lock();
            if !self.is_current(&inner) {
                if let Terminal::Error(error) = terminal {
                    rill_core::hooks::undeliverable(error);
                }
                return;
            }
            inner.terminal = Some(terminal.clone());
            inner.connected = false;
            inner.connection = None;
            for slot in &inner.subscribers {
                *slot.terminal.lock() = Some(terminal.clone());
            }
            std::mem::take(&mut inner.subscribers)
        };
        for slot in slots {
            drain_slot(&slot);
        }
    }
}

fn drain_slot<T: Clone + Send + 'static>(slot: &Arc<MulticastSlot<T>>) {
    if !slot.gate.enter() {
        return;
    }
    let mut missed = 1;
    loop {
        loop {
            if slot.disposed.load(Ordering::Acquire) {
                slot.queue.lock().clear();
                break;
            }
            let next = slot.queue.lock().pop_front();
            match next {
                Some(value) => slot.observer.on_next(value),
                None => {
                    let terminal = slot.terminal.lock().take();
                    if let Some(terminal) = terminal {
                        if !slot.disposed.swap(true, Ordering::AcqRel) {
                            match terminal {
                                Terminal::Complete => slot.observer.on_complete(),
                                Terminal::Error(e) => slot.observer.on_error(e),
                            }
                        }
                    }
                    break;
                }
            }
        }
        missed = slot.gate.leave(missed);
        if missed == 0 {
            return;
        }
    }
}
