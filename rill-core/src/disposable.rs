// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Composable cancellation tokens.
//!
//! Every subscription hands its consumer a [`Disposable`]. Disposing it
//! prevents future downstream callbacks, propagates upstream and cancels
//! any scheduled work. The primitives here — action, flag, composite,
//! serial and the assign-once slot — compose all operator lifecycle
//! logic in the engine.

use crate::hooks;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An ownership-transferable cancellation token.
///
/// `dispose` is idempotent; once it returns, `is_disposed` reports
/// `true` forever.
pub trait Disposable: Send + Sync {
    /// Cancel the work guarded by this token.
    fn dispose(&self);

    /// Whether this token has been disposed.
    fn is_disposed(&self) -> bool;
}

/// Returns the empty, already-disposed constant.
pub fn disposed() -> Arc<dyn Disposable> {
    Arc::new(EmptyDisposable)
}

struct EmptyDisposable;

impl Disposable for EmptyDisposable {
    fn dispose(&self) {}

    fn is_disposed(&self) -> bool {
        true
    }
}

/// A plain boolean cancellation token with no attached behavior.
#[derive(Default)]
pub struct FlagDisposable {
    flag: AtomicBool,
}

impl FlagDisposable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Disposable for FlagDisposable {
    fn dispose(&self) {
        self.flag.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Runs a callback at most once, on the first `dispose`.
pub struct ActionDisposable {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ActionDisposable {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }
}

impl Disposable for ActionDisposable {
    fn dispose(&self) {
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    fn is_disposed(&self) -> bool {
        self.action.lock().is_none()
    }
}

/// Owns a set of child disposables.
///
/// Disposing the container disposes every child and forbids further
/// adds: a late `add` disposes its argument immediately and returns
/// `false`.
#[derive(Default)]
pub struct CompositeDisposable {
    // None once disposed
    children: Mutex<Option<Vec<Arc<dyn Disposable>>>>,
}

impl CompositeDisposable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a child, or disposes it immediately if the container is
    /// already disposed.
    pub fn add(&self, child: Arc<dyn Disposable>) -> bool {
        {
            let mut guard = self.children.lock();
            if let Some(children) = guard.as_mut() {
                children.push(child);
                return true;
            }
        }
        child.dispose();
        false
    }

    /// Removes a child without disposing it. Identity is by allocation.
    pub fn delete(&self, child: &Arc<dyn Disposable>) -> bool {
        let mut guard = self.children.lock();
        if let Some(children) = guard.as_mut() {
            if let Some(pos) = children.iter().position(|c| Arc::ptr_eq(c, child)) {
                children.swap_remove(pos);
                return true;
            }
        }
        false
    }

    /// Removes a child and disposes it.
    pub fn remove(&self, child: &Arc<dyn Disposable>) -> bool {
        if self.delete(child) {
            child.dispose();
            return true;
        }
        false
    }

    /// Disposes all current children; the container stays usable.
    pub fn clear(&self) {
        let drained = {
            let mut guard = self.children.lock();
            guard.as_mut().map(std::mem::take)
        };
        if let Some(children) = drained {
            for child in children {
                child.dispose();
            }
        }
    }

    /// Number of children currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.lock().as_ref().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Disposable for CompositeDisposable {
    fn dispose(&self) {
        let drained = self.children.lock().take();
        if let Some(children) = drained {
            for child in children {
                child.dispose();
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.children.lock().is_none()
    }
}

enum SerialState {
    Active(Option<Arc<dyn Disposable>>),
    Disposed,
}

/// Holds at most one child disposable.
///
/// Replacing the child disposes the previous one; disposing the serial
/// disposes the held child and rejects (disposes) all future sets.
pub struct SerialDisposable {
    state: Mutex<SerialState>,
}

impl Default for SerialDisposable {
    fn default() -> Self {
        Self {
            state: Mutex::new(SerialState::Active(None)),
        }
    }
}

impl SerialDisposable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `child`, disposing whatever was held before.
    ///
    /// Returns `false` (and disposes `child`) if the serial itself has
    /// already been disposed.
    pub fn set(&self, child: Arc<dyn Disposable>) -> bool {
        let prior = {
            let mut guard = self.state.lock();
            match &mut *guard {
                SerialState::Active(slot) => slot.replace(child),
                SerialState::Disposed => {
                    drop(guard);
                    child.dispose();
                    return false;
                }
            }
        };
        if let Some(prior) = prior {
            prior.dispose();
        }
        true
    }
}

impl Disposable for SerialDisposable {
    fn dispose(&self) {
        let held = {
            let mut guard = self.state.lock();
            match std::mem::replace(&mut *guard, SerialState::Disposed) {
                SerialState::Active(slot) => slot,
                SerialState::Disposed => None,
            }
        };
        if let Some(held) = held {
            held.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        matches!(*self.state.lock(), SerialState::Disposed)
    }
}

enum SlotState {
    Empty,
    Set(Arc<dyn Disposable>),
    Disposed,
}

/// The assign-once upstream slot of the subscribe handshake.
///
/// The first `try_set` wins. A second assignment is a protocol
/// violation: the newcomer is disposed and the global hook notified.
/// Assigning into a disposed slot disposes the argument immediately,
/// which resolves the "synchronous termination during subscription"
/// race — the upstream may already be gone by the time its handle
/// arrives.
pub struct SubscriptionSlot {
    state: Mutex<SlotState>,
}

impl Default for SubscriptionSlot {
    fn default() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty),
        }
    }
}

impl SubscriptionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts the one-time assignment.
    pub fn try_set(&self, disposable: Arc<dyn Disposable>) -> bool {
        let already_set = {
            let mut guard = self.state.lock();
            match &*guard {
                SlotState::Empty => {
                    *guard = SlotState::Set(disposable);
                    return true;
                }
                SlotState::Set(_) => true,
                SlotState::Disposed => false,
            }
        };
        disposable.dispose();
        if already_set {
            hooks::protocol_violation("on_subscribe called more than once");
        }
        false
    }
}

impl Disposable for SubscriptionSlot {
    fn dispose(&self) {
        let held = {
            let mut guard = self.state.lock();
            match std::mem::replace(&mut *guard, SlotState::Disposed) {
                SlotState::Set(d) => Some(d),
                _ => None,
            }
        };
        if let Some(held) = held {
            held.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Disposed)
    }
}

/// Bundles two disposables into one.
pub fn pair(first: Arc<dyn Disposable>, second: Arc<dyn Disposable>) -> Arc<dyn Disposable> {
    let composite = CompositeDisposable::new();
    composite.add(first);
    composite.add(second);
    Arc::new(composite)
}
