// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicUsize, Ordering};

/// Work-pending counter driving single-drainer loops.
///
/// The protocol: every producer of work calls [`enter`](Self::enter);
/// whoever observes the zero-to-one transition becomes the drainer and
/// loops, processing everything visible, then calling
/// [`leave`](Self::leave) with the amount of work it accounted for.
/// A non-zero remainder means more work arrived mid-drain and the loop
/// continues; zero releases the drain.
///
/// ```
/// use rill_core::DrainGate;
///
/// let gate = DrainGate::new();
/// if gate.enter() {
///     let mut missed = 1;
///     loop {
///         // ... process all pending work ...
///         missed = gate.leave(missed);
///         if missed == 0 {
///             break;
///         }
///     }
/// }
/// ```
#[derive(Default)]
pub struct DrainGate {
    wip: AtomicUsize,
}

impl DrainGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one unit of work. Returns `true` if the caller is now
    /// the drainer.
    pub fn enter(&self) -> bool {
        self.wip.fetch_add(1, Ordering::AcqRel) == 0
    }

    /// Fast-path claim: succeeds only when no work is pending, making
    /// the caller the drainer without queueing. Emit-then-[`leave`]
    /// on success.
    ///
    /// [`leave`]: Self::leave
    pub fn try_claim(&self) -> bool {
        self.wip
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Retires `missed` units of accounted work; returns how many
    /// remain outstanding.
    pub fn leave(&self, missed: usize) -> usize {
        self.wip.fetch_sub(missed, Ordering::AcqRel) - missed
    }
}
