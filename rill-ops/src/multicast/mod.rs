// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Multicast operators: sharing one upstream among many subscribers.

mod connectable;
mod ref_count;
mod replay;

pub use connectable::ConnectableObservable;

use replay::ReplayBuffer;
use rill_core::Observable;
use rill_scheduler::Scheduler;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing the multicast operators.
pub trait MulticastExt<T: Clone> {
    /// Shares the upstream without retention: late subscribers see only
    /// subsequent emissions.
    fn publish(self) -> ConnectableObservable<T>;

    /// Shares the upstream retaining the full history.
    fn replay(self) -> ConnectableObservable<T>;

    /// Shares the upstream retaining the last `count` values.
    fn replay_bounded(self, count: usize) -> ConnectableObservable<T>;

    /// Shares the upstream retaining values younger than `window` on
    /// the scheduler's clock.
    fn replay_time(self, window: Duration, scheduler: Arc<dyn Scheduler>)
        -> ConnectableObservable<T>;

    /// Shares the upstream retaining at most `count` values younger
    /// than `window`.
    fn replay_size_and_time(
        self,
        count: usize,
        window: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> ConnectableObservable<T>;

    /// `publish().ref_count()`: connects on the first subscriber,
    /// disconnects on the transition back to zero.
    fn share(self) -> Observable<T>;

    /// Unbounded replay that connects on the first subscriber and never
    /// disconnects; every later subscriber sees the full history.
    fn cache(self) -> Observable<T>;
}

impl<T: Clone + Send + 'static> MulticastExt<T> for Observable<T> {
    fn publish(self) -> ConnectableObservable<T> {
        ConnectableObservable::new(self, ReplayBuffer::publish())
    }

    fn replay(self) -> ConnectableObservable<T> {
        ConnectableObservable::new(self, ReplayBuffer::unbounded())
    }

    fn replay_bounded(self, count: usize) -> ConnectableObservable<T> {
        ConnectableObservable::new(self, ReplayBuffer::size_bound(count))
    }

    fn replay_time(
        self,
        window: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> ConnectableObservable<T> {
        ConnectableObservable::new(self, ReplayBuffer::time_bound(window, scheduler))
    }

    fn replay_size_and_time(
        self,
        count: usize,
        window: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> ConnectableObservable<T> {
        ConnectableObservable::new(self, ReplayBuffer::size_and_time_bound(count, window, scheduler))
    }

    fn share(self) -> Observable<T> {
        self.publish().ref_count()
    }

    fn cache(self) -> Observable<T> {
        let connectable = self.replay();
        let started = Arc::new(AtomicBool::new(false));
        Observable::new(move |downstream| {
            connectable.observable().subscribe_observer(downstream);
            if !started.swap(true, Ordering::AcqRel) {
                connectable.connect();
            }
        })
    }
}
