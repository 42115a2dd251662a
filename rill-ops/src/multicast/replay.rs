// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_scheduler::Scheduler;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Retained history of a connectable source.
///
/// The publish flavor retains nothing; the replay flavors evict by
/// count (drop-oldest), by age against the scheduler clock, or both.
/// Single writer (the upstream thread) appends; subscriber snapshots
/// read under the owning multicast lock.
pub(crate) struct ReplayBuffer<T> {
    enabled: bool,
    items: VecDeque<Entry<T>>,
    max_size: Option<usize>,
    window: Option<Duration>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

struct Entry<T> {
    at: Duration,
    value: T,
}

impl<T: Clone> ReplayBuffer<T> {
    pub(crate) fn publish() -> Self {
        Self {
            enabled: false,
            items: VecDeque::new(),
            max_size: None,
            window: None,
            scheduler: None,
        }
    }

    pub(crate) fn unbounded() -> Self {
        Self {
            enabled: true,
            items: VecDeque::new(),
            max_size: None,
            window: None,
            scheduler: None,
        }
    }

    pub(crate) fn size_bound(max_size: usize) -> Self {
        Self {
            max_size: Some(max_size.max(1)),
            ..Self::unbounded()
        }
    }

    pub(crate) fn time_bound(window: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            window: Some(window),
            scheduler: Some(scheduler),
            ..Self::unbounded()
        }
    }

    pub(crate) fn size_and_time_bound(
        max_size: usize,
        window: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            max_size: Some(max_size.max(1)),
            window: Some(window),
            scheduler: Some(scheduler),
            ..Self::unbounded()
        }
    }

    fn now(&self) -> Duration {
        self.scheduler
            .as_ref()
            .map_or(Duration::ZERO, |scheduler| scheduler.now())
    }

    pub(crate) fn push(&mut self, value: T) {
        if !self.enabled {
            return;
        }
        let at = self.now();
        self.items.push_back(Entry { at, value });
        self.trim();
    }

    fn trim(&mut self) {
        if let Some(max_size) = self.max_size {
            while self.items.len() > max_size {
                self.items.pop_front();
            }
        }
        if let Some(window) = self.window {
            let horizon = self.now().saturating_sub(window);
            while self
                .items
                .front()
                .is_some_and(|entry| entry.at < horizon)
            {
                self.items.pop_front();
            }
        }
    }

    /// The retained window, oldest first.
    pub(crate) fn snapshot(&mut self) -> Vec<T> {
        self.trim();
        self.items.iter().map(|entry| entry.value.clone()).collect()
    }
}
