// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{
    Disposable, Observable, Observer, OverflowPolicy, RillError, SubscriptionSlot, UnicastSubject,
};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// One key's sub-stream produced by [`GroupByExt::group_by`].
pub struct GroupedObservable<K, T> {
    key: K,
    source: Observable<T>,
}

impl<K, T> GroupedObservable<K, T> {
    /// The key every value of this group maps to.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The group's value stream. At most one subscriber; cancelling it
    /// abandons the group and evicts the key.
    pub fn observable(&self) -> Observable<T> {
        self.source.clone()
    }
}

/// Extension trait providing the `group_by` operators.
pub trait GroupByExt<T> {
    /// Routes each value into a per-key group stream.
    ///
    /// A new group is emitted downstream the first time a key appears.
    /// Groups terminate with the upstream; cancelling the main
    /// subscription disposes the upstream and all groups; cancelling a
    /// single group evicts its key, so a later value for it starts a
    /// fresh group.
    ///
    /// Each group buffers undelivered values in a bounded queue
    /// (capacity 128); overflow fails the whole stream. Use
    /// [`group_by_with`](Self::group_by_with) to tune both.
    fn group_by<K>(
        self,
        key_selector: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<GroupedObservable<K, T>>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static;

    /// [`group_by`](Self::group_by) with an explicit per-group queue
    /// capacity and overflow policy. `DropNewest` discards the
    /// overflowing value instead of failing the stream.
    fn group_by_with<K>(
        self,
        capacity: usize,
        policy: OverflowPolicy,
        key_selector: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<GroupedObservable<K, T>>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static;
}

impl<T: Send + 'static> GroupByExt<T> for Observable<T> {
    fn group_by<K>(
        self,
        key_selector: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<GroupedObservable<K, T>>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
    {
        self.group_by_with(crate::DEFAULT_BUFFER_SIZE, OverflowPolicy::Error, key_selector)
    }

    fn group_by_with<K>(
        self,
        capacity: usize,
        policy: OverflowPolicy,
        key_selector: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Observable<GroupedObservable<K, T>>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
    {
        let source = self.clone();
        let key_selector = Arc::new(key_selector);
        Observable::new(move |downstream| {
            let state = Arc::new(GroupByState {
                downstream,
                key_selector: key_selector.clone(),
                capacity,
                policy,
                groups: Arc::new(Mutex::new(Some(HashMap::new()))),
                upstream: SubscriptionSlot::new(),
                cancelled: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
            });
            state
                .downstream
                .on_subscribe(Arc::new(GroupByDisposable(state.clone())));
            source.subscribe_observer(state);
        })
    }
}

type GroupMap<K, T> = Arc<Mutex<Option<HashMap<K, UnicastSubject<T>>>>>;

struct GroupByState<K, T> {
    downstream: Arc<dyn Observer<GroupedObservable<K, T>>>,
    key_selector: Arc<dyn Fn(&T) -> K + Send + Sync>,
    capacity: usize,
    policy: OverflowPolicy,
    // None once the main subscription ended; group cancellation holds a
    // weak handle so an abandoned group cannot keep the operator alive
    groups: GroupMap<K, T>,
    upstream: SubscriptionSlot,
    cancelled: AtomicBool,
    terminated: AtomicBool,
}

struct GroupByDisposable<K, T>(Arc<GroupByState<K, T>>);

impl<K, T> Disposable for GroupByDisposable<K, T>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    T: Send + 'static,
{
    fn dispose(&self) {
        if self.0.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.0.upstream.dispose();
        let drained = self.0.groups.lock().take();
        if let Some(groups) = drained {
            for group in groups.into_values() {
                group.dispose();
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }
}

impl<K, T> Observer<T> for GroupByState<K, T>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    T: Send + 'static,
{
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        if self.cancelled.load(Ordering::Acquire) || self.terminated.load(Ordering::Acquire) {
            return;
        }
        let key = (self.key_selector)(&value);
        let (group, fresh) = {
            let mut guard = self.groups.lock();
            let Some(groups) = guard.as_mut() else {
                return;
            };
            match groups.get(&key) {
                Some(group) => (group.clone(), None),
                None => {
                    let group = UnicastSubject::bounded(self.capacity, self.policy);
                    let map = Arc::downgrade(&self.groups);
                    let evict_key = key.clone();
                    group.set_on_abandon(move || evict(&map, &evict_key));
                    groups.insert(key.clone(), group.clone());
                    (group.clone(), Some(key))
                }
            }
        };
        if let Some(key) = fresh {
            self.downstream.on_next(GroupedObservable {
                key,
                source: group.observable(),
            });
        }
        if let Err(overflow) = group.try_push(value) {
            // An erroring bounded group poisons the whole stream
            if !self.terminated.swap(true, Ordering::AcqRel) {
                self.upstream.dispose();
                self.finish_groups(Some(overflow.clone()));
                self.downstream.on_error(overflow);
            }
        }
    }

    fn on_error(&self, error: RillError) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            rill_core::hooks::undeliverable(error);
            return;
        }
        self.finish_groups(Some(error.clone()));
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.finish_groups(None);
        self.downstream.on_complete();
    }
}

impl<K, T> GroupByState<K, T>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    T: Send + 'static,
{
    fn finish_groups(&self, error: Option<RillError>) {
        let drained = self.groups.lock().take();
        if let Some(groups) = drained {
            for group in groups.into_values() {
                match &error {
                    Some(error) => group.error(error.clone()),
                    None => group.complete(),
                }
            }
        }
    }
}

fn evict<K, T>(map: &Weak<Mutex<Option<HashMap<K, UnicastSubject<T>>>>>, key: &K)
where
    K: Eq + Hash,
{
    if let Some(map) = map.upgrade() {
        if let Some(groups) = map.lock().as_mut() {
            groups.remove(key);
        }
    }
}
