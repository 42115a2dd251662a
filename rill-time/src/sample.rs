// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{
    pair, Disposable, Observable, Observer, RillError, SerializedObserver, SubscriptionSlot,
};
use rill_scheduler::{PeriodicWorker, Scheduler};
use std::sync::Arc;
use std::time::Duration;

/// Extension trait providing tick-driven sampling.
pub trait SampleExt<T> {
    /// Emits the latest value received in each `period`; a tick with no
    /// fresh value emits nothing.
    ///
    /// Timer emissions and upstream terminals race on different
    /// threads; the downstream is serialized.
    fn sample(self, period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T>;

    /// Alias of [`sample`](Self::sample): the last value of each window.
    fn throttle_last(self, period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T>;
}

impl<T: Send + 'static> SampleExt<T> for Observable<T> {
    fn sample(self, period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |downstream| {
            let serialized: Arc<dyn Observer<T>> =
                Arc::new(SerializedObserver::new(downstream.clone()));
            let worker = scheduler.create_worker();
            let latest = Arc::new(Mutex::new(None::<T>));
            let observer = Arc::new(SampleObserver {
                downstream: serialized.clone(),
                latest: Arc::clone(&latest),
                worker: worker.clone(),
                upstream: SubscriptionSlot::new(),
            });
            downstream.on_subscribe(pair(
                Arc::new(SlotHandle(observer.clone())),
                worker.clone(),
            ));
            let tick_latest = latest;
            let tick_downstream = serialized;
            worker.schedule_periodic(period, period, move || {
                let fresh = tick_latest.lock().take();
                if let Some(value) = fresh {
                    tick_downstream.on_next(value);
                }
            });
            source.subscribe_observer(observer);
        })
    }

    fn throttle_last(self, period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<T> {
        self.sample(period, scheduler)
    }
}

// Exposes the observer's upstream slot as the disposable half of the
// downstream handle
struct SlotHandle<T>(Arc<SampleObserver<T>>);

impl<T: Send + 'static> Disposable for SlotHandle<T> {
    fn dispose(&self) {
        self.0.upstream.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.0.upstream.is_disposed()
    }
}

struct SampleObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    latest: Arc<Mutex<Option<T>>>,
    worker: Arc<dyn rill_scheduler::Worker>,
    upstream: SubscriptionSlot,
}

impl<T: Send + 'static> Observer<T> for SampleObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.upstream.try_set(disposable);
    }

    fn on_next(&self, value: T) {
        *self.latest.lock() = Some(value);
    }

    fn on_error(&self, error: RillError) {
        self.worker.dispose();
        self.latest.lock().take();
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.worker.dispose();
        self.downstream.on_complete();
    }
}
