// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{Disposable, Observable, Observer, RillError, SerialDisposable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Extension trait providing error recovery operators.
pub trait OnErrorExt<T> {
    /// Replaces an error terminal with one value and a completion.
    ///
    /// ```
    /// use rill_core::{Observable, RillError};
    /// use rill_ops::OnErrorExt;
    ///
    /// let recovered = Observable::<i32>::error(RillError::stream_error("boom"))
    ///     .on_error_return(|_| -1);
    /// let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    /// let sink = seen.clone();
    /// recovered.subscribe(move |v| sink.lock().push(v));
    /// assert_eq!(*seen.lock(), vec![-1]);
    /// ```
    fn on_error_return(self, recover: impl Fn(&RillError) -> T + Send + Sync + 'static)
        -> Observable<T>;

    /// Switches to a fallback source on error. Errors of the fallback
    /// itself pass through.
    fn on_error_resume_next(
        self,
        resume: impl Fn(&RillError) -> Observable<T> + Send + Sync + 'static,
    ) -> Observable<T>;
}

impl<T: Send + 'static> OnErrorExt<T> for Observable<T> {
    fn on_error_return(
        self,
        recover: impl Fn(&RillError) -> T + Send + Sync + 'static,
    ) -> Observable<T> {
        let recover = Arc::new(recover);
        self.lift(move |downstream| {
            Arc::new(OnErrorReturnObserver {
                downstream,
                recover: recover.clone(),
                done: AtomicBool::new(false),
            })
        })
    }

    fn on_error_resume_next(
        self,
        resume: impl Fn(&RillError) -> Observable<T> + Send + Sync + 'static,
    ) -> Observable<T> {
        let source = self.clone();
        let resume = Arc::new(resume);
        Observable::new(move |downstream| {
            let shared = Arc::new(ResumeShared {
                downstream,
                upstream: Arc::new(SerialDisposable::new()),
                handshook: AtomicBool::new(false),
                resumed: AtomicBool::new(false),
            });
            source.subscribe_observer(Arc::new(ResumeObserver {
                shared,
                resume: resume.clone(),
            }));
        })
    }
}

struct OnErrorReturnObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    recover: Arc<dyn Fn(&RillError) -> T + Send + Sync>,
    done: AtomicBool,
}

impl<T: Send> Observer<T> for OnErrorReturnObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_next(&self, value: T) {
        if !self.done.load(Ordering::Acquire) {
            self.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: RillError) {
        if self.done.swap(true, Ordering::AcqRel) {
            rill_core::hooks::undeliverable(error);
            return;
        }
        self.downstream.on_next((self.recover)(&error));
        self.downstream.on_complete();
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.downstream.on_complete();
        }
    }
}

struct ResumeShared<T> {
    downstream: Arc<dyn Observer<T>>,
    upstream: Arc<SerialDisposable>,
    handshook: AtomicBool,
    resumed: AtomicBool,
}

impl<T: Send + 'static> ResumeShared<T> {
    fn handshake(&self, disposable: Arc<dyn Disposable>) {
        self.upstream.set(disposable);
        if !self.handshook.swap(true, Ordering::AcqRel) {
            self.downstream.on_subscribe(self.upstream.clone());
        }
    }
}

struct ResumeObserver<T> {
    shared: Arc<ResumeShared<T>>,
    resume: Arc<dyn Fn(&RillError) -> Observable<T> + Send + Sync>,
}

impl<T: Send + 'static> Observer<T> for ResumeObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.shared.handshake(disposable);
    }

    fn on_next(&self, value: T) {
        self.shared.downstream.on_next(value);
    }

    fn on_error(&self, error: RillError) {
        if self.shared.resumed.swap(true, Ordering::AcqRel) {
            self.shared.downstream.on_error(error);
            return;
        }
        let fallback = (self.resume)(&error);
        fallback.subscribe_observer(Arc::new(FallbackObserver {
            shared: Arc::clone(&self.shared),
        }));
    }

    fn on_complete(&self) {
        self.shared.downstream.on_complete();
    }
}

struct FallbackObserver<T> {
    shared: Arc<ResumeShared<T>>,
}

impl<T: Send + 'static> Observer<T> for FallbackObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.shared.handshake(disposable);
    }

    fn on_next(&self, value: T) {
        self.shared.downstream.on_next(value);
    }

    fn on_error(&self, error: RillError) {
        self.shared.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.shared.downstream.on_complete();
    }
}
