// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{ActionDisposable, Disposable, Observable, Observer, RillError, UnicastSubject};
use std::collections::VecDeque;
use std::sync::Arc;

/// Extension trait providing count-based windowing.
///
/// Windows are live sub-streams rather than collections: each opens
/// when its first value would arrive and completes after `count`
/// values. A consumer that abandons a window merely stops receiving it;
/// the operator moves on regardless.
pub trait WindowExt<T: Clone> {
    /// Splits the stream into consecutive windows of `count` values.
    fn window(self, count: usize) -> Observable<Observable<T>>;

    /// Splits the stream into windows of `count` values, opening a new
    /// window every `skip` values.
    fn window_skip(self, count: usize, skip: usize) -> Observable<Observable<T>>;
}

impl<T: Clone + Send + 'static> WindowExt<T> for Observable<T> {
    fn window(self, count: usize) -> Observable<Observable<T>> {
        self.window_skip(count, count)
    }

    fn window_skip(self, count: usize, skip: usize) -> Observable<Observable<T>> {
        let count = count.max(1);
        let skip = skip.max(1);
        self.lift(move |downstream| {
            Arc::new(WindowObserver {
                downstream,
                count,
                skip,
                state: Arc::new(Mutex::new(WindowState {
                    windows: VecDeque::new(),
                    index: 0,
                })),
            })
        })
    }
}

struct OpenWindow<T> {
    subject: UnicastSubject<T>,
    filled: usize,
}

struct WindowState<T> {
    windows: VecDeque<OpenWindow<T>>,
    index: u64,
}

struct WindowObserver<T> {
    downstream: Arc<dyn Observer<Observable<T>>>,
    count: usize,
    skip: usize,
    state: Arc<Mutex<WindowState<T>>>,
}

impl<T: Send + Clone + 'static> Observer<T> for WindowObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        let state = Arc::clone(&self.state);
        self.downstream
            .on_subscribe(Arc::new(ActionDisposable::new(move || {
                disposable.dispose();
                for window in state.lock().windows.drain(..) {
                    window.subject.dispose();
                }
            })));
    }

    fn on_next(&self, value: T) {
        let (opened, value_targets, closed) = {
            let mut state = self.state.lock();
            let opened = if state.index % self.skip as u64 == 0 {
                let subject = UnicastSubject::new();
                state.windows.push_back(OpenWindow {
                    subject: subject.clone(),
                    filled: 0,
                });
                Some(subject)
            } else {
                None
            };
            state.index += 1;
            let mut targets = Vec::with_capacity(state.windows.len());
            for window in state.windows.iter_mut() {
                window.filled += 1;
                targets.push(window.subject.clone());
            }
            let closed = if state
                .windows
                .front()
                .is_some_and(|window| window.filled == self.count)
            {
                state.windows.pop_front().map(|window| window.subject)
            } else {
                None
            };
            (opened, targets, closed)
        };
        // Announce the window before its first value reaches it
        if let Some(subject) = opened {
            self.downstream.on_next(subject.observable());
        }
        for subject in value_targets {
            subject.push(value.clone());
        }
        if let Some(subject) = closed {
            subject.complete();
        }
    }

    fn on_error(&self, error: RillError) {
        let windows: Vec<_> = self.state.lock().windows.drain(..).collect();
        for window in windows {
            window.subject.error(error.clone());
        }
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        let windows: Vec<_> = self.state.lock().windows.drain(..).collect();
        for window in windows {
            window.subject.complete();
        }
        self.downstream.on_complete();
    }
}
