// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rill_core::{Disposable, Observable, Observer, RillError};
use std::collections::VecDeque;
use std::sync::Arc;

/// Extension trait providing count-based buffering.
pub trait BufferExt<T: Clone> {
    /// Collects values into non-overlapping chunks of `count`.
    /// A partial chunk is emitted on completion.
    fn buffer(self, count: usize) -> Observable<Vec<T>>;

    /// Collects values into chunks of `count`, starting a new chunk
    /// every `skip` values. `skip > count` samples, `skip < count`
    /// overlaps.
    fn buffer_skip(self, count: usize, skip: usize) -> Observable<Vec<T>>;
}

impl<T: Clone + Send + 'static> BufferExt<T> for Observable<T> {
    fn buffer(self, count: usize) -> Observable<Vec<T>> {
        self.buffer_skip(count, count)
    }

    fn buffer_skip(self, count: usize, skip: usize) -> Observable<Vec<T>> {
        let count = count.max(1);
        let skip = skip.max(1);
        self.lift(move |downstream| {
            Arc::new(BufferObserver {
                downstream,
                count,
                skip,
                state: Mutex::new(BufferState {
                    chunks: VecDeque::new(),
                    index: 0,
                }),
            })
        })
    }
}

struct BufferState<T> {
    chunks: VecDeque<Vec<T>>,
    index: u64,
}

struct BufferObserver<T> {
    downstream: Arc<dyn Observer<Vec<T>>>,
    count: usize,
    skip: usize,
    state: Mutex<BufferState<T>>,
}

impl<T: Send + Clone> Observer<T> for BufferObserver<T> {
    fn on_subscribe(&self, disposable: Arc<dyn Disposable>) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_next(&self, value: T) {
        let full = {
            let mut state = self.state.lock();
            if state.index % self.skip as u64 == 0 {
                state.chunks.push_back(Vec::with_capacity(self.count));
            }
            state.index += 1;
            for chunk in state.chunks.iter_mut() {
                chunk.push(value.clone());
            }
            if state
                .chunks
                .front()
                .is_some_and(|chunk| chunk.len() == self.count)
            {
                state.chunks.pop_front()
            } else {
                None
            }
        };
        if let Some(chunk) = full {
            self.downstream.on_next(chunk);
        }
    }

    fn on_error(&self, error: RillError) {
        self.state.lock().chunks.clear();
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        let leftovers = std::mem::take(&mut self.state.lock().chunks);
        for chunk in leftovers {
            if !chunk.is_empty() {
                self.downstream.on_next(chunk);
            }
        }
        self.downstream.on_complete();
    }
}
