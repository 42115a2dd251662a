// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::concat::concat;
use rill_core::Observable;

/// Extension trait prepending and appending values.
pub trait StartWithExt<T> {
    /// Emits `items` before the source's own values.
    fn start_with(self, items: Vec<T>) -> Observable<T>;

    /// Emits `items` after the source completes.
    fn end_with(self, items: Vec<T>) -> Observable<T>;
}

impl<T> StartWithExt<T> for Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn start_with(self, items: Vec<T>) -> Observable<T> {
        concat(vec![Observable::from_iter(items), self])
    }

    fn end_with(self, items: Vec<T>) -> Observable<T> {
        concat(vec![self, Observable::from_iter(items)])
    }
}
