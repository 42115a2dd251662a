// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # rill
//!
//! A push-based reactive stream engine: producers emit typed values
//! ending in at most one terminal, consumers receive them through a
//! uniform four-callback contract, and a rich operator algebra —
//! mapping, filtering, merging, buffering, timing, multicasting,
//! retrying — composes sources into pipelines.
//!
//! ## Quick start
//!
//! ```
//! use rill::prelude::*;
//!
//! let evens = Observable::range(1, 5)
//!     .filter(|v| v % 2 == 0)
//!     .map(|v| v * 10)
//!     .to_list();
//! let observer = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
//! let sink = observer.clone();
//! evens.subscribe(move |list| *sink.lock() = list);
//! assert_eq!(*observer.lock(), vec![20, 40]);
//! ```
//!
//! Time-based operators take a [`Scheduler`]; hand them the virtual
//! clock from `rill-test-utils` for deterministic tests. The
//! backpressure variant lives behind [`ToFlowableExt::to_flowable`]
//! with the four overflow policies of [`BackpressureStrategy`].

#![allow(clippy::multiple_crate_versions)]

mod stream_interop;

pub use stream_interop::{from_stream, IntoStreamExt, ObservableStream};

// Core contract
pub use rill_core::{
    disposed, hooks, ActionDisposable, CallbackObserver, CompositeDisposable, Disposable, Emitter,
    FlagDisposable, Observable, Observer, OverflowPolicy, PublishSubject, Result, RillError,
    SerialDisposable, Signal, UnicastSubject,
};

// Schedulers
pub use rill_scheduler::{Executor, PeriodicWorker, Scheduler, Schedulers, Worker};

// Operators
pub use rill_ops::{
    combine_latest, combine_latest_delay_error, concat, merge, merge_delay_error, zip,
    zip_delay_error, BufferExt, CollectExt, CombineLatestExt, ConcatExt, ConnectableObservable,
    DematerializeExt, DistinctUntilChangedExt, ElementsExt, FilterExt, FlatMapExt, FlatMapOptions,
    GroupByExt, GroupedObservable, MapExt, MaterializeExt, MulticastExt, ObserveOnExt, OnErrorExt,
    RepeatExt, RetryExt, ScanExt, SkipExt, StartWithExt, SubscribeOnExt, SwitchMapExt, TakeExt,
    TapExt, UnsubscribeOnExt, WindowExt, ZipExt, DEFAULT_BUFFER_SIZE,
};

// Time-based sources and operators
pub use rill_time::{
    interval, interval_from, interval_on, timer, timer_on, BufferTimeExt, DebounceExt, SampleExt,
    ThrottleExt, TimeoutExt, WindowTimeExt,
};

// Backpressure
pub use rill_flow::{BackpressureStrategy, Flowable, Subscriber, Subscription, ToFlowableExt};

/// One-stop imports for pipeline composition.
pub mod prelude {
    pub use crate::stream_interop::{from_stream, IntoStreamExt};
    pub use rill_core::{Disposable, Observable, Observer, Result, RillError, Signal};
    pub use rill_flow::{BackpressureStrategy, Flowable, ToFlowableExt};
    pub use rill_ops::{
        BufferExt, CollectExt, CombineLatestExt, ConcatExt, DematerializeExt,
        DistinctUntilChangedExt, ElementsExt, FilterExt, FlatMapExt, GroupByExt, MapExt,
        MaterializeExt, MulticastExt, ObserveOnExt, OnErrorExt, RepeatExt, RetryExt, ScanExt,
        SkipExt, StartWithExt, SubscribeOnExt, SwitchMapExt, TakeExt, TapExt, UnsubscribeOnExt,
        WindowExt, ZipExt,
    };
    pub use rill_scheduler::{Scheduler, Schedulers};
    pub use rill_time::{BufferTimeExt, DebounceExt, SampleExt, ThrottleExt, TimeoutExt, WindowTimeExt};
}
