// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Core contract of the rill push-based reactive engine.
//!
//! This crate defines the notification channel ([`Signal`], [`Observer`],
//! [`Observable`]), the disposal primitives that govern cancellation, the
//! serialization utilities concurrent operators build on, the two subject
//! flavors, and the source adapters. Operators live in `rill-ops` and
//! `rill-time`; schedulers in `rill-scheduler`.

#![allow(clippy::multiple_crate_versions)]

pub mod disposable;
mod emitter;
mod error;
mod gate;
pub mod hooks;
mod observable;
mod observer;
mod serialized;
mod signal;
mod sources;
mod subject;
mod unicast;

pub use disposable::{
    disposed, pair, ActionDisposable, CompositeDisposable, Disposable, FlagDisposable,
    SerialDisposable, SubscriptionSlot,
};
pub use emitter::Emitter;
pub use error::{Result, RillError};
pub use gate::DrainGate;
pub use observable::Observable;
pub use observer::{CallbackObserver, Observer};
pub use serialized::SerializedObserver;
pub use signal::{Signal, Terminal};
pub use subject::PublishSubject;
pub use unicast::{OverflowPolicy, UnicastSubject};
