// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Demand-signalling publisher variant of the rill engine.
//!
//! A [`Flowable`] extends the subscription handshake with a
//! [`Subscription`] carrying `request(n)` / `cancel()`; the bridge from
//! the unbounded side offers four overflow policies
//! ([`BackpressureStrategy`]), and the bridge back requests unbounded
//! demand.

#![allow(clippy::multiple_crate_versions)]

mod bridge;
mod flowable;
mod subscriber;

pub use bridge::{BackpressureStrategy, ToFlowableExt};
pub use flowable::Flowable;
pub use subscriber::{Subscriber, Subscription};
