// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::RillError;
use std::sync::Arc;

/// Demand channel of one flow subscription.
///
/// The downstream authorizes up to `n` further emissions per
/// [`request`](Self::request) call; `request(0)` is a protocol
/// violation and fails the subscription. `u64::MAX` means unbounded.
pub trait Subscription: Send + Sync {
    fn request(&self, n: u64);
    fn cancel(&self);
}

/// The four-callback sink of the demand-signalling protocol.
///
/// Identical to the unbounded observer contract except that the
/// handshake carries a [`Subscription`], and the producer may emit at
/// most as many values as were requested.
pub trait Subscriber<T>: Send + Sync {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);
    fn on_next(&self, value: T);
    fn on_error(&self, error: RillError);
    fn on_complete(&self);
}
