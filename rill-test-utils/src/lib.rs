// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities for the rill workspace.
//!
//! [`TestObserver`] records a subscription and blocks on latches;
//! [`TestScheduler`] replaces wall-clock timing with an explicitly
//! advanced virtual clock; [`TestSubscriber`] drives demand by hand.

#![allow(clippy::multiple_crate_versions)]

mod test_observer;
mod test_scheduler;
mod test_subscriber;

pub use test_observer::TestObserver;
pub use test_scheduler::TestScheduler;
pub use test_subscriber::TestSubscriber;
