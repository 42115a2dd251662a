// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Time-based sources and operators for the rill reactive engine.
//!
//! Everything here runs against a [`Scheduler`](rill_scheduler::Scheduler)
//! worker and its monotonic clock; pass the virtual-time test scheduler
//! for deterministic tests.

#![allow(clippy::multiple_crate_versions)]

pub mod buffer_time;
pub mod debounce;
pub mod interval;
pub mod sample;
pub mod throttle;
pub mod timeout;
pub mod window_time;

pub use buffer_time::BufferTimeExt;
pub use debounce::DebounceExt;
pub use interval::{interval, interval_from, interval_on, timer, timer_on};
pub use sample::SampleExt;
pub use throttle::ThrottleExt;
pub use timeout::TimeoutExt;
pub use window_time::WindowTimeExt;
