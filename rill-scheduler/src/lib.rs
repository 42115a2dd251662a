// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Scheduler abstraction for the rill reactive engine.
//!
//! A [`Scheduler`] manufactures [`Worker`]s — sequential, cancellable
//! task executors with a monotonic clock. Time-based operators hold a
//! worker for their timers; `observe_on`/`subscribe_on` hop threads
//! through one. Built-in kinds: `immediate`, `trampoline`, `single`,
//! `computation`, `io`, `new_thread`, plus an adapter over arbitrary
//! executors.

#![allow(clippy::multiple_crate_versions)]

mod computation;
mod event_loop;
mod executor;
mod factory;
mod immediate;
mod io;
mod loop_worker;
mod new_thread;
mod scheduler;
mod single;
mod trampoline;

pub use computation::ComputationScheduler;
pub use executor::{Executor, ExecutorScheduler};
pub use factory::Schedulers;
pub use immediate::ImmediateScheduler;
pub use io::IoScheduler;
pub use new_thread::NewThreadScheduler;
pub use scheduler::{PeriodicWorker, Scheduler, Task, Worker};
pub use single::SingleScheduler;
pub use trampoline::TrampolineScheduler;
