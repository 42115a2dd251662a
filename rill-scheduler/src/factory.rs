// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::computation::ComputationScheduler;
use crate::executor::{Executor, ExecutorScheduler};
use crate::immediate::ImmediateScheduler;
use crate::io::IoScheduler;
use crate::new_thread::NewThreadScheduler;
use crate::scheduler::Scheduler;
use crate::single::SingleScheduler;
use crate::trampoline::TrampolineScheduler;
use std::sync::{Arc, OnceLock};

/// Process-wide scheduler factories.
///
/// The thread-backed kinds are lazy singletons: the first call spins up
/// the pool, later calls share it. `from_executor` wraps the given
/// executor into a fresh scheduler each call.
pub struct Schedulers;

impl Schedulers {
    /// Fixed pool sized by the machine's available parallelism.
    pub fn computation() -> Arc<dyn Scheduler> {
        static INSTANCE: OnceLock<Arc<ComputationScheduler>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(ComputationScheduler::new()))
            .clone()
    }

    /// Elastic cached pool for blocking work.
    pub fn io() -> Arc<dyn Scheduler> {
        static INSTANCE: OnceLock<Arc<IoScheduler>> = OnceLock::new();
        INSTANCE.get_or_init(|| Arc::new(IoScheduler::new())).clone()
    }

    /// One shared background thread.
    pub fn single() -> Arc<dyn Scheduler> {
        static INSTANCE: OnceLock<Arc<SingleScheduler>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(SingleScheduler::new()))
            .clone()
    }

    /// A dedicated thread per worker.
    pub fn new_thread() -> Arc<dyn Scheduler> {
        static INSTANCE: OnceLock<Arc<NewThreadScheduler>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(NewThreadScheduler::new()))
            .clone()
    }

    /// Caller-thread execution with an outer drain queue.
    pub fn trampoline() -> Arc<dyn Scheduler> {
        static INSTANCE: OnceLock<Arc<TrampolineScheduler>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(TrampolineScheduler::new()))
            .clone()
    }

    /// Inline, recursive caller-thread execution.
    pub fn immediate() -> Arc<dyn Scheduler> {
        static INSTANCE: OnceLock<Arc<ImmediateScheduler>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(ImmediateScheduler::new()))
            .clone()
    }

    /// Wraps a user-supplied executor.
    pub fn from_executor(executor: Arc<dyn Executor>) -> Arc<dyn Scheduler> {
        Arc::new(ExecutorScheduler::new(executor))
    }
}
