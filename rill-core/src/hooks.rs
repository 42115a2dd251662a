// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Process-wide error hook.
//!
//! Errors that can no longer be delivered to a consumer — a failure
//! after the terminal, a superseded inner source erroring, a lazy
//! cleanup failure — must still surface somewhere. They are routed
//! here; the default handler logs them through `tracing`.

use crate::RillError;
use parking_lot::RwLock;
use std::sync::OnceLock;

type ErrorHandler = Box<dyn Fn(&RillError) + Send + Sync>;

fn handler_slot() -> &'static RwLock<Option<ErrorHandler>> {
    static SLOT: OnceLock<RwLock<Option<ErrorHandler>>> = OnceLock::new();
    SLOT.get_or_init(|| RwLock::new(None))
}

/// Reports an error that has no consumer left to deliver to.
pub fn undeliverable(error: RillError) {
    let guard = handler_slot().read();
    match guard.as_ref() {
        Some(handler) => handler(&error),
        None => tracing::error!(%error, "undeliverable error dropped"),
    }
}

/// Reports a subscription protocol violation.
///
/// The offending signal has already been discarded by the caller; this
/// makes the violation observable to diagnostics.
pub fn protocol_violation(context: &str) {
    undeliverable(RillError::protocol_violation(context));
}

/// Installs a custom handler for undeliverable errors.
pub fn set_undeliverable_handler(handler: impl Fn(&RillError) + Send + Sync + 'static) {
    *handler_slot().write() = Some(Box::new(handler));
}

/// Restores the default (logging) handler.
pub fn reset_undeliverable_handler() {
    *handler_slot().write() = None;
}
