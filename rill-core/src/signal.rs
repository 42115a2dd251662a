// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::RillError;

/// One notification of the stream protocol.
///
/// A stream delivers a (possibly infinite) sequence of `Next` values to
/// its consumer, optionally terminated by exactly one `Error` or
/// `Complete`. After a terminal, no further signal is observable.
#[derive(Debug, Clone)]
pub enum Signal<T> {
    /// A value emission
    Next(T),
    /// Terminal failure
    Error(RillError),
    /// Terminal completion
    Complete,
}

/// A terminal event without the value dimension.
///
/// Stateful operators that latch their terminal (subjects, multicast
/// nodes) hold one of these next to their value buffer.
#[derive(Debug, Clone)]
pub enum Terminal {
    /// The stream completed normally
    Complete,
    /// The stream failed
    Error(RillError),
}

impl<T> Signal<T> {
    /// Returns `true` if this is a `Next`.
    pub const fn is_next(&self) -> bool {
        matches!(self, Signal::Next(_))
    }

    /// Returns `true` if this is an `Error`.
    pub const fn is_error(&self) -> bool {
        matches!(self, Signal::Error(_))
    }

    /// Returns `true` if this is a `Complete`.
    pub const fn is_complete(&self) -> bool {
        matches!(self, Signal::Complete)
    }

    /// Returns `true` if this is a terminal signal.
    pub const fn is_terminal(&self) -> bool {
        !self.is_next()
    }

    /// Borrows the value of a `Next`, if any.
    pub const fn value(&self) -> Option<&T> {
        match self {
            Signal::Next(v) => Some(v),
            _ => None,
        }
    }

    /// Borrows the error of an `Error`, if any.
    pub const fn error(&self) -> Option<&RillError> {
        match self {
            Signal::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Converts into the carried value, discarding terminals.
    pub fn into_value(self) -> Option<T> {
        match self {
            Signal::Next(v) => Some(v),
            _ => None,
        }
    }

    /// Maps the carried value, leaving terminals untouched.
    pub fn map<U, F>(self, f: F) -> Signal<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Signal::Next(v) => Signal::Next(f(v)),
            Signal::Error(e) => Signal::Error(e),
            Signal::Complete => Signal::Complete,
        }
    }
}

impl<T: PartialEq> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Signal::Next(a), Signal::Next(b)) => a == b,
            (Signal::Complete, Signal::Complete) => true,
            // Errors are never equal
            _ => false,
        }
    }
}

impl Terminal {
    /// Converts into the equivalent [`Signal`].
    pub fn into_signal<T>(self) -> Signal<T> {
        match self {
            Terminal::Complete => Signal::Complete,
            Terminal::Error(e) => Signal::Error(e),
        }
    }

    /// Returns `true` if this terminal is an error.
    pub const fn is_error(&self) -> bool {
        matches!(self, Terminal::Error(_))
    }
}
