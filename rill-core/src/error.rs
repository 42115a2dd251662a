// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for the rill reactive engine.
//!
//! All failures that travel through a stream are represented by the root
//! [`RillError`] type. Operators never unwind across the operator stack:
//! a failing user function is captured as an error value and delivered
//! through `on_error`, after which the upstream subscription is disposed.

/// Root error type for all rill operations.
///
/// This enum encompasses every failure mode a subscription can observe:
/// upstream processing errors, failures of user-supplied functions,
/// aggregated errors from delayed-error operators, timeouts, demand
/// overflow and protocol violations.
#[derive(Debug, thiserror::Error)]
pub enum RillError {
    /// Stream processing encountered an error.
    ///
    /// General-purpose variant for failures that don't fit a more
    /// specific category.
    #[error("Stream processing error: {context}")]
    StreamProcessingError {
        /// Description of what went wrong during stream processing
        context: String,
    },

    /// Custom error from user code.
    ///
    /// Wraps errors produced by user-provided functions and callbacks
    /// (`try_map`, `try_filter`, `from_callable`, `using` release).
    #[error("User error: {0}")]
    UserError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Multiple errors occurred.
    ///
    /// Emitted by operators running with `delay_errors` when more than
    /// one source failed, and by `using` when an eager release fails on
    /// top of an upstream error.
    #[error("Multiple errors occurred: {count} errors")]
    MultipleErrors {
        /// Number of errors that occurred
        count: usize,
        /// The individual errors
        errors: Vec<RillError>,
    },

    /// A time-based operation exceeded its deadline.
    #[error("Timeout error: {context}")]
    TimeoutError {
        /// Context about the timeout (e.g. the configured duration)
        context: String,
    },

    /// An element was required but the stream terminated without one.
    ///
    /// Produced by `first` and `single` on an empty stream.
    #[error("Missing element: {context}")]
    MissingElementError {
        /// Which operation required the element
        context: String,
    },

    /// A bounded queue could not absorb an emission.
    ///
    /// Produced by the `Error` overflow policies of `group_by`, bounded
    /// unicast subjects and the backpressure bridge.
    #[error("Buffer overflow: {context}")]
    OverflowError {
        /// Which buffer overflowed and its bound
        context: String,
    },

    /// The subscription protocol was violated.
    ///
    /// A second `on_subscribe`, an emission after a terminal or an
    /// invalid demand request. Late values are dropped and the violation
    /// is also reported to the global hook.
    #[error("Protocol violation: {context}")]
    ProtocolViolation {
        /// Which rule was violated
        context: String,
    },

    /// A resource release callback failed.
    ///
    /// Raised by `using`: composed with the terminal when the release is
    /// eager, reported through the global hook when lazy.
    #[error("Resource cleanup error: {context}")]
    CleanupError {
        /// Context about the failed cleanup
        context: String,
    },
}

impl RillError {
    /// Create a stream processing error with the given context.
    pub fn stream_error(context: impl Into<String>) -> Self {
        Self::StreamProcessingError {
            context: context.into(),
        }
    }

    /// Wrap a user error.
    pub fn user_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::UserError(Box::new(error))
    }

    /// Create a timeout error with the given context.
    pub fn timeout_error(context: impl Into<String>) -> Self {
        Self::TimeoutError {
            context: context.into(),
        }
    }

    /// Create a missing-element error with the given context.
    pub fn missing_element(context: impl Into<String>) -> Self {
        Self::MissingElementError {
            context: context.into(),
        }
    }

    /// Create a buffer overflow error with the given context.
    pub fn overflow(context: impl Into<String>) -> Self {
        Self::OverflowError {
            context: context.into(),
        }
    }

    /// Create a protocol violation error with the given context.
    pub fn protocol_violation(context: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            context: context.into(),
        }
    }

    /// Create a resource cleanup error with the given context.
    pub fn cleanup_error(context: impl Into<String>) -> Self {
        Self::CleanupError {
            context: context.into(),
        }
    }

    /// Aggregate a batch of errors.
    ///
    /// A single error is returned unchanged; two or more become a
    /// [`RillError::MultipleErrors`]. Calling this with an empty vector
    /// is a bug on the caller's side and yields a stream processing
    /// error describing that.
    pub fn from_errors(mut errors: Vec<RillError>) -> Self {
        match errors.len() {
            0 => Self::stream_error("error aggregation over an empty set"),
            1 => errors.remove(0),
            count => Self::MultipleErrors { count, errors },
        }
    }

    /// Returns `true` if this error is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimeoutError { .. })
    }

    /// Returns `true` if this error is a protocol violation.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }

    /// Returns `true` if this error is a buffer overflow.
    #[must_use]
    pub const fn is_overflow(&self) -> bool {
        matches!(self, Self::OverflowError { .. })
    }
}

/// Specialized `Result` type for rill operations.
pub type Result<T> = std::result::Result<T, RillError>;

impl Clone for RillError {
    fn clone(&self) -> Self {
        match self {
            Self::StreamProcessingError { context } => Self::StreamProcessingError {
                context: context.clone(),
            },
            // The boxed error cannot be cloned; degrade to its rendering
            Self::UserError(e) => Self::StreamProcessingError {
                context: format!("User error: {e}"),
            },
            Self::MultipleErrors { count, errors } => Self::MultipleErrors {
                count: *count,
                errors: errors.clone(),
            },
            Self::TimeoutError { context } => Self::TimeoutError {
                context: context.clone(),
            },
            Self::MissingElementError { context } => Self::MissingElementError {
                context: context.clone(),
            },
            Self::OverflowError { context } => Self::OverflowError {
                context: context.clone(),
            },
            Self::ProtocolViolation { context } => Self::ProtocolViolation {
                context: context.clone(),
            },
            Self::CleanupError { context } => Self::CleanupError {
                context: context.clone(),
            },
        }
    }
}
