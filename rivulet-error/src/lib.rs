// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Error types for the rivulet stream combinator library.
//!
//! Stream errors are *values*: they travel through a stream alongside data
//! events and never terminate it. This crate defines the root [`StreamError`]
//! type with variants for the failure modes the combinators can surface, a
//! [`Result`] alias for host-facing APIs, and helpers for attaching context.
//!
//! # Examples
//!
//! ```
//! use rivulet_error::{StreamError, Result};
//!
//! fn flush() -> Result<()> {
//!     Err(StreamError::processing("sink closed before flush"))
//! }
//! ```

/// Root error type for all rivulet operations.
///
/// Every variant owns its context as plain data so that errors stay `Clone`;
/// broadcast streams fan a single error event out to every subscriber.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamError {
    /// A user-supplied callback (combine, predicate, convert) failed.
    ///
    /// The operator forwards this on its output and keeps running.
    #[error("User callback failed: {context}")]
    Callback {
        /// Description of the callback and the failure
        context: String,
    },

    /// A second listen was attempted on a single-subscription stream.
    ///
    /// Single-subscription streams accept exactly one subscription for their
    /// lifetime; relisten after cancel is not supported.
    #[error("Stream has already been listened to")]
    AlreadyListened,

    /// An event was pushed into a stream whose sink has been closed.
    ///
    /// Only surfaced by fallible push APIs; the sink itself silently drops
    /// late writes.
    #[error("Stream is closed")]
    Closed,

    /// A push found no live listener to deliver to.
    ///
    /// Surfaced by the controllers' fallible push APIs when the single
    /// subscription has been canceled, or when a broadcast stream has no
    /// subscribers left.
    #[error("Channel send failed: receiver dropped")]
    ChannelSend,

    /// General stream processing failure that fits no other variant.
    #[error("Stream processing error: {context}")]
    Processing {
        /// Description of what went wrong
        context: String,
    },

    /// Several upstream cancellations failed at once.
    ///
    /// Cancel completions aggregate errors from every held subscription.
    #[error("Multiple errors occurred: {} errors", errors.len())]
    Multiple {
        /// The individual failures, in upstream order
        errors: Vec<StreamError>,
    },
}

impl StreamError {
    /// Create a callback error with the given context.
    pub fn callback(context: impl Into<String>) -> Self {
        Self::Callback {
            context: context.into(),
        }
    }

    /// Create a stream processing error with the given context.
    pub fn processing(context: impl Into<String>) -> Self {
        Self::Processing {
            context: context.into(),
        }
    }

    /// Aggregate several errors into one.
    ///
    /// Returns the sole error unchanged when `errors` has exactly one
    /// element, so single-upstream cancel paths stay flat.
    pub fn aggregate(mut errors: Vec<StreamError>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            Self::Multiple { errors }
        }
    }
}

/// Specialized `Result` type for rivulet operations.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Helper trait for adding context to `Result`s in a fluent style.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Errors
    /// Returns `Err(StreamError)` if the underlying result is `Err`.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<StreamError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let context = context.into();
            match e.into() {
                StreamError::Processing { context: inner } => StreamError::Processing {
                    context: format!("{context}: {inner}"),
                },
                StreamError::Callback { context: inner } => StreamError::Callback {
                    context: format!("{context}: {inner}"),
                },
                other => other,
            }
        })
    }
}
