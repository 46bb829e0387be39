// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Corral serialized-access substrate.
//!
//! Only *recoverable* failures are represented here. Contract violations
//! (reentrant misuse of a non-reentrant entry point, reusing a single-use
//! cancellation bridge, leaving a transaction open without the unsafe
//! override) are programming mistakes, not runtime conditions: they panic
//! with a descriptive message instead of returning an error.

use thiserror::Error;

/// The primary error type surfaced by Corral access operations.
#[derive(Debug, Error)]
pub enum CorralError {
    /// An asynchronous database access was cancelled before completion.
    ///
    /// Distinguishable from ordinary failures so callers can tell an
    /// abandoned access apart from a failed one.
    #[error("database access cancelled: {context}")]
    Cancelled { context: String },

    /// An error raised by the caller-supplied body, propagated unchanged.
    #[error("database error: {source}")]
    Database {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid threading mode, empty labels).
    #[error("configuration error: {0}")]
    Config(String),

    /// The dedicated worker thread could not be provisioned.
    #[error("failed to spawn worker `{label}`: {source}")]
    Worker {
        label: String,
        source: std::io::Error,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CorralError {
    /// Shorthand for a [`CorralError::Cancelled`] with the given context.
    pub fn cancelled(context: impl Into<String>) -> Self {
        CorralError::Cancelled {
            context: context.into(),
        }
    }

    /// Shorthand for a [`CorralError::Database`] wrapping the given source.
    pub fn database(
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        CorralError::Database {
            source: source.into(),
        }
    }

    /// Returns `true` if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CorralError::Cancelled { .. })
    }
}
