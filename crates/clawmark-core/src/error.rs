// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Clawmark routing and delivery.

use thiserror::Error;

/// The primary error type used across adapters, stores, and the dispatch engine.
#[derive(Debug, Error)]
pub enum ClawmarkError {
    /// Configuration errors (unknown adapter type, malformed channel settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// An adapter or target failed its `validate()` check.
    #[error("validation failed for {adapter}: {message}")]
    Validation { adapter: String, message: String },

    /// Delivery transport errors (network failure, non-success status, malformed response).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Persistent store errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A referenced record does not exist.
    #[error("not found: {kind} {id}")]
    NotFound { kind: String, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClawmarkError {
    /// Builds a [`ClawmarkError::Transport`] without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        ClawmarkError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a [`ClawmarkError::Validation`] for the named adapter.
    pub fn validation(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        ClawmarkError::Validation {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        ClawmarkError::Storage {
            source: Box::new(source),
        }
    }

    /// Whether this error came from configuration or validation rather than I/O.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ClawmarkError::Config(_) | ClawmarkError::Validation { .. }
        )
    }
}
