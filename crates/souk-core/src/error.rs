// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the souk chat gateway.

use thiserror::Error;

/// The primary error type used across all souk components.
///
/// Variants attributable to caller input (`Auth`, `Validation`, `NotFound`)
/// carry specific, actionable reasons and are safe to surface verbatim.
/// `Store` and `Internal` are logged with full context and surfaced to
/// callers only as opaque failures.
#[derive(Debug, Error)]
pub enum SoukError {
    /// Missing, malformed, or expired connection credential. The connection
    /// is refused and never retried by the server.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Malformed room id, empty or oversized content, or a caller who is not
    /// a participant of the room. Surfaced via the event acknowledgment; the
    /// connection stays open.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operating on an entity that does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Storage backend errors (connection, query failure, serialization).
    /// Treated as transient: the caller may retry the operation.
    #[error("storage error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Fan-out bus errors (topic gone, publish failure).
    #[error("fan-out error: {0}")]
    Fanout(String),

    /// Configuration errors (invalid values, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SoukError {
    /// Wrap an arbitrary error as a transient storage failure.
    pub fn store(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        SoukError::Store {
            source: Box::new(source),
        }
    }

    /// Whether this error may be surfaced to the caller verbatim.
    ///
    /// Internal and store failures are opaque to callers; everything the
    /// caller caused carries its specific reason.
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            SoukError::Auth(_) | SoukError::Validation(_) | SoukError::NotFound { .. }
        )
    }
}

/// Push-provider failures, classified for the delivery worker.
///
/// Never surfaced to the original message sender: by the time a push job
/// runs, `send` has already acknowledged success.
#[derive(Debug, Error)]
pub enum PushError {
    /// The provider rejected the token or payload. Retrying is pointless;
    /// the job is dropped.
    #[error("push rejected: {0}")]
    Rejected(String),

    /// Provider or transport failure that may succeed on retry.
    #[error("push provider error: {0}")]
    Transient(String),
}
