// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the chowkidar doorbell pipeline.

use thiserror::Error;

/// The primary error type used across all chowkidar crates.
///
/// Variants mirror how each failure is recovered: transient provider errors
/// degrade locally, store errors retry once then fail the session, back
/// pressure surfaces at ingress, and cancellation is cooperative.
#[derive(Debug, Error)]
pub enum ChowkidarError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Vision/STT/reply/TTS timeout or transport error. Recovered locally via
    /// bounded retry then degraded fallback; never fatal to the session.
    #[error("provider error: {message}")]
    TransientProvider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A provider returned data failing schema or invariants.
    #[error("contract violation: {message}")]
    ContractViolation { message: String },

    /// Per-session work queue full; the caller is expected to retry later.
    #[error("session queue full for {session_id}")]
    BackPressure { session_id: String },

    /// Cooperative shutdown interrupted the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// A generated reply contained a forbidden pattern and was replaced.
    #[error("reply safety violation: {message}")]
    SecurityContract { message: String },

    /// Operation exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChowkidarError {
    /// True when the error should be retried locally before giving up.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChowkidarError::TransientProvider { .. } | ChowkidarError::Timeout { .. }
        )
    }
}
