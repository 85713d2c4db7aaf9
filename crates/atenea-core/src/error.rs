// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Atenea contact-center core.

use thiserror::Error;

/// The primary error type used across all Atenea adapter traits and core operations.
#[derive(Debug, Error)]
pub enum AteneaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, malformed adapter reply).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Bot engine errors (unreachable NLU service, malformed reply).
    #[error("bot error: {message}")]
    Bot {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced room, attention, citizen, agent or lookup row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Attempt to mutate a terminal or out-of-order state.
    #[error("invalid transition for {entity} {id}: {reason}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// Outbound send to a channel adapter failed or timed out.
    #[error("dispatch to {channel} ({target}) failed: {reason}")]
    DispatchFailure {
        channel: String,
        target: String,
        reason: String,
    },

    /// A required atomic pairing of writes could not commit.
    #[error("integrity failure: {message}")]
    IntegrityFailure {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Caller input failed a domain rule (rating range, attachment size, empty text).
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AteneaError {
    /// Shorthand for [`AteneaError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for [`AteneaError::InvalidTransition`].
    pub fn invalid_transition(
        entity: &'static str,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind, used by the HTTP boundary and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Storage { .. } => "storage",
            Self::Channel { .. } => "channel",
            Self::Bot { .. } => "bot",
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::DispatchFailure { .. } => "dispatch_failure",
            Self::IntegrityFailure { .. } => "integrity_failure",
            Self::Validation(_) => "validation",
            Self::Timeout { .. } => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this error is a structured rejection of caller input
    /// (as opposed to an operational failure that needs follow-up).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::InvalidTransition { .. } | Self::Validation(_)
        )
    }
}
