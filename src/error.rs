//! Error types for the statistics backend.
//!
//! All errors are strongly typed using thiserror. This enables pattern
//! matching on specific error conditions and provides clear error messages.
//! Errors are surfaced as values; only [`BackendError::Internal`] signals a
//! condition (such as a poisoned lock) that should tear the backend down.

use thiserror::Error;

use crate::types::{DomainId, EntityId, EntityKind};

/// Top-level error type for backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A parameter does not identify a usable entity or kind.
    #[error("Bad parameter: {reason}")]
    BadParameter {
        /// Why the parameter was rejected.
        reason: String,
    },

    /// A running monitor already exists for the requested domain.
    #[error("Domain {domain_id} is already monitored by entity {monitor_id}")]
    AlreadyMonitored {
        /// The contested domain.
        domain_id: DomainId,
        /// Id of the existing monitor's domain entity.
        monitor_id: EntityId,
    },

    /// A relation not allowed by the entity schema was requested.
    #[error("Schema violation: {parent_kind} -> {child_kind} is not a valid relation")]
    SchemaViolation {
        /// Kind of the proposed parent.
        parent_kind: EntityKind,
        /// Kind of the proposed child.
        child_kind: EntityKind,
    },

    /// An entity with the same natural key is already stored.
    #[error("Duplicate identity: {key}")]
    DuplicateIdentity {
        /// Display form of the conflicting natural key.
        key: String,
    },

    /// The operation is recognized but not implemented.
    #[error("Operation not supported: {operation}")]
    NotSupported {
        /// Operation name.
        operation: &'static str,
    },

    /// Internal system error. Fatal; the backend must be torn down.
    #[error("Internal error: {message}")]
    Internal {
        /// Error description.
        message: String,
    },
}

impl BackendError {
    /// Creates a bad-parameter error.
    #[must_use]
    pub fn bad_parameter(reason: impl Into<String>) -> Self {
        Self::BadParameter {
            reason: reason.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a bad-parameter error.
    #[must_use]
    pub const fn is_bad_parameter(&self) -> bool {
        matches!(self, Self::BadParameter { .. })
    }

    /// Returns true if this error can be recovered locally while applying
    /// discovery events (the event is dropped and processing continues).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SchemaViolation { .. } | Self::DuplicateIdentity { .. } | Self::BadParameter { .. }
        )
    }

    /// Returns true if this error must tear down the backend.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
