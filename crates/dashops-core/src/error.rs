//! Error types and result aliases shared across Dash-Ops components.
//!
//! Errors are structured for programmatic handling: transport layers map
//! them onto HTTP statuses without string matching.

/// The result type used throughout Dash-Ops core contracts.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core operations and external-system facades.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid service name was provided.
    #[error("invalid name: {message}")]
    InvalidName {
        /// Description of what made the name invalid.
        message: String,
    },

    /// Input failed a structural validation check.
    #[error("validation failed on {field}: {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Description of the failure.
        message: String,
    },

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An external backend (kubernetes, github, filesystem) failed.
    #[error("{system} unavailable during {operation}: {message}")]
    Backend {
        /// The external system that failed.
        system: &'static str,
        /// The operation that was in flight.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An internal invariant was violated.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::Backend`] failure.
    pub fn backend(
        system: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            system,
            operation,
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::Validation`] failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
