//! Error types for catalog operations.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input failed a structural validation check.
    #[error("validation failed on {field}: {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Description of the failure.
        message: String,
    },

    /// A service with the same name already exists.
    #[error("service already exists: {name}")]
    AlreadyExists {
        /// The conflicting service name.
        name: String,
    },

    /// The requested service was not found.
    #[error("service not found: {name}")]
    NotFound {
        /// The service name that was looked up.
        name: String,
    },

    /// The user is not allowed to perform the operation.
    #[error("user {user} may not {action} service {service}")]
    PermissionDenied {
        /// The acting user (or `anonymous`).
        user: String,
        /// The attempted action.
        action: &'static str,
        /// The target service.
        service: String,
    },

    /// A concurrent mutation won the race.
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflicting state.
        message: String,
    },

    /// History was requested but the versioning provider is `none`.
    #[error("versioning is disabled")]
    VersioningDisabled,

    /// A storage operation failed.
    #[error("storage error during {operation}: {message}")]
    Storage {
        /// The operation that was in flight.
        operation: &'static str,
        /// Description of the storage failure.
        message: String,
    },

    /// Serialization/deserialization failed.
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

impl CatalogError {
    /// Shorthand for a [`CatalogError::Validation`] failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`CatalogError::Storage`] failure.
    pub fn storage(operation: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Storage {
            operation,
            message: message.to_string(),
        }
    }

    /// Shorthand for a permission failure, naming anonymous users.
    pub fn permission_denied(
        user: Option<&str>,
        action: &'static str,
        service: impl Into<String>,
    ) -> Self {
        Self::PermissionDenied {
            user: user.unwrap_or("anonymous").to_string(),
            action,
            service: service.into(),
        }
    }
}

impl From<dashops_core::Error> for CatalogError {
    fn from(value: dashops_core::Error) -> Self {
        use dashops_core::Error;
        match value {
            Error::InvalidName { message } => Self::validation("metadata.name", message),
            Error::Validation { field, message } => Self::Validation { field, message },
            Error::NotFound(message) => Self::NotFound { name: message },
            Error::Backend {
                system, message, ..
            } => Self::Storage {
                operation: system,
                message,
            },
            Error::Serialization { message } => Self::Serialization { message },
            Error::Internal { message } => Self::Internal { message },
        }
    }
}
